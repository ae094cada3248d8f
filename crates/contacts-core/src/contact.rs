//! Contact value type
//!
//! A contact is identified structurally: two contacts with the same first
//! name, last name and phone number are the same contact.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A single directory entry
///
/// Contacts are plain values. They are hashed and compared on all three
/// fields, which is what the store uses as identity.
///
/// # Example
///
/// ```
/// use contacts_core::Contact;
///
/// let contact = Contact::new("Alexander", "Bell", "+16170000001");
/// assert!(contact.validate().is_ok());
/// assert_eq!(contact.first_name(), "Alexander");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contact {
    first: String,
    last: String,
    phone: String,
}

impl Contact {
    /// Create a new contact
    ///
    /// No validation happens here; invalid contacts are rejected by the
    /// store before any mutation.
    pub fn new(
        first: impl Into<String>,
        last: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
            phone: phone.into(),
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first
    }

    pub fn last_name(&self) -> &str {
        &self.last
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Check that every field is non-empty
    ///
    /// # Returns
    ///
    /// - `Ok(())`: All three fields are present
    /// - `Err(Error::Validation)`: Names the first empty field
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("first name", &self.first),
            ("last name", &self.last),
            ("phone", &self.phone),
        ];

        for (field, value) in fields {
            if value.is_empty() {
                return Err(Error::validation(format!("{field} is empty")));
            }
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} <{}>", self.first, self.last, self.phone)
    }
}
