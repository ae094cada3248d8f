//! JSON payload parsing
//!
//! A payload is a top-level JSON array of flat records. A record is
//! well-formed when it is an object with exactly three string-valued
//! members, each non-empty and with a non-empty key. Members holding any
//! other JSON type are ignored. The string members map by position, in
//! document order, to first name, last name and phone:
//!
//! ```json
//! [
//!   { "first": "Alexander", "last": "Bell", "phone": "+16170000001" },
//!   { "first": "Thomas", "last": "Watson", "phone": "+16170000002" }
//! ]
//! ```
//!
//! Malformed records are skipped, not errors. Only a payload that is empty
//! or not an array fails as a whole.

use serde_json::Value;

use crate::contact::Contact;
use crate::error::{Error, Result};

/// Number of string-valued members in a well-formed record
pub const RECORD_FIELDS: usize = 3;

/// Outcome of parsing a payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPayload {
    /// Contacts built from well-formed records, in payload order
    pub contacts: Vec<Contact>,
    /// Records that were not well-formed
    pub skipped: usize,
}

impl ParsedPayload {
    /// Number of well-formed records
    pub fn well_formed(&self) -> usize {
        self.contacts.len()
    }
}

/// Parse a JSON payload into contacts
///
/// # Returns
///
/// - `Ok(ParsedPayload)`: Well-formed contacts plus the skipped count
/// - `Err(Error::Payload)`: Empty input or top level is not an array
/// - `Err(Error::Json)`: Input is not valid JSON
pub fn parse_contacts(payload: &str) -> Result<ParsedPayload> {
    if payload.trim().is_empty() {
        return Err(Error::payload("payload is empty"));
    }

    let document: Value = serde_json::from_str(payload)?;
    let Value::Array(records) = document else {
        return Err(Error::payload("top level is not an array"));
    };

    let mut parsed = ParsedPayload::default();
    for record in &records {
        match parse_record(record) {
            Some(contact) => parsed.contacts.push(contact),
            None => parsed.skipped += 1,
        }
    }

    Ok(parsed)
}

fn parse_record(record: &Value) -> Option<Contact> {
    let fields: Vec<(&String, &str)> = record
        .as_object()?
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|value| (key, value)))
        .collect();

    if fields.len() != RECORD_FIELDS
        || fields
            .iter()
            .any(|(key, value)| key.is_empty() || value.is_empty())
    {
        return None;
    }

    Some(Contact::new(fields[0].1, fields[1].1, fields[2].1))
}
