// # Memory Contact Store
//
// In-memory implementation of ContactStore.
//
// ## Locking
//
// The whole set sits behind one mutex. Every operation holds it for its
// entire critical section, so an update's remove and insert are never
// visible separately and a snapshot never sees a half-applied update.
//
// ## Crash Behavior
//
// - All contacts are lost on restart
// - Nothing is persisted

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use async_trait::async_trait;
use tracing::debug;

use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::traits::contact_store::ContactStore;

/// In-memory contact store
///
/// Contacts are kept in a `HashSet` keyed by their structural identity,
/// which enforces at most one entry per (first, last, phone) triple.
///
/// # Example
///
/// ```rust,no_run
/// use contacts_core::{Contact, ContactStore, MemoryContactStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryContactStore::new();
///
///     store.add(&Contact::new("Alexander", "Bell", "+16170000001")).await?;
///     assert_eq!(store.len().await, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryContactStore {
    inner: Arc<Mutex<HashSet<Contact>>>,
}

impl MemoryContactStore {
    /// Create a new empty memory contact store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a contact exists
    pub async fn contains(&self, contact: &Contact) -> bool {
        self.inner.lock().await.contains(contact)
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn add(&self, contact: &Contact) -> Result<()> {
        contact.validate()?;

        let mut guard = self.inner.lock().await;
        if !guard.insert(contact.clone()) {
            return Err(Error::conflict(format!("{contact} already exists")));
        }

        debug!("Stored contact {}", contact);
        Ok(())
    }

    async fn update(&self, old: &Contact, new: &Contact) -> Result<()> {
        old.validate()?;
        new.validate()?;

        let mut guard = self.inner.lock().await;
        if !guard.contains(old) {
            return Err(Error::not_found(old.to_string()));
        }
        // Also rejects old == new: the target identity is already present.
        if guard.contains(new) {
            return Err(Error::conflict(format!("{new} already exists")));
        }

        guard.remove(old);
        guard.insert(new.clone());

        debug!("Replaced contact {} with {}", old, new);
        Ok(())
    }

    async fn snapshot(&self) -> Vec<Contact> {
        let guard = self.inner.lock().await;
        guard.iter().cloned().collect()
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    async fn nth(&self, index: usize) -> Option<Contact> {
        let guard = self.inner.lock().await;
        if guard.is_empty() {
            return None;
        }
        guard.iter().nth(index % guard.len()).cloned()
    }
}
