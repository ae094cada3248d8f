// # Contact Store Trait
//
// Defines the interface for the record store behind the directory.
//
// ## Purpose
//
// The store decides which contacts exist. It validates, rejects duplicates
// and performs the remove-then-insert of an update as one critical section.
// It knows nothing about events or observers; the directory pushes events
// only after a store call has returned successfully.
//
// ## Implementations
//
// - In-memory: `MemoryContactStore`

use async_trait::async_trait;

use crate::contact::Contact;
use crate::error::Result;

/// Trait for contact store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks. Each
/// method must complete its read or mutation under a single lock
/// acquisition so that no caller observes an update half-applied.
///
/// # Lock Discipline
///
/// Implementations must never call back into observers or the event queue
/// while holding their lock.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Insert a new contact
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The contact was inserted
    /// - `Err(Error::Validation)`: A field is empty, nothing changed
    /// - `Err(Error::Conflict)`: The contact already exists, nothing changed
    async fn add(&self, contact: &Contact) -> Result<()>;

    /// Replace `old` with `new`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: `old` was removed and `new` inserted atomically
    /// - `Err(Error::Validation)`: Either contact has an empty field
    /// - `Err(Error::NotFound)`: `old` does not exist
    /// - `Err(Error::Conflict)`: `new` already exists (including `new == old`)
    async fn update(&self, old: &Contact, new: &Contact) -> Result<()>;

    /// Copy every contact into an independent list
    ///
    /// Ordering is unspecified and callers must not depend on it.
    async fn snapshot(&self) -> Vec<Contact>;

    /// Number of contacts currently stored
    async fn len(&self) -> usize;

    /// Check if the store is empty
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Fetch the contact at `index` in the store's iteration order
    ///
    /// The index wraps modulo the current size, so any index is valid while
    /// the store is non-empty. Returns `None` only for an empty store.
    async fn nth(&self, index: usize) -> Option<Contact>;
}
