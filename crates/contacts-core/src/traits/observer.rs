// # Observer Trait
//
// Two classes of listener receive change notifications:
//
// - Whole-object observers implement `ContactObserver` and see every event.
// - Kind-scoped callbacks are plain closures registered for one
//   `ChangeKind`. They take no arguments: they learn that a change of that
//   kind happened, nothing more.
//
// ## Usage
//
// ```rust,ignore
// use contacts_core::{Contact, ContactObserver};
//
// struct Printer;
//
// #[async_trait::async_trait]
// impl ContactObserver for Printer {
//     async fn on_contact_added(&self, contact: Contact) {
//         println!("added {contact}");
//     }
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::contact::Contact;

/// Kind-scoped callback
///
/// Identity for unregistration is the `Arc` allocation, so keep a clone of
/// the value you registered.
pub type EventCallback = Arc<dyn Fn() + Send + Sync>;

/// Whole-object observer
///
/// Both methods default to doing nothing, so implementors override only
/// what they care about.
///
/// # Dispatch
///
/// Observers are awaited one after another inside a notifier worker. A slow
/// observer delays that worker only, never the writer. A panicking observer
/// is logged and skipped; the remaining observers still run.
#[async_trait]
pub trait ContactObserver: Send + Sync {
    /// Called after a contact was added
    async fn on_contact_added(&self, _contact: Contact) {}

    /// Called after a contact was updated, with its pre-update identity
    async fn on_contact_updated(&self, _contact: Contact) {}

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
