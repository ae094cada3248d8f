//! Core traits for the contact directory
//!
//! - [`ContactStore`]: The single source of truth for which contacts exist
//! - [`ContactObserver`]: Whole-object listener for change notifications

pub mod contact_store;
pub mod observer;

pub use contact_store::ContactStore;
pub use observer::{ContactObserver, EventCallback};
