// # contacts-core
//
// Core library for the in-memory contact directory and its asynchronous
// change-notification pipeline.
//
// ## Architecture Overview
//
// - **ContactStore**: Trait for the lock-guarded record store
// - **EventQueue**: Bounded FIFO decoupling writers from notification delivery
// - **NotifierPool**: Worker tasks draining the queue into observers
// - **ObserverRegistry**: Copy-on-write registry of observers and callbacks
// - **PeriodicMutator**: Optional background loop rewriting one contact per tick
// - **ContactDirectory**: Facade that wires the pieces together
//
// ## Design Principles
//
// 1. **Writers never wait on observers**: an accepted mutation only queues an event
// 2. **One lock for the store**: no caller ever sees an update half-applied
// 3. **No observer runs under the store lock**: observers may re-enter the directory
// 4. **Failures are values**: rejections come back as `Err`, never as panics
// 5. **Best-effort drain**: shutdown bounds the time spent flushing events

pub mod config;
pub mod contact;
pub mod directory;
pub mod error;
pub mod event;
pub mod loader;
pub mod mutator;
pub mod notifier;
pub mod queue;
pub mod registry;
pub mod store;
pub mod traits;
pub mod writer;

// Re-export core types for convenience
pub use config::PipelineConfig;
pub use contact::Contact;
pub use directory::{ContactDirectory, ShutdownReport};
pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use loader::{ParsedPayload, parse_contacts};
pub use mutator::PeriodicMutator;
pub use notifier::NotifierPool;
pub use queue::EventQueue;
pub use registry::{ObserverRegistry, ObserverSnapshot};
pub use store::MemoryContactStore;
pub use traits::{ContactObserver, ContactStore, EventCallback};
pub use writer::ContactWriter;
