//! Contact directory
//!
//! The ContactDirectory is responsible for:
//! - Validating and applying add/update requests through the store
//! - Publishing a change event for every accepted mutation
//! - Running the notifier workers that fan events out to observers
//! - Owning the optional periodic mutator
//! - Shutting all of it down in order
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   add/update   ┌──────────────┐
//! │  caller  │───────────────►│ ContactStore │ (one mutex)
//! └──────────┘        │       └──────────────┘
//! ┌──────────┐        │               ▲
//! │ mutator  │────────┤               │ update
//! └──────────┘        │ on success    │
//!      │              ▼               │
//!      │       ┌────────────┐         │
//!      └──────►│ EventQueue │◄────────┘
//!              └────────────┘
//!                     │ wait_and_pop
//!                     ▼
//!             ┌───────────────┐        ┌──────────────────┐
//!             │ NotifierPool  │───────►│ ObserverRegistry │
//!             └───────────────┘        └──────────────────┘
//! ```
//!
//! ## Lock Discipline
//!
//! Observers are only ever invoked by notifier workers, after the event was
//! queued and the store lock released. An observer may call back into the
//! directory without deadlocking.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::event::ChangeKind;
use crate::loader::parse_contacts;
use crate::mutator::PeriodicMutator;
use crate::notifier::NotifierPool;
use crate::queue::EventQueue;
use crate::registry::ObserverRegistry;
use crate::store::MemoryContactStore;
use crate::traits::{ContactObserver, ContactStore, EventCallback};
use crate::writer::ContactWriter;

/// Outcome of [`ContactDirectory::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Events delivered to observers over the directory's lifetime
    pub dispatched: usize,
    /// Events still queued when the drain window closed, never delivered
    pub dropped: usize,
    /// Events refused by a full queue over the directory's lifetime
    pub overflowed: usize,
}

/// In-memory contact directory with asynchronous change notification
///
/// ## Lifecycle
///
/// 1. Create with [`ContactDirectory::new()`] inside a tokio runtime
/// 2. Register observers, add and update contacts
/// 3. Call [`ContactDirectory::shutdown()`] to drain and join everything
///
/// Dropping the directory without calling `shutdown` stops the queue and the
/// mutator but does not wait for the tasks to exit.
///
/// ## Threading
///
/// Every method takes `&self`; wrap the directory in an `Arc` to share it
/// between tasks. Once `shutdown` has begun, writes from any task fail with
/// `Error::Shutdown`.
pub struct ContactDirectory {
    writer: ContactWriter,
    registry: Arc<ObserverRegistry>,
    mutator: PeriodicMutator,
    notifiers: Mutex<Option<NotifierPool>>,
    dispatched: Arc<AtomicUsize>,
    config: PipelineConfig,
}

impl ContactDirectory {
    /// Create a directory backed by a [`MemoryContactStore`]
    ///
    /// # Errors
    ///
    /// `Error::Config` if the configuration is invalid
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_store(Arc::new(MemoryContactStore::new()), config)
    }

    /// Create a directory on top of an existing store
    pub fn with_store(store: Arc<dyn ContactStore>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(EventQueue::new(config.queue_capacity));
        let registry = Arc::new(ObserverRegistry::new());
        let writer = ContactWriter::new(store, Arc::clone(&queue));

        let notifiers = NotifierPool::start(queue, Arc::clone(&registry), config.notifier_count());
        let mutator = PeriodicMutator::new(
            writer.clone(),
            config.update_interval(),
            config.update_suffix.as_str(),
            config.update_phone.as_str(),
        );

        if config.server_update {
            mutator.enable()?;
        }

        Ok(Self {
            writer,
            registry,
            mutator,
            dispatched: notifiers.counter(),
            notifiers: Mutex::new(Some(notifiers)),
            config,
        })
    }

    /// Add a new contact
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Added; an ADD event was queued
    /// - `Err(Error::Validation)`: A field is empty
    /// - `Err(Error::Conflict)`: The contact already exists
    /// - `Err(Error::Shutdown)`: Shutdown has begun
    pub async fn add(&self, contact: &Contact) -> Result<()> {
        self.writer.add(contact).await
    }

    /// Replace `old` with `new`
    ///
    /// The UPDATE event carries `old`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Updated; an UPDATE event was queued
    /// - `Err(Error::Validation)`: Either contact has an empty field
    /// - `Err(Error::NotFound)`: `old` does not exist
    /// - `Err(Error::Conflict)`: `new` already exists, including `new == old`
    /// - `Err(Error::Shutdown)`: Shutdown has begun
    pub async fn update(&self, old: &Contact, new: &Contact) -> Result<()> {
        self.writer.update(old, new).await
    }

    /// Snapshot of every contact, in no particular order
    pub async fn list(&self) -> Vec<Contact> {
        self.writer.store().snapshot().await
    }

    pub async fn len(&self) -> usize {
        self.writer.store().len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.writer.store().is_empty().await
    }

    /// Register an observer for every add and update
    pub fn register_observer(&self, observer: Arc<dyn ContactObserver>) {
        debug!("Registering observer {}", observer.name());
        self.registry.register_observer(observer);
    }

    /// Unregister a previously registered observer
    ///
    /// # Returns
    ///
    /// `true` if a registration was removed
    pub fn unregister_observer(&self, observer: &Arc<dyn ContactObserver>) -> bool {
        self.registry.unregister_observer(observer)
    }

    /// Register a callback invoked (without arguments) for every event of `kind`
    pub fn register_callback(&self, kind: ChangeKind, callback: EventCallback) {
        self.registry.register_callback(kind, callback);
    }

    /// Unregister a previously registered callback
    pub fn unregister_callback(&self, kind: ChangeKind, callback: &EventCallback) -> bool {
        self.registry.unregister_callback(kind, callback)
    }

    /// Start the periodic mutator
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Started by this call
    /// - `Ok(false)`: Already running
    /// - `Err(Error::Shutdown)`: Shutdown has begun
    pub fn enable_server_update(&self) -> Result<bool> {
        if self.writer.is_closed() {
            return Err(Error::Shutdown);
        }
        // Shutdown may retire the mutator between the check above and this
        // call; enable() rechecks under the mutator's own lock.
        self.mutator.enable()
    }

    /// Stop the periodic mutator and wait for its loop to exit
    pub async fn disable_server_update(&self) -> bool {
        self.mutator.disable().await
    }

    pub fn is_server_update_enabled(&self) -> bool {
        self.mutator.is_enabled()
    }

    pub fn set_update_interval(&self, interval: Duration) {
        self.mutator.set_interval(interval);
    }

    pub fn update_interval(&self) -> Duration {
        self.mutator.interval()
    }

    /// Events queued and not yet picked up by a worker
    pub fn queue_len(&self) -> usize {
        self.writer.queue().len()
    }

    /// Events fully delivered to observers so far
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Events refused by a full queue so far
    pub fn overflowed(&self) -> usize {
        self.writer.queue().overflowed()
    }

    /// Whether shutdown has begun
    pub fn is_shut_down(&self) -> bool {
        self.writer.is_closed()
    }

    fn take_notifiers(&self) -> Option<NotifierPool> {
        self.notifiers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Bulk load contacts from a JSON payload
    ///
    /// Malformed records, invalid contacts and duplicates are skipped.
    ///
    /// # Returns
    ///
    /// - `Ok(count)`: Number of contacts added
    /// - `Err(Error::Payload | Error::Json)`: The payload as a whole is unusable
    /// - `Err(Error::Shutdown)`: Shutdown began during the load
    pub async fn load_json(&self, payload: &str) -> Result<usize> {
        let parsed = parse_contacts(payload)?;

        let mut added = 0;
        for contact in &parsed.contacts {
            match self.writer.add(contact).await {
                Ok(()) => added += 1,
                Err(e) if e.is_rejection() => debug!("Skipping {}: {}", contact, e),
                Err(e) => return Err(e),
            }
        }

        info!(
            "Loaded {} of {} well-formed contact(s), {} malformed record(s) skipped",
            added,
            parsed.well_formed(),
            parsed.skipped
        );
        Ok(added)
    }

    /// Bulk load contacts from a JSON file
    pub async fn load_json_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let payload = tokio::fs::read_to_string(path.as_ref()).await?;
        self.load_json(&payload).await
    }

    /// Shut the pipeline down
    ///
    /// In order: refuse new writes, stop and join the mutator, give the
    /// workers a bounded window to drain the queue, stop the queue, discard
    /// whatever is left, join the workers.
    ///
    /// Delivery is best-effort: events still queued when the drain window
    /// closes are dropped and counted in the report. Calling this again
    /// after it has completed returns immediately with nothing dropped.
    pub async fn shutdown(&self) -> ShutdownReport {
        let Some(notifiers) = self.take_notifiers() else {
            return ShutdownReport {
                dispatched: self.dispatched(),
                dropped: 0,
                overflowed: self.overflowed(),
            };
        };

        info!("Shutting down contact directory");
        self.writer.close_and_wait().await;
        self.mutator.retire().await;

        let queue = self.writer.queue();
        let interval = self.config.drain_interval();
        for _ in 0..self.config.drain_retries {
            if queue.is_empty() {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        queue.stop();
        let dropped = queue.clear();
        if dropped > 0 {
            warn!("Drain window closed with {} undelivered event(s)", dropped);
        }

        let dispatched = notifiers.join().await;

        let overflowed = queue.overflowed();
        if overflowed > 0 {
            warn!("{} event(s) were lost to queue overflow", overflowed);
        }

        info!("Contact directory stopped");
        ShutdownReport {
            dispatched,
            dropped,
            overflowed,
        }
    }
}

impl Drop for ContactDirectory {
    fn drop(&mut self) {
        // Workers exit on their own once the stopped queue is empty.
        if self.take_notifiers().is_some() {
            self.writer.close();
            self.writer.queue().stop();
        }
    }
}
