//! Notifier worker pool
//!
//! ## Architecture
//! ```text
//!                      ┌──► worker 1 ──┐
//! [ EventQueue ] ──────┼──► worker 2 ──┼──► callbacks(kind), then observers
//!                      └──► worker N ──┘     (registration order, awaited)
//! ```
//!
//! ## Rules
//! - **Per-event order**: kind callbacks first, then whole-object observers
//! - **No cross-worker ordering**: with N > 1, two events may be dispatched
//!   concurrently by different workers
//! - **Isolation**: a panicking listener is logged and skipped, the worker
//!   keeps going
//! - **Exit**: a worker returns when the queue reports stopped-and-empty

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::event::{ChangeEvent, ChangeKind};
use crate::queue::EventQueue;
use crate::registry::{ObserverRegistry, ObserverSnapshot};

/// Fixed-size set of tasks draining the event queue
pub struct NotifierPool {
    workers: Vec<JoinHandle<()>>,
    dispatched: Arc<AtomicUsize>,
}

impl NotifierPool {
    /// Spawn `size` workers on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(queue: Arc<EventQueue>, registry: Arc<ObserverRegistry>, size: usize) -> Self {
        let size = size.max(1);
        let dispatched = Arc::new(AtomicUsize::new(0));

        let workers = (0..size)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let registry = Arc::clone(&registry);
                let dispatched = Arc::clone(&dispatched);

                tokio::spawn(async move {
                    while let Some(event) = queue.wait_and_pop().await {
                        dispatch(&registry.snapshot(), &event).await;
                        dispatched.fetch_add(1, Ordering::SeqCst);
                    }
                    debug!("Notifier worker {} exiting", id);
                })
            })
            .collect();

        info!("Started {} notifier worker(s)", size);

        Self {
            workers,
            dispatched,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of events fully dispatched so far
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Shared handle to the dispatch counter, readable after `join`
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.dispatched)
    }

    /// Wait for every worker to exit
    ///
    /// Workers only exit once the queue is stopped, so stop it first.
    ///
    /// # Returns
    ///
    /// The total number of events dispatched
    pub async fn join(self) -> usize {
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Notifier worker failed: {}", e);
            }
        }

        let dispatched = self.dispatched.load(Ordering::SeqCst);
        info!("Notifier pool stopped after {} event(s)", dispatched);
        dispatched
    }
}

/// Deliver one event to every listener in `snapshot`
pub async fn dispatch(snapshot: &ObserverSnapshot, event: &ChangeEvent) {
    debug!(
        "Dispatching {} event for {} (queued {}ms)",
        event.kind,
        event.contact,
        event.age().num_milliseconds()
    );

    for callback in snapshot.callbacks(event.kind) {
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| callback())) {
            error!(
                "{} callback panicked: {}",
                event.kind,
                panic_message(panic.as_ref())
            );
        }
    }

    for observer in snapshot.observers() {
        let contact = event.contact.clone();
        let fut = match event.kind {
            ChangeKind::Add => observer.on_contact_added(contact),
            ChangeKind::Update => observer.on_contact_updated(contact),
        };

        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            error!(
                "Observer {} panicked on {} event: {}",
                observer.name(),
                event.kind,
                panic_message(panic.as_ref())
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
