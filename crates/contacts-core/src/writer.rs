//! Mutation path shared by callers and the periodic mutator
//!
//! A write goes to the store first. Only when the store accepts it is a
//! change event pushed, after the store lock has been released.
//!
//! Every write holds a shared in-flight guard from the open check until its
//! event is queued. [`ContactWriter::close_and_wait`] takes the guard
//! exclusively, so once it returns no accepted write can still be on its
//! way to the queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::event::ChangeEvent;
use crate::queue::EventQueue;
use crate::traits::ContactStore;

/// Store handle that publishes a change event for every accepted mutation
#[derive(Clone)]
pub struct ContactWriter {
    store: Arc<dyn ContactStore>,
    queue: Arc<EventQueue>,
    closing: Arc<AtomicBool>,
    in_flight: Arc<RwLock<()>>,
}

impl ContactWriter {
    pub fn new(store: Arc<dyn ContactStore>, queue: Arc<EventQueue>) -> Self {
        Self {
            store,
            queue,
            closing: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(RwLock::new(())),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Refuse every later write with [`Error::Shutdown`]
    pub fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Close, then wait until every write that got past the open check has
    /// queued its event
    pub async fn close_and_wait(&self) {
        self.close();
        drop(self.in_flight.write().await);
    }

    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Shutdown);
        }
        Ok(())
    }

    /// Add a contact and publish an ADD event for it
    pub async fn add(&self, contact: &Contact) -> Result<()> {
        let _guard = self.in_flight.read().await;
        self.ensure_open()?;
        self.store.add(contact).await?;

        debug!("Contact {} added", contact);
        self.queue.push(ChangeEvent::added(contact.clone()));
        Ok(())
    }

    /// Replace `old` with `new` and publish an UPDATE event carrying `old`
    pub async fn update(&self, old: &Contact, new: &Contact) -> Result<()> {
        let _guard = self.in_flight.read().await;
        self.ensure_open()?;
        self.store.update(old, new).await?;

        debug!("Contact {} updated to {}", old, new);
        self.queue.push(ChangeEvent::updated(old.clone()));
        Ok(())
    }
}
