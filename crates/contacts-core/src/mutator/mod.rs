//! Periodic background mutation
//!
//! While enabled, a task wakes every interval, picks one existing contact
//! round-robin, rewrites it (first name gets a marker suffix, phone is
//! replaced) and pushes it through the normal update path.
//!
//! ## States
//!
//! ```text
//!          enable()               disable()
//! ┌──────┐ ──────────► ┌─────────┐ ──────────► ┌──────┐
//! │ IDLE │             │ RUNNING │             │ IDLE │
//! └──────┘ ◄────────── └─────────┘             └──────┘
//!    │     (no-op if already RUNNING)  │
//!    │ retire()                retire()│
//!    ▼                                 ▼
//! ┌─────────┐  enable() → Err(Shutdown)
//! │ RETIRED │
//! └─────────┘
//! ```
//!
//! Stopping is cooperative: the stop signal interrupts the sleep, but a
//! rewrite already in progress finishes first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::duration_millis;
use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::writer::ContactWriter;

/// Handle to the loop while RUNNING
struct RunningLoop {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Guarded by one lock so that `enable` and `retire` cannot interleave
#[derive(Default)]
struct LoopState {
    running: Option<RunningLoop>,
    retired: bool,
}

/// Optional background loop rewriting one contact per tick
pub struct PeriodicMutator {
    rewriter: Arc<Rewriter>,
    interval_ms: Arc<AtomicU64>,
    state: Mutex<LoopState>,
}

impl PeriodicMutator {
    /// Create an idle mutator
    pub fn new(
        writer: ContactWriter,
        interval: Duration,
        suffix: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            rewriter: Arc::new(Rewriter {
                writer,
                suffix: suffix.into(),
                phone: phone.into(),
            }),
            interval_ms: Arc::new(AtomicU64::new(duration_millis(interval).max(1))),
            state: Mutex::new(LoopState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the loop if IDLE
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: This call started the loop
    /// - `Ok(false)`: Already running
    /// - `Err(Error::Shutdown)`: The mutator was retired
    pub fn enable(&self) -> Result<bool> {
        let mut state = self.state();
        if state.retired {
            return Err(Error::Shutdown);
        }
        if state.running.is_some() {
            return Ok(false);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let rewriter = Arc::clone(&self.rewriter);
        let interval_ms = Arc::clone(&self.interval_ms);
        let handle = tokio::spawn(run_loop(rewriter, interval_ms, stop_rx));

        state.running = Some(RunningLoop { stop_tx, handle });
        info!("Periodic update enabled (every {:?})", self.interval());
        Ok(true)
    }

    /// Stop the loop and wait for it to exit
    ///
    /// # Returns
    ///
    /// `true` if a running loop was stopped, `false` if already IDLE
    pub async fn disable(&self) -> bool {
        let running = self.state().running.take();
        Self::stop(running).await
    }

    /// Stop the loop for good
    ///
    /// Every later `enable` fails with `Error::Shutdown`. The retired flag
    /// is set in the same critical section that takes the running loop, so
    /// no `enable` can start a loop this call does not join.
    pub async fn retire(&self) -> bool {
        let running = {
            let mut state = self.state();
            state.retired = true;
            state.running.take()
        };
        Self::stop(running).await
    }

    async fn stop(running: Option<RunningLoop>) -> bool {
        let Some(running) = running else {
            return false;
        };

        // The loop may already have exited if the runtime is shutting down.
        let _ = running.stop_tx.send(());
        if let Err(e) = running.handle.await {
            error!("Periodic update task failed: {}", e);
        }

        info!("Periodic update disabled");
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.state().running.is_some()
    }

    pub fn is_retired(&self) -> bool {
        self.state().retired
    }

    /// Change the interval
    ///
    /// Takes effect from the next sleep; legal before or after `enable`.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(duration_millis(interval).max(1), Ordering::SeqCst);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }

    /// Run a single rewrite immediately, outside the loop
    ///
    /// # Returns
    ///
    /// The contact that was rewritten (its pre-update identity), or `None`
    /// if the store was empty or the rewrite was rejected
    pub async fn tick(&self, cursor: &mut usize) -> Option<Contact> {
        self.rewriter.tick(cursor).await
    }
}

impl Drop for PeriodicMutator {
    fn drop(&mut self) {
        if let Some(running) = self.state().running.take() {
            let _ = running.stop_tx.send(());
        }
    }
}

async fn run_loop(
    rewriter: Arc<Rewriter>,
    interval_ms: Arc<AtomicU64>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut cursor = 0usize;

    loop {
        let interval = Duration::from_millis(interval_ms.load(Ordering::SeqCst));

        tokio::select! {
            // Fires on an explicit stop and when the sender is dropped
            _ = &mut stop_rx => break,
            _ = tokio::time::sleep(interval) => {}
        }

        if rewriter.writer.is_closed() {
            break;
        }

        rewriter.tick(&mut cursor).await;
    }

    debug!("Periodic update loop exiting");
}

struct Rewriter {
    writer: ContactWriter,
    suffix: String,
    phone: String,
}

impl Rewriter {
    /// Build the replacement for `old`
    fn rewrite(&self, old: &Contact) -> Contact {
        Contact::new(
            format!("{}{}", old.first_name(), self.suffix),
            old.last_name(),
            self.phone.as_str(),
        )
    }

    async fn tick(&self, cursor: &mut usize) -> Option<Contact> {
        // nth() wraps the cursor modulo the current size under the store
        // lock, so a shrinking store cannot push it out of range.
        let old = self.writer.store().nth(*cursor).await?;
        *cursor = cursor.wrapping_add(1);

        let new = self.rewrite(&old);
        match self.writer.update(&old, &new).await {
            Ok(()) => Some(old),
            Err(e) => {
                debug!("Periodic update of {} skipped: {}", old, e);
                None
            }
        }
    }
}
