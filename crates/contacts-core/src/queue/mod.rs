//! Bounded event queue between writers and notifier workers
//!
//! ```text
//! add/update ──┐
//!              ├── push ──► [ EventQueue ] ── wait_and_pop ──► worker 1..N
//! mutator ─────┘             (bounded FIFO)
//! ```
//!
//! ## Rules
//! - **FIFO**: events from a single producer come out in the order pushed
//! - **Overflow**: a push to a full queue drops the event (logged, counted)
//! - **Stop**: wakes every waiter; waiters drain what is left, then see `None`
//! - **Push after stop**: still accepted, for draining

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::warn;

use crate::event::ChangeEvent;

/// Multi-producer, multi-consumer FIFO of [`ChangeEvent`]s
///
/// The buffer lock is a `std` mutex: it is never held across an await.
#[derive(Debug)]
pub struct EventQueue {
    events: Mutex<VecDeque<ChangeEvent>>,
    capacity: usize,
    notify: Notify,
    stopped: AtomicBool,
    overflowed: AtomicUsize,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
            overflowed: AtomicUsize::new(0),
        }
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<ChangeEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event and wake one waiting consumer
    ///
    /// # Returns
    ///
    /// `false` if the queue was full and the event was dropped
    pub fn push(&self, event: ChangeEvent) -> bool {
        {
            let mut events = self.events();
            if events.len() >= self.capacity {
                // Event processing is slower than event generation; dropping
                // keeps memory bounded.
                warn!(
                    "Event queue full ({} events), dropping {} event for {}",
                    self.capacity, event.kind, event.contact
                );
                self.overflowed.fetch_add(1, Ordering::SeqCst);
                return false;
            }
            events.push_back(event);
        }

        self.notify.notify_one();
        true
    }

    /// Wait for the next event
    ///
    /// # Returns
    ///
    /// - `Some(event)`: The oldest queued event
    /// - `None`: The queue is stopped and empty; the caller should exit
    pub async fn wait_and_pop(&self) -> Option<ChangeEvent> {
        loop {
            // Register interest before checking, so a push or stop between
            // the check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut events = self.events();
                if let Some(event) = events.pop_front() {
                    return Some(event);
                }
            }

            if self.is_stopped() {
                return None;
            }

            notified.await;
        }
    }

    /// Take the next event without waiting
    pub fn try_pop(&self) -> Option<ChangeEvent> {
        self.events().pop_front()
    }

    /// Discard every queued event
    ///
    /// # Returns
    ///
    /// The number of events discarded
    pub fn clear(&self) -> usize {
        let mut events = self.events();
        let discarded = events.len();
        events.clear();
        discarded
    }

    /// Permanently close the queue and wake every waiter
    ///
    /// Idempotent.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Point-in-time emptiness check
    ///
    /// Racy by nature. Only used for best-effort draining.
    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped so far because the queue was full
    pub fn overflowed(&self) -> usize {
        self.overflowed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use std::sync::Arc;
    use std::time::Duration;

    fn event(n: usize) -> ChangeEvent {
        ChangeEvent::added(Contact::new(format!("First{n}"), "Last", "+1000"))
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = EventQueue::new(8);
        for n in 0..3 {
            assert!(queue.push(event(n)));
        }

        for n in 0..3 {
            let popped = queue.wait_and_pop().await.unwrap();
            assert_eq!(popped.contact.first_name(), format!("First{n}"));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let queue = EventQueue::new(2);
        assert!(queue.push(event(0)));
        assert!(queue.push(event(1)));
        assert!(!queue.push(event(2)));
        assert!(!queue.push(event(3)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.overflowed(), 2);
    }

    #[tokio::test]
    async fn test_stop_wakes_waiters() {
        let queue = Arc::new(EventQueue::new(8));

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            waiters.push(tokio::spawn(async move { queue.wait_and_pop().await }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.stop();

        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should wake on stop")
                .unwrap();
            assert!(result.is_none());
        }
    }

    #[tokio::test]
    async fn test_stopped_queue_drains_before_closing() {
        let queue = EventQueue::new(8);
        queue.push(event(0));
        queue.stop();
        queue.stop();

        // Push after stop is legal
        assert!(queue.push(event(1)));

        assert!(queue.wait_and_pop().await.is_some());
        assert!(queue.wait_and_pop().await.is_some());
        assert!(queue.wait_and_pop().await.is_none());
    }

    #[test]
    fn test_clear_reports_discarded() {
        let queue = EventQueue::new(8);
        queue.push(event(0));
        queue.push(event(1));

        assert_eq!(queue.clear(), 2);
        assert!(queue.try_pop().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_each_producer_keeps_its_own_order() {
        let queue = Arc::new(EventQueue::new(256));

        let producers: Vec<_> = ["P0", "P1"]
            .into_iter()
            .map(|producer| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    for seq in 0..50 {
                        let contact = Contact::new(producer, seq.to_string(), "+1000");
                        assert!(queue.push(ChangeEvent::added(contact)));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }

        let mut next = [0usize; 2];
        while let Some(event) = queue.try_pop() {
            let producer = match event.contact.first_name() {
                "P0" => 0,
                "P1" => 1,
                other => panic!("unknown producer {other}"),
            };
            let seq: usize = event.contact.last_name().parse().unwrap();
            assert_eq!(seq, next[producer], "producer {producer} out of order");
            next[producer] += 1;
        }
        assert_eq!(next, [50, 50]);
    }

    #[tokio::test]
    async fn test_push_wakes_blocked_consumer() {
        let queue = Arc::new(EventQueue::new(8));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.wait_and_pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(event(7));

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(popped.contact.first_name(), "First7");
    }
}
