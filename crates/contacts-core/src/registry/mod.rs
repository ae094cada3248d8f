//! Observer registry
//!
//! Holds the two classes of listener that notifier workers dispatch to:
//! whole-object [`ContactObserver`]s and kind-scoped [`EventCallback`]s.
//!
//! ## Copy-on-write
//!
//! Registration changes build a new list and swap it in under a short write
//! lock. Workers take an [`ObserverSnapshot`] (two `Arc` clones) and iterate
//! it without holding any lock, so register/unregister during dispatch
//! never disturbs an iteration in progress. A change becomes visible to the
//! next event a worker picks up.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::event::ChangeKind;
use crate::traits::{ContactObserver, EventCallback};

type ObserverList = Arc<Vec<Arc<dyn ContactObserver>>>;
type CallbackMap = Arc<HashMap<ChangeKind, Vec<EventCallback>>>;

/// Immutable view of the registry at one point in time
#[derive(Clone, Default)]
pub struct ObserverSnapshot {
    observers: ObserverList,
    callbacks: CallbackMap,
}

impl ObserverSnapshot {
    /// Whole-object observers, in registration order
    pub fn observers(&self) -> &[Arc<dyn ContactObserver>] {
        &self.observers
    }

    /// Callbacks registered for `kind`, in registration order
    pub fn callbacks(&self, kind: ChangeKind) -> &[EventCallback] {
        self.callbacks.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty() && self.callbacks.values().all(Vec::is_empty)
    }
}

/// Registry of change listeners
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock. Reads only clone the
/// current `Arc`s; writes replace them.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<ObserverList>,
    callbacks: RwLock<CallbackMap>,
}

impl ObserverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a whole-object observer for every event kind
    ///
    /// Duplicates are allowed; registering the same observer twice makes it
    /// receive every event twice.
    pub fn register_observer(&self, observer: Arc<dyn ContactObserver>) {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::clone(&observers);
        next.push(observer);
        *observers = Arc::new(next);
    }

    /// Remove the first registration of `observer`
    ///
    /// Identity is the `Arc` allocation. No-op if absent.
    ///
    /// # Returns
    ///
    /// `true` if a registration was removed
    pub fn unregister_observer(&self, observer: &Arc<dyn ContactObserver>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(position) = observers.iter().position(|o| Arc::ptr_eq(o, observer)) else {
            return false;
        };

        let mut next = Vec::clone(&observers);
        next.remove(position);
        *observers = Arc::new(next);
        true
    }

    /// Register a callback for one event kind
    pub fn register_callback(&self, kind: ChangeKind, callback: EventCallback) {
        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = HashMap::clone(&callbacks);
        next.entry(kind).or_default().push(callback);
        *callbacks = Arc::new(next);
    }

    /// Remove the first registration of `callback` under `kind`
    ///
    /// No-op if the kind or the callback is absent.
    ///
    /// # Returns
    ///
    /// `true` if a registration was removed
    pub fn unregister_callback(&self, kind: ChangeKind, callback: &EventCallback) -> bool {
        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        let Some(position) = callbacks
            .get(&kind)
            .and_then(|bucket| bucket.iter().position(|c| Arc::ptr_eq(c, callback)))
        else {
            return false;
        };

        let mut next = HashMap::clone(&callbacks);
        if let Some(bucket) = next.get_mut(&kind) {
            bucket.remove(position);
            if bucket.is_empty() {
                next.remove(&kind);
            }
        }
        *callbacks = Arc::new(next);
        true
    }

    /// Take an immutable view for dispatch
    pub fn snapshot(&self) -> ObserverSnapshot {
        let observers = self.observers.read().unwrap_or_else(PoisonError::into_inner);
        let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
        ObserverSnapshot {
            observers: Arc::clone(&*observers),
            callbacks: Arc::clone(&*callbacks),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn callback_count(&self, kind: ChangeKind) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}
