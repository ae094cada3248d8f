//! Test doubles and common utilities for pipeline contract tests

#![allow(dead_code)]

use async_trait::async_trait;
use contacts_core::{Contact, ContactDirectory, ContactObserver, PipelineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Nine distinct, well-formed contacts
pub const INVENTORS: &str = r#"[
    {"first": "Alexander", "last": "Bell", "phone": "+16170000001"},
    {"first": "Thomas", "last": "Watson", "phone": "+16170000002"},
    {"first": "Elisha", "last": "Gray", "phone": "+18476003599"},
    {"first": "Antonio", "last": "Meucci", "phone": "+17188763245"},
    {"first": "Guglielmo", "last": "Marconi", "phone": "+39051203222"},
    {"first": "Samuel", "last": "Morse", "phone": "+16172419876"},
    {"first": "Tim", "last": "Berners-Lee", "phone": "+44204549898"},
    {"first": "John", "last": "Baird", "phone": "+4408458591006"},
    {"first": "Thomas", "last": "Edison", "phone": "+19086575678"}
]"#;

/// Four records, one a repeat of another
pub const WITH_DUPLICATE: &str = r#"[
    {"first": "Alexander", "last": "Bell", "phone": "+16170000001"},
    {"first": "Thomas", "last": "Watson", "phone": "+16170000002"},
    {"first": "Elisha", "last": "Gray", "phone": "+18476003599"},
    {"first": "Thomas", "last": "Watson", "phone": "+16170000002"}
]"#;

/// Four records, two with an empty key
pub const WITH_EMPTY_KEYS: &str = r#"[
    {"": "Alexander", "last": "Bell", "phone": "+16170000001"},
    {"first": "Thomas", "last": "Watson", "phone": "+16170000002"},
    {"first": "Elisha", "last": "Gray", "phone": "+18476003599"},
    {"": "Thomas", "last": "Watson", "phone": "+16170000002"}
]"#;

pub fn bell() -> Contact {
    Contact::new("Alexander", "Bell", "+16170000001")
}

pub fn watson() -> Contact {
    Contact::new("Thomas", "Watson", "+16170000002")
}

/// Observer that records everything it receives
#[derive(Default)]
pub struct RecordingObserver {
    added: AtomicUsize,
    updated: AtomicUsize,
    received: Mutex<Vec<(&'static str, Contact)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub fn updated(&self) -> usize {
        self.updated.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<(&'static str, Contact)> {
        self.received.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<Contact> {
        self.received()
            .into_iter()
            .filter(|(kind, _)| *kind == "update")
            .map(|(_, contact)| contact)
            .collect()
    }
}

#[async_trait]
impl ContactObserver for RecordingObserver {
    async fn on_contact_added(&self, contact: Contact) {
        self.received.lock().unwrap().push(("add", contact));
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_contact_updated(&self, contact: Contact) {
        self.received.lock().unwrap().push(("update", contact));
        self.updated.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pipeline config with a short drain window so tests finish quickly
pub fn test_config() -> PipelineConfig {
    PipelineConfig::default().with_drain(50, Duration::from_millis(10))
}

/// Directory with one registered recorder
pub fn directory_with_recorder() -> (ContactDirectory, Arc<RecordingObserver>) {
    let directory = ContactDirectory::new(test_config()).expect("valid config");
    let recorder = RecordingObserver::new();
    directory.register_observer(recorder.clone());
    (directory, recorder)
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Give workers time to deliver anything still in flight
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
