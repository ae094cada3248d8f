//! Contract Test: Shutdown Determinism
//!
//! Constraints verified:
//! - Shutdown terminates in bounded time, even with a slow observer
//! - Writes after shutdown began fail with `Error::Shutdown`
//! - Events are dispatched, dropped at shutdown or refused by a full
//!   queue, and every one of them is counted in the report
//! - Shutdown is idempotent
//!
//! If this test fails, someone has added:
//! - Detached background tasks
//! - An unbounded drain loop
//! - Writes that slip past the closed writer

mod common;

use async_trait::async_trait;
use common::*;
use contacts_core::{Contact, ContactDirectory, ContactObserver, Error, PipelineConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn shutdown_drains_pending_events() {
    let (directory, recorder) = directory_with_recorder();
    directory.load_json(INVENTORS).await.unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), directory.shutdown())
        .await
        .expect("shutdown completes");

    assert_eq!(report.dispatched + report.dropped, 9);
    assert_eq!(report.dispatched, recorder.added());
}

#[tokio::test]
async fn writes_after_shutdown_are_refused() {
    let directory = ContactDirectory::new(test_config()).unwrap();
    directory.add(&bell()).await.unwrap();

    directory.shutdown().await;

    assert!(matches!(directory.add(&watson()).await, Err(Error::Shutdown)));
    assert!(matches!(
        directory.update(&bell(), &watson()).await,
        Err(Error::Shutdown)
    ));
    assert!(matches!(
        directory.load_json(INVENTORS).await,
        Err(Error::Shutdown)
    ));

    // Reads still work
    assert_eq!(directory.list().await, vec![bell()]);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let (directory, _recorder) = directory_with_recorder();
    directory.add(&bell()).await.unwrap();

    let first = directory.shutdown().await;
    let second = directory.shutdown().await;

    assert_eq!(second.dispatched, first.dispatched);
    assert_eq!(second.dropped, 0);
    assert!(directory.is_shut_down());
}

struct SlowObserver;

#[async_trait]
impl ContactObserver for SlowObserver {
    async fn on_contact_added(&self, _contact: Contact) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[tokio::test]
async fn drain_window_bounds_shutdown() {
    let config = PipelineConfig::default()
        .with_max_notifiers(1)
        .with_drain(2, Duration::from_millis(10));
    let directory = ContactDirectory::new(config).unwrap();
    directory.register_observer(Arc::new(SlowObserver));

    directory.load_json(INVENTORS).await.unwrap();

    let report = tokio::time::timeout(Duration::from_secs(2), directory.shutdown())
        .await
        .expect("shutdown must not wait for every slow delivery");

    assert!(report.dropped > 0);
    assert_eq!(report.dispatched + report.dropped, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_observe_shutdown() {
    let directory = Arc::new(ContactDirectory::new(test_config()).unwrap());

    let writer = {
        let directory = Arc::clone(&directory);
        tokio::spawn(async move {
            let mut accepted = 0usize;
            // Stays below the queue capacity so nothing overflows
            for n in 0..500 {
                let contact = Contact::new("Writer", format!("Entry{n}"), "+1555");
                match directory.add(&contact).await {
                    Ok(()) => accepted += 1,
                    Err(Error::Shutdown) => return accepted,
                    Err(e) => panic!("unexpected error: {e}"),
                }
                tokio::task::yield_now().await;
            }
            accepted
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = directory.shutdown().await;
    let accepted = writer.await.unwrap();

    assert_eq!(directory.len().await, accepted);
    assert_eq!(report.overflowed, 0);
    assert_eq!(report.dispatched + report.dropped, accepted);
}

#[tokio::test]
async fn queue_overflow_is_reported() {
    let config = test_config().with_max_notifiers(1).with_queue_capacity(1);
    let directory = ContactDirectory::new(config).unwrap();
    directory.register_observer(Arc::new(SlowObserver));

    let loaded = directory.load_json(INVENTORS).await.unwrap();
    assert_eq!(loaded, 9);
    assert!(directory.overflowed() > 0);

    let report = tokio::time::timeout(Duration::from_secs(5), directory.shutdown())
        .await
        .expect("shutdown completes");

    assert!(report.overflowed > 0);
    assert_eq!(report.dispatched + report.dropped + report.overflowed, loaded);
}

#[tokio::test]
async fn drop_without_shutdown_stops_workers() {
    let (directory, recorder) = directory_with_recorder();
    directory.add(&bell()).await.unwrap();
    assert!(wait_until(|| recorder.added() == 1).await);

    drop(directory);
    settle().await;
    assert_eq!(Arc::strong_count(&recorder), 1);
}
