//! Contract Test: Store Semantics
//!
//! Constraints verified:
//! - Every accepted add or update produces exactly one event
//! - Rejected writes change nothing and produce no event
//! - Updates are atomic: old and new never coexist, neither is ever missing
//! - Concurrent writers never lose or duplicate a contact
//!
//! If this test fails, someone has:
//! - Published an event before (or without) the store accepting the write
//! - Split an update into separately locked remove and insert steps

mod common;

use common::*;
use contacts_core::{Contact, ContactDirectory, Error};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn distinct_adds_are_all_listed() {
    let (directory, recorder) = directory_with_recorder();

    assert_ok!(directory.add(&bell()).await);
    assert_ok!(directory.add(&watson()).await);

    let listed: HashSet<Contact> = directory.list().await.into_iter().collect();
    assert_eq!(listed, HashSet::from([bell(), watson()]));

    assert!(wait_until(|| recorder.added() == 2).await);
    directory.shutdown().await;
}

#[tokio::test]
async fn duplicate_add_produces_one_event() {
    let (directory, recorder) = directory_with_recorder();

    assert_ok!(directory.add(&bell()).await);
    let err = assert_err!(directory.add(&bell()).await);
    assert!(matches!(err, Error::Conflict(_)));

    assert!(wait_until(|| recorder.added() == 1).await);
    settle().await;
    assert_eq!(recorder.added(), 1);
    assert_eq!(directory.len().await, 1);

    directory.shutdown().await;
}

#[tokio::test]
async fn invalid_contact_is_rejected() {
    let (directory, recorder) = directory_with_recorder();

    let err = assert_err!(directory.add(&Contact::new("Alexander", "", "+1")).await);
    assert!(matches!(err, Error::Validation(_)));
    assert!(directory.is_empty().await);

    let report = directory.shutdown().await;
    assert_eq!(report.dispatched, 0);
    assert_eq!(recorder.added(), 0);
}

#[tokio::test]
async fn update_of_missing_contact_produces_no_event() {
    let (directory, recorder) = directory_with_recorder();

    let err = assert_err!(directory.update(&bell(), &watson()).await);
    assert!(matches!(err, Error::NotFound(_)));
    assert!(directory.is_empty().await);

    settle().await;
    assert_eq!(recorder.updated(), 0);
    directory.shutdown().await;
}

#[tokio::test]
async fn update_onto_existing_contact_changes_nothing() {
    let (directory, recorder) = directory_with_recorder();
    assert_ok!(directory.add(&bell()).await);
    assert_ok!(directory.add(&watson()).await);

    let err = assert_err!(directory.update(&bell(), &watson()).await);
    assert!(matches!(err, Error::Conflict(_)));

    // Identity update is a conflict too
    let err = assert_err!(directory.update(&bell(), &bell()).await);
    assert!(matches!(err, Error::Conflict(_)));

    let listed: HashSet<Contact> = directory.list().await.into_iter().collect();
    assert_eq!(listed, HashSet::from([bell(), watson()]));

    assert!(wait_until(|| recorder.added() == 2).await);
    settle().await;
    assert_eq!(recorder.updated(), 0);
    directory.shutdown().await;
}

#[tokio::test]
async fn accepted_update_replaces_and_reports_old() {
    let (directory, recorder) = directory_with_recorder();
    assert_ok!(directory.add(&bell()).await);

    let renamed = Contact::new("Alec", "Bell", "+16170000001");
    assert_ok!(directory.update(&bell(), &renamed).await);

    assert_eq!(directory.list().await, vec![renamed]);

    assert!(wait_until(|| recorder.updated() == 1).await);
    assert_eq!(recorder.updates(), vec![bell()]);
    directory.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_lose_nothing() {
    let (directory, recorder) = directory_with_recorder();
    let directory = Arc::new(directory);

    let mut writers = Vec::new();
    for w in 0..8 {
        let directory = Arc::clone(&directory);
        writers.push(tokio::spawn(async move {
            for n in 0..25 {
                let contact = Contact::new(format!("Writer{w}"), format!("Entry{n}"), "+1555");
                directory.add(&contact).await.unwrap();
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    assert_eq!(directory.len().await, 200);
    assert!(wait_until(|| recorder.added() == 200).await);

    let report = directory.shutdown().await;
    assert_eq!(report.dispatched, 200);
    assert_eq!(report.dropped, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_half_applied_update() {
    let directory = Arc::new(ContactDirectory::new(test_config()).unwrap());
    let a = Contact::new("Alexander", "Bell", "+16170000001");
    let b = Contact::new("Alec", "Bell", "+16170000001");
    directory.add(&a).await.unwrap();

    let flipper = {
        let directory = Arc::clone(&directory);
        let (a, b) = (a.clone(), b.clone());
        tokio::spawn(async move {
            for n in 0..200 {
                let (from, to) = if n % 2 == 0 { (&a, &b) } else { (&b, &a) };
                directory.update(from, to).await.unwrap();
            }
        })
    };

    for _ in 0..200 {
        let listed = directory.list().await;
        assert_eq!(listed.len(), 1, "old and new must never coexist or vanish");
        assert!(listed[0] == a || listed[0] == b);
        tokio::task::yield_now().await;
    }

    flipper.await.unwrap();
    directory.shutdown().await;
}
