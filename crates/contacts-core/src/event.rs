//! Change events carried from writers to notifier workers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contact::Contact;

/// The kind of mutation an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A new contact was inserted
    Add,
    /// An existing contact was replaced
    Update,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => f.write_str("add"),
            ChangeKind::Update => f.write_str("update"),
        }
    }
}

/// A completed mutation
///
/// For [`ChangeKind::Add`] the contact is the inserted one. For
/// [`ChangeKind::Update`] it is the identity the contact had *before* the
/// update; the replacement values are not carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened
    pub kind: ChangeKind,
    /// The contact it happened to
    pub contact: Contact,
    /// When the mutation was committed
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, contact: Contact) -> Self {
        Self {
            kind,
            contact,
            occurred_at: chrono::Utc::now(),
        }
    }

    pub fn added(contact: Contact) -> Self {
        Self::new(ChangeKind::Add, contact)
    }

    /// Create an update event from the pre-update identity
    pub fn updated(previous: Contact) -> Self {
        Self::new(ChangeKind::Update, previous)
    }

    /// Time since the mutation was committed
    ///
    /// Clamped at zero if the wall clock stepped backwards.
    pub fn age(&self) -> chrono::Duration {
        (chrono::Utc::now() - self.occurred_at).max(chrono::Duration::zero())
    }
}
