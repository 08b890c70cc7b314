//! Abstract storage traits for contact records.
//!
//! These traits define the contract the reconciliation engine requires from a
//! backend. By using traits, we enable:
//! - In-memory backends for testing and embedded use
//! - SQL backends for production
//!
//! The engine never manages connections or pooling itself; it asks the store
//! to begin a transaction, performs every read and write through that
//! transaction, and commits on the single success path. Dropping a
//! transaction without committing must roll back every mutation made through
//! it, on every exit path.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::contact::{Contact, ContactId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Contact not found.
    #[error("Contact not found: {0}")]
    ContactNotFound(ContactId),

    /// The backend is unreachable or refused the operation transiently.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Backend invariant failure.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Transaction factory for contact storage.
///
/// # Isolation
///
/// Implementations must provide at least read-committed isolation with
/// transaction-scoped visibility of own writes. Serializable isolation (or
/// per-cluster advisory locking) is expected in practice: without it, two
/// concurrent reconciliations over overlapping clusters can each promote a
/// different primary. The in-memory backend serializes transactions outright.
pub trait ContactStore: Send + Sync {
    /// Begins a transaction.
    ///
    /// The returned transaction rolls back when dropped; only an explicit
    /// [`ContactTx::commit`] persists its mutations.
    fn begin(&self) -> Result<Box<dyn ContactTx + '_>, StorageError>;
}

/// One open storage transaction.
///
/// All six operations the reconciliation algorithm needs, plus commit.
/// Reads observe the transaction's own prior writes. Mutating operations
/// stamp `updated_at`; inserts assign a fresh monotonic id and stamp both
/// timestamps.
pub trait ContactTx {
    /// Fetches all contacts whose email equals `email` or whose phone equals
    /// `phone`. Absent arguments match nothing (never null rows).
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StorageError>;

    /// Fetches all contacts whose `id` or `linked_id` is in `ids`.
    fn find_by_ids_or_linked_ids(
        &mut self,
        ids: &BTreeSet<ContactId>,
    ) -> Result<Vec<Contact>, StorageError>;

    /// Inserts a new primary contact and returns the stored record.
    fn insert_primary(
        &mut self,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Contact, StorageError>;

    /// Inserts a new secondary contact linked to `linked_id` and returns the
    /// stored record.
    fn insert_secondary(
        &mut self,
        email: Option<String>,
        phone: Option<String>,
        linked_id: ContactId,
    ) -> Result<Contact, StorageError>;

    /// Relabels `id` as primary and clears its `linked_id`.
    fn promote_to_primary(&mut self, id: ContactId) -> Result<Contact, StorageError>;

    /// Relabels `id` as secondary, linked to `linked_id`.
    fn demote_to_secondary(
        &mut self,
        id: ContactId,
        linked_id: ContactId,
    ) -> Result<Contact, StorageError>;

    /// Commits every mutation made through this transaction.
    fn commit(self: Box<Self>) -> Result<(), StorageError>;
}
