//! In-memory storage backend.
//!
//! A thread-safe in-memory implementation of the contact store, intended for
//! embedded usage, tests, and as a reference implementation of the contract.
//!
//! Transactions hold the table lock for their whole lifetime, so they
//! serialize: the isolation question is settled by construction. Rollback is
//! a snapshot restore; a transaction dropped without commit leaves the table
//! exactly as `begin` found it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::contact::{Contact, ContactId};
use crate::storage::traits::{ContactStore, ContactTx, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Clone, Default)]
struct Table {
    rows: BTreeMap<ContactId, Contact>,
    by_email: HashMap<String, BTreeSet<ContactId>>,
    by_phone: HashMap<String, BTreeSet<ContactId>>,
    next_id: i64,
}

impl Table {
    fn allocate_id(&mut self) -> ContactId {
        self.next_id += 1;
        ContactId::new(self.next_id)
    }

    fn index(&mut self, contact: &Contact) {
        if let Some(email) = contact.email.as_deref() {
            self.by_email
                .entry(email.to_string())
                .or_default()
                .insert(contact.id);
        }
        if let Some(phone) = contact.phone.as_deref() {
            self.by_phone
                .entry(phone.to_string())
                .or_default()
                .insert(contact.id);
        }
    }

    fn store(&mut self, contact: Contact) -> Contact {
        self.index(&contact);
        self.rows.insert(contact.id, contact.clone());
        contact
    }
}

/// Thread-safe in-memory contact store.
///
/// # Examples
///
/// ```
/// use idlink::{ContactStore, ContactTx, InMemoryContactStore};
///
/// let store = InMemoryContactStore::new();
/// let mut tx = store.begin().unwrap();
/// let c = tx.insert_primary(Some("a@x.com".into()), None).unwrap();
/// tx.commit().unwrap();
/// assert_eq!(c.id.value(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryContactStore {
    table: Mutex<Table>,
    // Remaining transaction operations before an injected failure fires.
    fault_after: Mutex<Option<u32>>,
}

impl InMemoryContactStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms fault injection: the `ops`-th subsequent transaction operation
    /// fails with [`StorageError::Unavailable`].
    ///
    /// Used by atomicity tests to force a mid-transaction failure; the
    /// containing transaction must then roll back completely.
    pub fn fail_after_ops(&self, ops: u32) {
        if let Ok(mut fault) = self.fault_after.lock() {
            *fault = Some(ops);
        }
    }

    /// Disarms fault injection.
    pub fn clear_fault(&self) {
        if let Ok(mut fault) = self.fault_after.lock() {
            *fault = None;
        }
    }

    /// Returns a copy of every stored contact, ascending by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BackendError`] if the table lock is poisoned.
    pub fn snapshot(&self) -> Result<Vec<Contact>, StorageError> {
        let table = self.table.lock().map_err(|_| lock_err("snapshot"))?;
        Ok(table.rows.values().cloned().collect())
    }

    /// Number of stored contacts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BackendError`] if the table lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let table = self.table.lock().map_err(|_| lock_err("len"))?;
        Ok(table.rows.len())
    }

    /// Returns true if the store holds no contacts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BackendError`] if the table lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl ContactStore for InMemoryContactStore {
    fn begin(&self) -> Result<Box<dyn ContactTx + '_>, StorageError> {
        let guard = self.table.lock().map_err(|_| lock_err("begin"))?;
        let undo = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            undo,
            fault_after: &self.fault_after,
            committed: false,
        }))
    }
}

struct MemoryTx<'a> {
    guard: MutexGuard<'a, Table>,
    undo: Table,
    fault_after: &'a Mutex<Option<u32>>,
    committed: bool,
}

impl MemoryTx<'_> {
    // Counts down the injected-fault fuse; fires when it reaches zero.
    fn tick(&mut self) -> Result<(), StorageError> {
        let mut fault = self
            .fault_after
            .lock()
            .map_err(|_| lock_err("fault_after"))?;
        if let Some(remaining) = fault.as_mut() {
            if *remaining == 0 {
                return Err(StorageError::Unavailable(
                    "injected storage fault".to_string(),
                ));
            }
            *remaining -= 1;
        }
        Ok(())
    }
}

impl ContactTx for MemoryTx<'_> {
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StorageError> {
        self.tick()?;

        let mut ids: BTreeSet<ContactId> = BTreeSet::new();
        if let Some(email) = email {
            if let Some(matched) = self.guard.by_email.get(email) {
                ids.extend(matched.iter().copied());
            }
        }
        if let Some(phone) = phone {
            if let Some(matched) = self.guard.by_phone.get(phone) {
                ids.extend(matched.iter().copied());
            }
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.guard.rows.get(id).cloned())
            .collect())
    }

    fn find_by_ids_or_linked_ids(
        &mut self,
        ids: &BTreeSet<ContactId>,
    ) -> Result<Vec<Contact>, StorageError> {
        self.tick()?;

        Ok(self
            .guard
            .rows
            .values()
            .filter(|c| ids.contains(&c.id) || c.linked_id.map_or(false, |lid| ids.contains(&lid)))
            .cloned()
            .collect())
    }

    fn insert_primary(
        &mut self,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Contact, StorageError> {
        self.tick()?;

        let id = self.guard.allocate_id();
        let contact = Contact::primary(id, email, phone, Utc::now());
        Ok(self.guard.store(contact))
    }

    fn insert_secondary(
        &mut self,
        email: Option<String>,
        phone: Option<String>,
        linked_id: ContactId,
    ) -> Result<Contact, StorageError> {
        self.tick()?;

        if !self.guard.rows.contains_key(&linked_id) {
            return Err(StorageError::ContactNotFound(linked_id));
        }

        let id = self.guard.allocate_id();
        let contact = Contact::secondary(id, email, phone, linked_id, Utc::now());
        Ok(self.guard.store(contact))
    }

    fn promote_to_primary(&mut self, id: ContactId) -> Result<Contact, StorageError> {
        self.tick()?;

        let contact = self
            .guard
            .rows
            .get_mut(&id)
            .ok_or(StorageError::ContactNotFound(id))?;
        contact.link_precedence = crate::contact::LinkPrecedence::Primary;
        contact.linked_id = None;
        contact.updated_at = Utc::now();
        Ok(contact.clone())
    }

    fn demote_to_secondary(
        &mut self,
        id: ContactId,
        linked_id: ContactId,
    ) -> Result<Contact, StorageError> {
        self.tick()?;

        if id == linked_id {
            return Err(StorageError::BackendError(
                "cannot link a contact to itself".to_string(),
            ));
        }
        if !self.guard.rows.contains_key(&linked_id) {
            return Err(StorageError::ContactNotFound(linked_id));
        }

        let contact = self
            .guard
            .rows
            .get_mut(&id)
            .ok_or(StorageError::ContactNotFound(id))?;
        contact.link_precedence = crate::contact::LinkPrecedence::Secondary;
        contact.linked_id = Some(linked_id);
        contact.updated_at = Utc::now();
        Ok(contact.clone())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemoryTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            // Rollback: restore the table as begin() found it.
            *self.guard = std::mem::take(&mut self.undo);
        }
    }
}
