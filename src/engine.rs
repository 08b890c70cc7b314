//! Reconciliation engine.
//!
//! The engine owns the decision logic of identity reconciliation and the
//! orchestration of store reads and writes needed to realize a merge. Every
//! call runs between `begin` and `commit` on the injected [`ContactStore`];
//! any failure drops the transaction, which rolls back, so no partial
//! promotion, demotion or insert can ever persist.
//!
//! The algorithm, per observation:
//!
//! 1. Seed lookup by exact email/phone match.
//! 2. No match: insert a fresh primary, done.
//! 3. Transitive closure of the seed set over shared-field and `linked_id`
//!    connectivity (breadth-first, frontier-only queries).
//! 4. The closure member with the earliest `(created_at, id)` becomes the
//!    primary; promote it if it is not one already.
//! 5. Relink every other member straight to that primary: demoted primaries
//!    and their former secondaries alike, so no chain survives.
//! 6. If the observation carries a previously-unseen email or phone, insert
//!    exactly one secondary row carrying both observed fields.
//! 7. Re-read the closure seeded from the final primary id.
//! 8. Project the cluster onto its consolidated view.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::contact::{Contact, ContactId};
use crate::error::{IdLinkError, IdLinkResult};
use crate::observation::Observation;
use crate::storage::{ContactStore, ContactTx, StorageError};
use crate::view::ConsolidatedContact;

/// Identity reconciliation engine.
///
/// Cheap to clone; backends are shared through `Arc`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use idlink::{InMemoryContactStore, Observation, ReconciliationEngine};
///
/// let engine = ReconciliationEngine::new(Arc::new(InMemoryContactStore::new()));
/// let obs = Observation::new(Some("a@x.com"), Some("1")).unwrap();
/// let view = engine.reconcile(&obs).unwrap();
/// assert!(view.secondary_contact_ids.is_empty());
/// ```
#[derive(Clone)]
pub struct ReconciliationEngine {
    contacts: Arc<dyn ContactStore>,
}

impl ReconciliationEngine {
    /// Creates a new engine over the given contact store.
    #[must_use]
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }

    /// Access the underlying contact store.
    #[must_use]
    pub fn contact_store(&self) -> &Arc<dyn ContactStore> {
        &self.contacts
    }

    /// Reconciles one observation into its contact cluster.
    ///
    /// Runs the full merge algorithm inside a single store transaction and
    /// returns the consolidated view of the resulting cluster.
    ///
    /// # Errors
    ///
    /// [`IdLinkError::Reconciliation`] if any store operation fails; the
    /// transaction is rolled back and no mutation persists.
    pub fn reconcile(&self, observation: &Observation) -> IdLinkResult<ConsolidatedContact> {
        let mut tx = self.contacts.begin()?;
        let view = reconcile_in_tx(tx.as_mut(), observation)?;
        tx.commit()?;
        Ok(view)
    }
}

fn reconcile_in_tx(
    tx: &mut dyn ContactTx,
    observation: &Observation,
) -> IdLinkResult<ConsolidatedContact> {
    // Step 1: seed lookup.
    let seeds = tx.find_by_email_or_phone(observation.email(), observation.phone())?;

    // Step 2: first-seen observation becomes a singleton primary cluster.
    if seeds.is_empty() {
        let (email, phone) = observation.fields();
        let created = tx.insert_primary(email, phone)?;
        let id = created.id;
        return Ok(ConsolidatedContact::project(id, &[created]));
    }

    // Step 3: expand the seed set to the full cluster.
    let members = closure(tx, seeds.iter().map(|c| c.id).collect())?;

    // Step 4: the oldest member is the primary.
    let primary = select_primary(&members)
        .ok_or_else(|| IdLinkError::internal("closure of a non-empty seed set is empty"))?;
    let primary_id = primary.id;
    if !primary.is_primary() {
        tx.promote_to_primary(primary_id)?;
    }

    // Step 5: every other member links straight to the surviving primary.
    // This relabels demoted primaries AND relinks their former secondaries,
    // so no chain survives a merge.
    for member in &members {
        if member.id != primary_id && member.linked_id != Some(primary_id) {
            tx.demote_to_secondary(member.id, primary_id)?;
        }
    }

    // Step 6: a novel email or phone appends one secondary row carrying both
    // observed fields. Exact matches never produce a duplicate insert.
    let email_known = observation
        .email()
        .map_or(true, |email| members.iter().any(|c| c.has_email(email)));
    let phone_known = observation
        .phone()
        .map_or(true, |phone| members.iter().any(|c| c.has_phone(phone)));
    if !email_known || !phone_known {
        let (email, phone) = observation.fields();
        tx.insert_secondary(email, phone, primary_id)?;
    }

    // Step 7: re-read from the final primary so the view reflects every
    // relabeling and the freshly inserted row.
    let cluster = closure(tx, BTreeSet::from([primary_id]))?;

    // Step 8: projection.
    Ok(ConsolidatedContact::project(primary_id, &cluster))
}

/// Computes the transitive closure of `seed_ids` over shared-field and
/// `linked_id` connectivity.
///
/// Breadth-first expansion: each round queries only the unvisited frontier,
/// so the visited set grows monotonically and is bounded by the total contact
/// count; termination is immediate once a round discovers nothing new. Both
/// edge directions are covered because the store matches a frontier id
/// against `id` and `linked_id` alike, and a fetched row contributes its own
/// carried `linked_id` back into the frontier.
fn closure(
    tx: &mut dyn ContactTx,
    seed_ids: BTreeSet<ContactId>,
) -> Result<Vec<Contact>, StorageError> {
    let mut visited = seed_ids.clone();
    let mut frontier = seed_ids;
    let mut members: BTreeMap<ContactId, Contact> = BTreeMap::new();

    while !frontier.is_empty() {
        let fetched = tx.find_by_ids_or_linked_ids(&frontier)?;
        let mut next = BTreeSet::new();
        for contact in fetched {
            if visited.insert(contact.id) {
                next.insert(contact.id);
            }
            if let Some(linked) = contact.linked_id {
                if visited.insert(linked) {
                    next.insert(linked);
                }
            }
            members.insert(contact.id, contact);
        }
        frontier = next;
    }

    Ok(members.into_values().collect())
}

/// Picks the cluster member with the earliest `(created_at, id)`.
fn select_primary(members: &[Contact]) -> Option<&Contact> {
    members.iter().min_by_key(|c| c.seniority())
}
