//! Contact records and identity management.
//!
//! The contact record is the only entity in the system. A cluster of contacts
//! connected through shared emails, shared phone numbers, or `linked_id`
//! references represents one person; exactly one member of each cluster is
//! the [`LinkPrecedence::Primary`] record and every other member links to it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique, store-assigned contact identifier.
///
/// Ids are assigned monotonically at insert and never change, so a lower id
/// always means an earlier insert. This makes id order the deterministic
/// tie-break when two contacts share a `created_at` timestamp.
///
/// # Examples
///
/// ```
/// use idlink::ContactId;
///
/// let id = ContactId::new(7);
/// assert_eq!(id.value(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(i64);

impl ContactId {
    /// Creates a contact id from a raw value.
    ///
    /// Stores are the only producers of new ids; this constructor exists for
    /// backends and tests that need to materialize known ids.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying id value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ContactId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ContactId> for i64 {
    fn from(id: ContactId) -> Self {
        id.0
    }
}

/// Role of a contact within its cluster.
///
/// Serialized lowercase (`"primary"` / `"secondary"`), matching the persisted
/// schema constraint on the `linkPrecedence` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    /// The canonical representative of a cluster (its oldest member).
    Primary,
    /// Any other cluster member; always carries `linked_id = primary.id`.
    Secondary,
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// One stored contact record.
///
/// Contacts are created by reconciliation (never by callers directly) and are
/// never deleted: a merge only relabels `link_precedence` / `linked_id` or
/// appends a new record. `created_at` is immutable and is the primary-selection
/// key; `updated_at` is stamped on every mutation.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use idlink::{Contact, ContactId};
///
/// let c = Contact::primary(ContactId::new(1), Some("a@x.com".into()), None, Utc::now());
/// assert!(c.is_primary());
/// assert!(c.linked_id.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Store-assigned identifier; immutable.
    pub id: ContactId,

    /// Normalized email (trimmed, lowercased), if observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Trimmed phone number, if observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Role of this contact within its cluster.
    pub link_precedence: LinkPrecedence,

    /// The cluster primary's id; present exactly when this contact is secondary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_id: Option<ContactId>,

    /// When the record was created. Immutable; the primary-selection key.
    pub created_at: DateTime<Utc>,

    /// When the record was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Creates a primary contact record.
    #[must_use]
    pub fn primary(
        id: ContactId,
        email: Option<String>,
        phone: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            phone,
            link_precedence: LinkPrecedence::Primary,
            linked_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Creates a secondary contact record linked to `linked_id`.
    #[must_use]
    pub fn secondary(
        id: ContactId,
        email: Option<String>,
        phone: Option<String>,
        linked_id: ContactId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            phone,
            link_precedence: LinkPrecedence::Secondary,
            linked_id: Some(linked_id),
            created_at,
            updated_at: created_at,
        }
    }

    /// Returns true if this contact is its cluster's primary.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    /// Returns true if this contact carries exactly the given email.
    #[must_use]
    pub fn has_email(&self, email: &str) -> bool {
        self.email.as_deref() == Some(email)
    }

    /// Returns true if this contact carries exactly the given phone number.
    #[must_use]
    pub fn has_phone(&self, phone: &str) -> bool {
        self.phone.as_deref() == Some(phone)
    }

    /// Ordering key for primary selection: earliest `created_at`, ties broken
    /// by lowest id.
    #[must_use]
    pub fn seniority(&self) -> (DateTime<Utc>, ContactId) {
        (self.created_at, self.id)
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Contact {}

impl std::hash::Hash for Contact {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_id_ordering_follows_value() {
        assert!(ContactId::new(1) < ContactId::new(2));
        assert_eq!(ContactId::from(5), ContactId::new(5));
        assert_eq!(i64::from(ContactId::new(5)), 5);
    }

    #[test]
    fn contact_id_display() {
        assert_eq!(format!("{}", ContactId::new(42)), "42");
    }

    #[test]
    fn link_precedence_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_value(LinkPrecedence::Primary).unwrap(),
            serde_json::Value::String("primary".to_string())
        );
        let parsed: LinkPrecedence = serde_json::from_str("\"secondary\"").unwrap();
        assert_eq!(parsed, LinkPrecedence::Secondary);

        let unknown: Result<LinkPrecedence, _> = serde_json::from_str("\"tertiary\"");
        assert!(unknown.is_err());
    }

    #[test]
    fn primary_constructor_has_no_link() {
        let c = Contact::primary(ContactId::new(1), Some("a@x.com".into()), None, Utc::now());
        assert!(c.is_primary());
        assert!(c.linked_id.is_none());
        assert_eq!(c.created_at, c.updated_at);
    }

    #[test]
    fn secondary_constructor_links_to_primary() {
        let c = Contact::secondary(
            ContactId::new(2),
            None,
            Some("123".into()),
            ContactId::new(1),
            Utc::now(),
        );
        assert!(!c.is_primary());
        assert_eq!(c.linked_id, Some(ContactId::new(1)));
    }

    #[test]
    fn field_matchers_use_exact_equality() {
        let c = Contact::primary(
            ContactId::new(1),
            Some("a@x.com".into()),
            Some("123".into()),
            Utc::now(),
        );
        assert!(c.has_email("a@x.com"));
        assert!(!c.has_email("A@x.com"));
        assert!(c.has_phone("123"));
        assert!(!c.has_phone("1234"));

        let empty = Contact::primary(ContactId::new(2), None, None, Utc::now());
        assert!(!empty.has_email("a@x.com"));
        assert!(!empty.has_phone("123"));
    }

    #[test]
    fn seniority_breaks_created_at_ties_by_id() {
        let now = Utc::now();
        let a = Contact::primary(ContactId::new(4), None, Some("1".into()), now);
        let b = Contact::primary(ContactId::new(9), None, Some("2".into()), now);
        assert!(a.seniority() < b.seniority());
    }

    #[test]
    fn equality_is_by_id() {
        let now = Utc::now();
        let a = Contact::primary(ContactId::new(1), Some("a@x.com".into()), None, now);
        let mut b = a.clone();
        b.email = Some("b@x.com".into());
        assert_eq!(a, b);
    }

    #[test]
    fn contact_serde_uses_camel_case_columns() {
        let c = Contact::secondary(
            ContactId::new(3),
            Some("a@x.com".into()),
            None,
            ContactId::new(1),
            Utc::now(),
        );
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["linkPrecedence"], "secondary");
        assert_eq!(v["linkedId"], 1);
        assert!(v.get("createdAt").is_some());
        assert!(v.get("updatedAt").is_some());
        // Absent phone is omitted entirely.
        assert!(v.get("phone").is_none());

        let back: Contact = serde_json::from_value(v).unwrap();
        assert_eq!(back.id, c.id);
        assert_eq!(back.linked_id, c.linked_id);
    }
}
