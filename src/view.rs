//! Consolidated contact views.
//!
//! The reconciliation engine answers "who is this contact associated with?"
//! with a [`ConsolidatedContact`]: one primary id plus every email, phone and
//! secondary id known across the cluster. [`IdentifyResponse`] is the wire
//! envelope around it.

use serde::{Deserialize, Serialize};

use crate::contact::{Contact, ContactId};

/// The consolidated view of one contact cluster.
///
/// Field order inside `emails` / `phonenumbers` is the scan order: the
/// primary's own values first, then remaining members ascending by id, with
/// duplicates dropped keeping the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedContact {
    /// Id of the cluster's primary contact.
    #[serde(rename = "primaryContactId")]
    pub primary_contact_id: ContactId,

    /// Distinct emails across the cluster, scan-ordered.
    pub emails: Vec<String>,

    /// Distinct phone numbers across the cluster, scan-ordered.
    pub phonenumbers: Vec<String>,

    /// Ids of every non-primary cluster member, ascending.
    #[serde(rename = "secondaryContactIds")]
    pub secondary_contact_ids: Vec<ContactId>,
}

impl ConsolidatedContact {
    /// Projects a cluster onto its consolidated view.
    ///
    /// `members` is the full closure including the primary; order does not
    /// matter, the projection imposes the scan order itself.
    #[must_use]
    pub fn project(primary_id: ContactId, members: &[Contact]) -> Self {
        let mut scan: Vec<&Contact> = members.iter().collect();
        scan.sort_by_key(|c| c.id);
        // Primary first, then ascending by id.
        scan.sort_by_key(|c| c.id != primary_id);

        let mut emails: Vec<String> = Vec::new();
        let mut phonenumbers: Vec<String> = Vec::new();
        let mut secondary_contact_ids: Vec<ContactId> = Vec::new();

        for contact in scan {
            if let Some(email) = contact.email.as_deref() {
                if !emails.iter().any(|e| e == email) {
                    emails.push(email.to_string());
                }
            }
            if let Some(phone) = contact.phone.as_deref() {
                if !phonenumbers.iter().any(|p| p == phone) {
                    phonenumbers.push(phone.to_string());
                }
            }
            if contact.id != primary_id {
                secondary_contact_ids.push(contact.id);
            }
        }

        Self {
            primary_contact_id: primary_id,
            emails,
            phonenumbers,
            secondary_contact_ids,
        }
    }
}

/// Wire envelope for a consolidated view: `{ "contact": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    /// The consolidated cluster view.
    pub contact: ConsolidatedContact,
}

impl From<ConsolidatedContact> for IdentifyResponse {
    fn from(contact: ConsolidatedContact) -> Self {
        Self { contact }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn primary(id: i64, email: Option<&str>, phone: Option<&str>) -> Contact {
        Contact::primary(
            ContactId::new(id),
            email.map(str::to_string),
            phone.map(str::to_string),
            Utc::now(),
        )
    }

    fn secondary(id: i64, email: Option<&str>, phone: Option<&str>, linked: i64) -> Contact {
        Contact::secondary(
            ContactId::new(id),
            email.map(str::to_string),
            phone.map(str::to_string),
            ContactId::new(linked),
            Utc::now(),
        )
    }

    #[test]
    fn singleton_projection() {
        let p = primary(1, Some("a@x.com"), Some("1"));
        let view = ConsolidatedContact::project(p.id, &[p]);
        assert_eq!(view.primary_contact_id, ContactId::new(1));
        assert_eq!(view.emails, vec!["a@x.com"]);
        assert_eq!(view.phonenumbers, vec!["1"]);
        assert!(view.secondary_contact_ids.is_empty());
    }

    #[test]
    fn primary_fields_come_first() {
        // Members deliberately passed out of order; the primary has the
        // highest id but its values still lead.
        let members = vec![
            secondary(1, Some("old@x.com"), Some("111"), 3),
            secondary(2, Some("mid@x.com"), None, 3),
            primary(3, Some("new@x.com"), Some("333")),
        ];
        let view = ConsolidatedContact::project(ContactId::new(3), &members);
        assert_eq!(view.emails, vec!["new@x.com", "old@x.com", "mid@x.com"]);
        assert_eq!(view.phonenumbers, vec!["333", "111"]);
        assert_eq!(
            view.secondary_contact_ids,
            vec![ContactId::new(1), ContactId::new(2)]
        );
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let members = vec![
            primary(1, Some("a@x.com"), Some("1")),
            secondary(2, Some("a@x.com"), Some("2"), 1),
            secondary(3, Some("b@x.com"), Some("1"), 1),
        ];
        let view = ConsolidatedContact::project(ContactId::new(1), &members);
        assert_eq!(view.emails, vec!["a@x.com", "b@x.com"]);
        assert_eq!(view.phonenumbers, vec!["1", "2"]);
    }

    #[test]
    fn absent_fields_are_skipped() {
        let members = vec![primary(1, None, Some("1")), secondary(2, None, None, 1)];
        let view = ConsolidatedContact::project(ContactId::new(1), &members);
        assert!(view.emails.is_empty());
        assert_eq!(view.phonenumbers, vec!["1"]);
        assert_eq!(view.secondary_contact_ids, vec![ContactId::new(2)]);
    }

    #[test]
    fn response_envelope_serializes_to_contract_shape() {
        let view = ConsolidatedContact {
            primary_contact_id: ContactId::new(1),
            emails: vec!["a@x.com".to_string()],
            phonenumbers: vec!["1".to_string()],
            secondary_contact_ids: vec![ContactId::new(2)],
        };
        let resp: IdentifyResponse = view.into();
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["contact"]["primaryContactId"], 1);
        assert_eq!(v["contact"]["emails"][0], "a@x.com");
        assert_eq!(v["contact"]["phonenumbers"][0], "1");
        assert_eq!(v["contact"]["secondaryContactIds"][0], 2);
    }
}
