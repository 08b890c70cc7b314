//! # idlink - Contact Identity Reconciliation
//!
//! idlink resolves customer identity across email/phone touch-points into
//! consolidated "person" clusters, so a caller can ask "who is this contact
//! associated with?" and get back one canonical identity with every known
//! email, phone number, and subordinate contact record.
//!
//! ## Core Concepts
//!
//! - **Contact**: One stored record carrying an optional email and phone
//! - **Cluster**: All contacts transitively connected by shared email, shared
//!   phone, or `linked_id`
//! - **Primary**: The cluster's canonical representative (oldest member)
//! - **Observation**: The (email, phone) pair submitted for reconciliation
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use idlink::{InMemoryContactStore, Observation, ReconciliationEngine};
//!
//! let engine = ReconciliationEngine::new(Arc::new(InMemoryContactStore::new()));
//!
//! // First sighting creates a primary contact.
//! let obs = Observation::new(Some("doc@example.com"), Some("555-0100")).unwrap();
//! let view = engine.reconcile(&obs).unwrap();
//! assert!(view.secondary_contact_ids.is_empty());
//!
//! // A new phone for a known email appends a linked secondary.
//! let obs = Observation::new(Some("doc@example.com"), Some("555-0199")).unwrap();
//! let view = engine.reconcile(&obs).unwrap();
//! assert_eq!(view.secondary_contact_ids.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod contact;
pub mod error;
pub mod observation;
pub mod view;

// Engine and storage
pub mod engine;
pub mod storage;

// gRPC transport (server mode)
#[cfg(feature = "transport-grpc")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use contact::{Contact, ContactId, LinkPrecedence};
pub use engine::ReconciliationEngine;
pub use error::{IdLinkError, IdLinkResult, TransportError, ValidationError};
pub use observation::Observation;
pub use storage::{ContactStore, ContactTx, InMemoryContactStore, StorageError};
pub use view::{ConsolidatedContact, IdentifyResponse};
