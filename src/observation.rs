//! Identity observations.
//!
//! An observation is the (email, phone) pair submitted for reconciliation.
//! Normalization and validation happen here, at construction, so the engine
//! and stores only ever see well-formed values: emails trimmed and lowercased,
//! phones trimmed, empty strings collapsed to absent, and the both-empty case
//! rejected before any store access.

use crate::error::ValidationError;

/// Maximum accepted email length (persisted column is `VARCHAR(255)`).
pub const MAX_EMAIL_LEN: usize = 255;

/// Maximum accepted phone length (persisted column is `VARCHAR(20)`).
pub const MAX_PHONE_LEN: usize = 20;

fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A normalized (email, phone) observation.
///
/// Construction via [`Observation::new`] is the only way to obtain one, so a
/// held `Observation` is always valid: at least one field present, both
/// normalized and within length bounds.
///
/// # Examples
///
/// ```
/// use idlink::Observation;
///
/// let obs = Observation::new(Some("  A@X.com "), None).unwrap();
/// assert_eq!(obs.email(), Some("a@x.com"));
/// assert_eq!(obs.phone(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    email: Option<String>,
    phone: Option<String>,
}

impl Observation {
    /// Builds an observation from raw input fields.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyObservation`] if both fields are absent or
    ///   empty after trimming.
    /// - [`ValidationError::FieldTooLong`] if a normalized field exceeds its
    ///   persisted column width.
    pub fn new(email: Option<&str>, phone: Option<&str>) -> Result<Self, ValidationError> {
        let email = email.and_then(normalize_email);
        let phone = phone.and_then(normalize_phone);

        if email.is_none() && phone.is_none() {
            return Err(ValidationError::EmptyObservation);
        }

        if let Some(e) = email.as_deref() {
            if e.len() > MAX_EMAIL_LEN {
                return Err(ValidationError::FieldTooLong {
                    field: "email".to_string(),
                    max_length: MAX_EMAIL_LEN,
                });
            }
        }
        if let Some(p) = phone.as_deref() {
            if p.len() > MAX_PHONE_LEN {
                return Err(ValidationError::FieldTooLong {
                    field: "phonenumber".to_string(),
                    max_length: MAX_PHONE_LEN,
                });
            }
        }

        Ok(Self { email, phone })
    }

    /// The normalized email, if present.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The trimmed phone number, if present.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Clones out the owned field pair, for handing to a store insert.
    #[must_use]
    pub fn fields(&self) -> (Option<String>, Option<String>) {
        (self.email.clone(), self.phone.clone())
    }
}
