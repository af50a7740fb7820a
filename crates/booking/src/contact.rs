//! Booking contact: an email identity plus a display name.

use serde::{Deserialize, Serialize};

use hallbook_core::{DomainError, DomainResult};

/// The person a booking belongs to, keyed by email address.
///
/// Contacts are created on the first booking request that references an
/// email; the display name is fixed at that first insertion and later
/// requests with the same email never overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub name: String,
}

impl Contact {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> DomainResult<Self> {
        let email = email.into();
        let name = name.into();

        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::validation("contact email address is not valid"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("contact name must not be empty"));
        }

        Ok(Self { email, name })
    }
}
