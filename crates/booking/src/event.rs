//! Booking events and their approval lifecycle.

use core::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use hallbook_core::{DomainError, DomainResult, EventId, TimeRange};

use crate::contact::Contact;

/// Clearance window either side of a booking, in minutes. Two live bookings
/// must keep at least this much clear air between them.
pub const OVERLAP_BUFFER_MINUTES: i64 = 30;

/// Rate applied to a freshly submitted event until an admin picks one.
pub const RATE_DEFAULT: &str = "default";

pub fn overlap_buffer() -> Duration {
    Duration::minutes(OVERLAP_BUFFER_MINUTES)
}

/// Whether an event shows up with its real name on public listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}

impl From<bool> for Visibility {
    fn from(publicly_visible: bool) -> Self {
        if publicly_visible {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

/// Approval lifecycle status.
///
/// `provisional → awaiting documents → approved`, with `cancelled` reachable
/// from any non-terminal state. `cancelled` is terminal; there is no route
/// back out of `approved` to an earlier working state.
///
/// The storage layer persists these as strings; unknown values are rejected
/// at that boundary rather than round-tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "provisional")]
    Provisional,
    #[serde(rename = "awaiting documents")]
    AwaitingDocuments,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Provisional => "provisional",
            EventStatus::AwaitingDocuments => "awaiting documents",
            EventStatus::Approved => "approved",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Live events take part in overlap detection; cancelled ones release
    /// their slot.
    pub fn is_live(self) -> bool {
        self != EventStatus::Cancelled
    }

    pub fn is_terminal(self) -> bool {
        self == EventStatus::Cancelled
    }

    /// The transitions the lifecycle machine defines.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, next),
            (Provisional, AwaitingDocuments)
                | (Provisional, Approved)
                | (Provisional, Cancelled)
                | (AwaitingDocuments, Approved)
                | (AwaitingDocuments, Cancelled)
                | (Approved, Cancelled)
        )
    }
}

impl FromStr for EventStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provisional" => Ok(EventStatus::Provisional),
            "awaiting documents" => Ok(EventStatus::AwaitingDocuments),
            "approved" => Ok(EventStatus::Approved),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown event status: {other:?}"
            ))),
        }
    }
}

impl core::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly lifecycle operations validate the pre-transition status.
///
/// The permissive mode applies a transition regardless of the current
/// status (an admin override is always possible); strict mode enforces the
/// machine in [`EventStatus::can_transition_to`]. Permissive is the default
/// pending a product decision on whether overrides are intended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    Strict,
    #[default]
    Permissive,
}

impl TransitionPolicy {
    pub fn check(self, from: EventStatus, to: EventStatus) -> DomainResult<()> {
        match self {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::Strict => {
                if from.can_transition_to(to) {
                    Ok(())
                } else {
                    Err(DomainError::conflict(format!(
                        "cannot move a {from} event to {to}"
                    )))
                }
            }
        }
    }
}

/// A booking held against the venue diary.
///
/// Created only through the overlap guard; status and rate change only
/// through lifecycle operations, and events are never deleted, only
/// cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub id: EventId,
    pub range: TimeRange,
    pub name: String,
    pub visibility: Visibility,
    pub status: EventStatus,
    pub rate_id: String,
    pub details: String,
    pub contact_email: String,
}

impl BookingEvent {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }
}

/// A public booking request, before it has passed the overlap guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub contact: Contact,
    pub range: TimeRange,
    pub name: String,
    pub visibility: Visibility,
    pub details: String,
}

impl EventDraft {
    pub fn new(
        contact: Contact,
        range: TimeRange,
        name: impl Into<String>,
        visibility: Visibility,
        details: impl Into<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("event name must not be empty"));
        }
        Ok(Self {
            contact,
            range,
            name,
            visibility,
            details: details.into(),
        })
    }
}

/// An admin-submitted series of instances sharing one contact and name.
///
/// The whole series passes the overlap guard as a unit: the first
/// conflicting instance rolls back every instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSeriesDraft {
    pub contact: Contact,
    pub name: String,
    pub details: String,
    pub visibility: Visibility,
    pub ranges: Vec<TimeRange>,
    pub status: EventStatus,
    pub rate_id: String,
}
