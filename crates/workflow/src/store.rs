//! Storage ports consumed by the workflow layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use hallbook_booking::{BookingEvent, EventDraft, EventSeriesDraft, EventStatus};
use hallbook_core::{EventId, InvoiceId, TimeRange};
use hallbook_invoicing::{DiscountTable, Invoice, InvoiceStatus, NewInvoiceItem, Rate};

/// Storage operation error.
///
/// `Conflict` and `NotFound` are distinguished from generic storage
/// failures so the transport boundary can answer 409 and 404 without
/// string-matching.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An existing live booking occupies the proposed window (buffer
    /// included). User-correctable; retry with different dates.
    #[error("a booking exists for these dates")]
    Conflict,

    /// The referenced event, invoice or rate does not exist.
    #[error("not found")]
    NotFound,

    /// I/O, transaction or constraint failure. Not retried automatically.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// One event joined with its billing rate, ready for invoice drafting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceableEvent {
    pub id: EventId,
    pub range: TimeRange,
    pub name: String,
    pub status: EventStatus,
    pub contact_email: String,
    pub hourly_rate: Decimal,
    pub discounts: DiscountTable,
}

/// Slim view of an invoice as shown against an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: InvoiceId,
    pub reference: String,
    pub status: InvoiceStatus,
    pub sent: Option<DateTime<Utc>>,
    pub paid: Option<DateTime<Utc>>,
}

/// Booking-side storage: the overlap guard, listings and lifecycle writes.
///
/// `submit_event` and `submit_event_series` run as single atomic units of
/// work and own the contact upsert; implementations must serialize
/// concurrent submissions so no two can both pass the overlap check for
/// intersecting windows.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Upsert the contact and insert a provisional event, provided its
    /// buffered window is clear of every live booking.
    async fn submit_event(&self, draft: &EventDraft) -> Result<EventId, StoreError>;

    /// Same guard applied across a whole series inside one transaction;
    /// the first conflicting instance rolls back the batch.
    async fn submit_event_series(
        &self,
        draft: &EventSeriesDraft,
    ) -> Result<Vec<EventId>, StoreError>;

    /// Events whose window touches `[from, to]`, in diary order.
    async fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError>;

    /// As `list_events`, restricted to one contact's bookings.
    async fn list_events_for_contact(
        &self,
        contact_email: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError>;

    async fn get_event(&self, id: EventId) -> Result<BookingEvent, StoreError>;

    /// Display name of the contact owning `email`.
    async fn get_contact_name(&self, email: &str) -> Result<String, StoreError>;

    /// Bare status write; transition checking and side effects are the
    /// orchestrator's business.
    async fn set_event_status(&self, id: EventId, status: EventStatus) -> Result<(), StoreError>;

    async fn set_event_rate(&self, id: EventId, rate_id: &str) -> Result<(), StoreError>;
}

/// Invoice-side storage: the ledger plus rate reference data.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Create the invoice and its items atomically. The generated
    /// reference is unique; implementations regenerate on collision.
    async fn create_invoice(
        &self,
        contact_email: &str,
        items: Vec<NewInvoiceItem>,
    ) -> Result<Invoice, StoreError>;

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError>;

    async fn mark_invoice_sent(&self, id: InvoiceId) -> Result<(), StoreError>;

    /// Sets the paid timestamp and flips status to paid in one write.
    async fn mark_invoice_paid(&self, id: InvoiceId) -> Result<(), StoreError>;

    /// Invoices with at least one item referencing the event.
    async fn invoices_for_event(&self, id: EventId) -> Result<Vec<InvoiceSummary>, StoreError>;

    /// The given events joined with their rates, for batch invoicing.
    async fn events_for_invoicing(
        &self,
        ids: &[EventId],
    ) -> Result<Vec<InvoiceableEvent>, StoreError>;

    async fn list_rates(&self) -> Result<Vec<Rate>, StoreError>;
}

#[async_trait]
impl<S> BookingStore for Arc<S>
where
    S: BookingStore + ?Sized,
{
    async fn submit_event(&self, draft: &EventDraft) -> Result<EventId, StoreError> {
        (**self).submit_event(draft).await
    }

    async fn submit_event_series(
        &self,
        draft: &EventSeriesDraft,
    ) -> Result<Vec<EventId>, StoreError> {
        (**self).submit_event_series(draft).await
    }

    async fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError> {
        (**self).list_events(from, to).await
    }

    async fn list_events_for_contact(
        &self,
        contact_email: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError> {
        (**self).list_events_for_contact(contact_email, from, to).await
    }

    async fn get_event(&self, id: EventId) -> Result<BookingEvent, StoreError> {
        (**self).get_event(id).await
    }

    async fn get_contact_name(&self, email: &str) -> Result<String, StoreError> {
        (**self).get_contact_name(email).await
    }

    async fn set_event_status(&self, id: EventId, status: EventStatus) -> Result<(), StoreError> {
        (**self).set_event_status(id, status).await
    }

    async fn set_event_rate(&self, id: EventId, rate_id: &str) -> Result<(), StoreError> {
        (**self).set_event_rate(id, rate_id).await
    }
}

#[async_trait]
impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    async fn create_invoice(
        &self,
        contact_email: &str,
        items: Vec<NewInvoiceItem>,
    ) -> Result<Invoice, StoreError> {
        (**self).create_invoice(contact_email, items).await
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        (**self).get_invoice(id).await
    }

    async fn mark_invoice_sent(&self, id: InvoiceId) -> Result<(), StoreError> {
        (**self).mark_invoice_sent(id).await
    }

    async fn mark_invoice_paid(&self, id: InvoiceId) -> Result<(), StoreError> {
        (**self).mark_invoice_paid(id).await
    }

    async fn invoices_for_event(&self, id: EventId) -> Result<Vec<InvoiceSummary>, StoreError> {
        (**self).invoices_for_event(id).await
    }

    async fn events_for_invoicing(
        &self,
        ids: &[EventId],
    ) -> Result<Vec<InvoiceableEvent>, StoreError> {
        (**self).events_for_invoicing(ids).await
    }

    async fn list_rates(&self) -> Result<Vec<Rate>, StoreError> {
        (**self).list_rates().await
    }
}
