//! Workflow orchestration: document requests, approvals and invoice
//! dispatch.
//!
//! Each workflow is a sequence of independently fallible steps with no
//! compensation. The status write is always the last step, so a failure
//! upstream leaves the record in its prior state for a clean re-run; what
//! earlier steps already did (documents rendered, emails sent) stands.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use hallbook_booking::{
    document_deadline, BookingEvent, DocumentChecklist, EventStatus, TransitionPolicy,
};
use hallbook_core::{DomainError, EventId, InvoiceId};
use hallbook_invoicing::{Invoice, NewInvoiceItem};

use crate::calendar::{Calendar, CalendarEvent};
use crate::collaborators::{
    Attachment, CollaboratorError, ContentProvider, DocumentRenderer, EmailSender, TemplateVars,
};
use crate::store::{BookingStore, InvoiceStore, InvoiceableEvent, StoreError};

/// Name shown for non-public events on public feeds.
pub const PRIVATE_EVENT_PLACEHOLDER: &str = "Private Event";

/// Managed template keys.
pub const EMAIL_REQUEST_DOCUMENTS: &str = "request-for-additional-documents";
pub const EMAIL_BOOKING_CONFIRMED: &str = "booking-confirmed";
pub const EMAIL_INVOICE: &str = "booking-invoice";
pub const PAGE_TERMS_OF_HIRE: &str = "terms-of-hire";
pub const PAGE_CLEANING_POLICY: &str = "cleaning-and-damage-policy";

/// Date format used in outbound email, e.g. `Sat Mar 14 2026`.
fn email_date(at: DateTime<Utc>) -> String {
    at.format("%a %b %-d %Y").to_string()
}

/// Failure anywhere in a workflow sequence.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Coordinates storage and collaborators for the three booking workflows
/// and the calendar feeds.
pub struct Orchestrator {
    bookings: Arc<dyn BookingStore>,
    invoices: Arc<dyn InvoiceStore>,
    renderer: Arc<dyn DocumentRenderer>,
    email: Arc<dyn EmailSender>,
    content: Arc<dyn ContentProvider>,
    policy: TransitionPolicy,
}

impl Orchestrator {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        invoices: Arc<dyn InvoiceStore>,
        renderer: Arc<dyn DocumentRenderer>,
        email: Arc<dyn EmailSender>,
        content: Arc<dyn ContentProvider>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            bookings,
            invoices,
            renderer,
            email,
            content,
            policy,
        }
    }

    fn check_transition(&self, event: &BookingEvent, to: EventStatus) -> Result<(), WorkflowError> {
        self.policy.check(event.status, to)?;
        Ok(())
    }

    /// Ask the event's contact for supporting documents, then park the
    /// event as awaiting them.
    ///
    /// Steps: build the checklist, render the templated email with a
    /// deadline of fourteen days before the event (clamped to `now`),
    /// send it, and only then persist the new status.
    pub async fn request_documents(
        &self,
        event_id: EventId,
        checklist: DocumentChecklist,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let event = self.bookings.get_event(event_id).await?;
        self.check_transition(&event, EventStatus::AwaitingDocuments)?;

        let documents = checklist.requested();
        let deadline = document_deadline(event.range.start(), now);

        let mut vars = TemplateVars::new();
        vars.insert("event_name".to_string(), event.name.clone());
        vars.insert("date".to_string(), email_date(event.range.start()));
        vars.insert("deadline".to_string(), email_date(deadline));
        vars.insert(
            "documents".to_string(),
            documents
                .iter()
                .map(|d| format!("- {d}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        let email = self
            .content
            .email_with_vars(EMAIL_REQUEST_DOCUMENTS, &vars)
            .await?;

        self.email
            .send(&event.contact_email, &email.subject, &email.body, vec![])
            .await?;

        self.bookings
            .set_event_status(event_id, EventStatus::AwaitingDocuments)
            .await?;

        info!(event = %event_id, documents = documents.len(), "requested documents");
        Ok(())
    }

    /// Approve a booking: policy documents, confirmation email with a
    /// calendar invite, then the status write.
    pub async fn approve(&self, event_id: EventId, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        let event = self.bookings.get_event(event_id).await?;
        self.check_transition(&event, EventStatus::Approved)?;

        let terms_of_hire = self.renderer.render_page(PAGE_TERMS_OF_HIRE).await?;
        let cleaning_policy = self.renderer.render_page(PAGE_CLEANING_POLICY).await?;

        let mut vars = TemplateVars::new();
        vars.insert("event_name".to_string(), event.name.clone());
        vars.insert("date".to_string(), email_date(event.range.start()));

        let email = self
            .content
            .email_with_vars(EMAIL_BOOKING_CONFIRMED, &vars)
            .await?;

        let invite = Calendar::new()
            .with_event(CalendarEvent {
                uid: event.id.to_string(),
                start: event.range.start(),
                end: event.range.end(),
                summary: event.name.clone(),
            })
            .serialize(now);

        let extension = self.renderer.document_extension();
        let mime_type = self.renderer.document_mime_type();
        let attachments = vec![
            Attachment {
                filename: format!("{PAGE_TERMS_OF_HIRE}.{extension}"),
                mime_type: mime_type.to_string(),
                content: terms_of_hire,
            },
            Attachment {
                filename: format!("{PAGE_CLEANING_POLICY}.{extension}"),
                mime_type: mime_type.to_string(),
                content: cleaning_policy,
            },
            Attachment {
                filename: "calendar.ics".to_string(),
                mime_type: crate::calendar::CALENDAR_MIME_TYPE.to_string(),
                content: invite.into_bytes(),
            },
        ];

        self.email
            .send(&event.contact_email, &email.subject, &email.body, attachments)
            .await?;

        self.bookings
            .set_event_status(event_id, EventStatus::Approved)
            .await?;

        info!(event = %event_id, "approved booking");
        Ok(())
    }

    /// Cancel a booking. No side-effect sequence; the slot is released as
    /// soon as the status lands.
    pub async fn cancel(&self, event_id: EventId) -> Result<(), WorkflowError> {
        if self.policy == TransitionPolicy::Strict {
            let event = self.bookings.get_event(event_id).await?;
            self.check_transition(&event, EventStatus::Cancelled)?;
        }

        self.bookings
            .set_event_status(event_id, EventStatus::Cancelled)
            .await?;

        info!(event = %event_id, "cancelled booking");
        Ok(())
    }

    /// Point an event at a different hire rate.
    pub async fn set_rate(&self, event_id: EventId, rate_id: &str) -> Result<(), WorkflowError> {
        self.bookings.set_event_rate(event_id, rate_id).await?;
        Ok(())
    }

    /// Raise an invoice and dispatch it: create the row, render the
    /// document, fetch the covering email, send, mark sent.
    ///
    /// If the send fails the invoice stays created-but-unsent;
    /// [`Orchestrator::redispatch_invoice`] retries delivery for the same
    /// row rather than raising a second invoice.
    pub async fn send_invoice(
        &self,
        contact_email: &str,
        items: Vec<NewInvoiceItem>,
    ) -> Result<Invoice, WorkflowError> {
        let invoice = self.invoices.create_invoice(contact_email, items).await?;

        if let Err(err) = self.dispatch(&invoice).await {
            warn!(
                invoice = %invoice.id,
                reference = %invoice.reference,
                error = %err,
                "invoice raised but not dispatched"
            );
            return Err(err);
        }

        // Re-read so the returned snapshot carries the sent timestamp.
        Ok(self.invoices.get_invoice(invoice.id).await?)
    }

    /// Re-deliver an invoice that was raised but never marked sent (or
    /// whose delivery needs repeating). Renders and sends fresh; does not
    /// create a new invoice row.
    pub async fn redispatch_invoice(&self, invoice_id: InvoiceId) -> Result<(), WorkflowError> {
        let invoice = self.invoices.get_invoice(invoice_id).await?;
        self.dispatch(&invoice).await
    }

    async fn dispatch(&self, invoice: &Invoice) -> Result<(), WorkflowError> {
        let document = self.renderer.render_invoice(invoice).await?;
        let email = self.content.email(EMAIL_INVOICE).await?;

        let attachment = Attachment {
            filename: format!("invoice.{}", self.renderer.document_extension()),
            mime_type: self.renderer.document_mime_type().to_string(),
            content: document,
        };

        self.email
            .send(
                &invoice.contact_email,
                &email.subject,
                &email.body,
                vec![attachment],
            )
            .await?;

        self.invoices.mark_invoice_sent(invoice.id).await?;

        info!(invoice = %invoice.id, reference = %invoice.reference, "dispatched invoice");
        Ok(())
    }

    /// Public iCalendar feed: one `VEVENT` per live event, with non-public
    /// event names redacted to a fixed placeholder.
    pub async fn public_calendar(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<String, WorkflowError> {
        let events = self.bookings.list_events(from, to).await?;
        Ok(build_calendar(&events, true).serialize(now))
    }

    /// Admin feed: as the public one, but with real names throughout.
    pub async fn admin_calendar(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<String, WorkflowError> {
        let events = self.bookings.list_events(from, to).await?;
        Ok(build_calendar(&events, false).serialize(now))
    }

    /// Events joined with their rates and grouped by owning contact, the
    /// shape batch-invoicing screens consume.
    pub async fn events_for_invoicing(
        &self,
        ids: &[EventId],
    ) -> Result<BTreeMap<String, Vec<InvoiceableEvent>>, WorkflowError> {
        let events = self.invoices.events_for_invoicing(ids).await?;
        Ok(group_by_contact(events))
    }
}

/// Redact an event's public-facing name when it is not publicly visible.
pub fn public_name(event: &BookingEvent) -> &str {
    if event.visibility.is_public() {
        &event.name
    } else {
        PRIVATE_EVENT_PLACEHOLDER
    }
}

fn build_calendar(events: &[BookingEvent], redact: bool) -> Calendar {
    let mut calendar = Calendar::new();
    for event in events.iter().filter(|e| e.is_live()) {
        let summary = if redact {
            public_name(event).to_string()
        } else {
            event.name.clone()
        };
        calendar.add_event(CalendarEvent {
            uid: event.id.to_string(),
            start: event.range.start(),
            end: event.range.end(),
            summary,
        });
    }
    calendar
}

fn group_by_contact(events: Vec<InvoiceableEvent>) -> BTreeMap<String, Vec<InvoiceableEvent>> {
    let mut grouped: BTreeMap<String, Vec<InvoiceableEvent>> = BTreeMap::new();
    for event in events {
        grouped
            .entry(event.contact_email.clone())
            .or_default()
            .push(event);
    }
    grouped
}
