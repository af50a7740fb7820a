//! `hallbook-workflow` — workflow orchestration over storage and
//! collaborator ports.
//!
//! The ports (storage, document rendering, email, content) live here with
//! their consumer; `hallbook-infra` provides the adapters.

pub mod calendar;
pub mod collaborators;
pub mod orchestrator;
pub mod store;

pub use calendar::{Calendar, CalendarEvent};
pub use collaborators::{
    substitute, Attachment, CollaboratorError, ContentProvider, DocumentRenderer, EmailContent,
    EmailSender, PageContent, TemplateVars,
};
pub use orchestrator::{
    public_name, Orchestrator, WorkflowError, EMAIL_BOOKING_CONFIRMED, EMAIL_INVOICE,
    EMAIL_REQUEST_DOCUMENTS, PAGE_CLEANING_POLICY, PAGE_TERMS_OF_HIRE, PRIVATE_EVENT_PLACEHOLDER,
};
pub use store::{BookingStore, InvoiceStore, InvoiceSummary, InvoiceableEvent, StoreError};
