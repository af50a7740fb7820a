//! `hallbook-booking` — booking events, contacts and the approval lifecycle.

pub mod contact;
pub mod documents;
pub mod event;

pub use contact::Contact;
pub use documents::{document_deadline, DocumentChecklist, DOCUMENT_LEAD_TIME_DAYS};
pub use event::{
    overlap_buffer, BookingEvent, EventDraft, EventSeriesDraft, EventStatus, TransitionPolicy,
    Visibility, OVERLAP_BUFFER_MINUTES, RATE_DEFAULT,
};
