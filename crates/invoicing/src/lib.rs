//! `hallbook-invoicing` — invoices, line items, rates and reference codes.

pub mod invoice;
pub mod rate;
pub mod reference;

pub use invoice::{Invoice, InvoiceItem, InvoiceStatus, NewInvoiceItem};
pub use rate::{DiscountBand, DiscountKind, DiscountTable, Rate};
pub use reference::{generate_reference, REFERENCE_ALPHABET, REFERENCE_LEN};
