//! Request/response DTOs and JSON mapping helpers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hallbook_booking::BookingEvent;
use hallbook_invoicing::{Invoice, InvoiceItem};
use hallbook_workflow::{public_name, InvoiceSummary, InvoiceableEvent};

#[derive(Debug, Deserialize)]
pub struct ContactDto {
    pub email_address: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EventDetailsDto {
    pub from: String,
    pub to: String,
    pub name: String,
    #[serde(default)]
    pub details: String,
    pub publicly_visible: bool,
}

/// Public booking submission, policy acknowledgements included.
#[derive(Debug, Deserialize)]
pub struct AddEventRequest {
    pub contact: ContactDto,
    pub event: EventDetailsDto,
    #[serde(default)]
    pub privacy_policy: bool,
    #[serde(default)]
    pub terms_of_hire: bool,
    #[serde(default)]
    pub cleaning_and_damage: bool,
    #[serde(default)]
    pub car_parking: bool,
    #[serde(default)]
    pub adhesives: bool,
}

#[derive(Debug, Deserialize)]
pub struct EventInstanceDto {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct SeriesDetailsDto {
    pub name: String,
    #[serde(default)]
    pub details: String,
    pub publicly_visible: bool,
    pub status: String,
    pub rate: String,
    pub instances: Vec<EventInstanceDto>,
}

/// Admin series submission: one contact, many instances, all or nothing.
#[derive(Debug, Deserialize)]
pub struct AddEventSeriesRequest {
    pub contact: ContactDto,
    pub event: SeriesDetailsDto,
}

#[derive(Debug, Deserialize)]
pub struct SetRateRequest {
    pub rate: String,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceItemRequest {
    #[serde(default)]
    pub event_id: Option<String>,
    pub description: String,
    pub cost: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SendInvoiceRequest {
    pub contact: String,
    pub items: Vec<InvoiceItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct ListEventDto {
    pub id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AdminEventDto {
    pub id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub name: String,
    pub visible: bool,
    pub status: String,
    pub rate: String,
    pub details: String,
    pub contact: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceSummaryDto {
    pub id: String,
    pub reference: String,
    pub status: String,
    pub sent: Option<DateTime<Utc>>,
    pub paid: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceItemDto {
    pub id: String,
    pub event_id: Option<String>,
    pub description: String,
    pub cost: Decimal,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDto {
    pub id: String,
    pub reference: String,
    pub contact: String,
    pub items: Vec<InvoiceItemDto>,
    pub sent: Option<DateTime<Utc>>,
    pub paid: Option<DateTime<Utc>>,
    pub status: String,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct InvoiceableEventDto {
    pub id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub name: String,
    pub status: String,
    pub rate: Decimal,
    pub discount_table: hallbook_invoicing::DiscountTable,
}

/// Public listing view; private event names are redacted.
pub fn list_event(event: &BookingEvent, redact: bool) -> ListEventDto {
    let name = if redact {
        public_name(event).to_string()
    } else {
        event.name.clone()
    };

    ListEventDto {
        id: event.id.to_string(),
        from: event.range.start(),
        to: event.range.end(),
        name,
        status: event.status.as_str().to_string(),
    }
}

pub fn admin_event(event: &BookingEvent, contact_name: String) -> AdminEventDto {
    AdminEventDto {
        id: event.id.to_string(),
        from: event.range.start(),
        to: event.range.end(),
        name: event.name.clone(),
        visible: event.visibility.is_public(),
        status: event.status.as_str().to_string(),
        rate: event.rate_id.clone(),
        details: event.details.clone(),
        contact: contact_name,
        email: event.contact_email.clone(),
    }
}

pub fn invoice_summary(summary: &InvoiceSummary) -> InvoiceSummaryDto {
    InvoiceSummaryDto {
        id: summary.id.to_string(),
        reference: summary.reference.clone(),
        status: summary.status.as_str().to_string(),
        sent: summary.sent,
        paid: summary.paid,
    }
}

fn invoice_item(item: &InvoiceItem) -> InvoiceItemDto {
    InvoiceItemDto {
        id: item.id.to_string(),
        event_id: item.event_id.map(|id| id.to_string()),
        description: item.description.clone(),
        cost: item.cost,
    }
}

pub fn invoice(invoice: &Invoice) -> InvoiceDto {
    InvoiceDto {
        id: invoice.id.to_string(),
        reference: invoice.reference.clone(),
        contact: invoice.contact_email.clone(),
        items: invoice.items.iter().map(invoice_item).collect(),
        sent: invoice.sent,
        paid: invoice.paid,
        status: invoice.status.as_str().to_string(),
        total: invoice.total(),
    }
}

pub fn invoiceable_event(event: &InvoiceableEvent) -> InvoiceableEventDto {
    InvoiceableEventDto {
        id: event.id.to_string(),
        from: event.range.start(),
        to: event.range.end(),
        name: event.name.clone(),
        status: event.status.as_str().to_string(),
        rate: event.hourly_rate,
        discount_table: event.discounts.clone(),
    }
}
