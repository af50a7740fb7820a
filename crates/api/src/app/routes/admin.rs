//! Admin routes: series submission, lifecycle actions, rates and invoices.
//!
//! Authentication sits in front of these in the deployment (reverse proxy
//! / identity-aware gateway); the handlers themselves are auth-agnostic.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use hallbook_booking::{Contact, DocumentChecklist, EventSeriesDraft, EventStatus, Visibility};
use hallbook_core::{EventId, InvoiceId, TimeRange};
use hallbook_invoicing::NewInvoiceItem;
use hallbook_workflow::calendar::CALENDAR_MIME_TYPE;

use crate::app::routes::{resolve_window, DateRangeParams};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/events", get(list_events).post(add_event_series))
        .route("/events/calendar.ics", get(calendar_feed))
        .route("/events/:id", get(get_event))
        .route("/events/:id/request-documents", post(request_documents))
        .route("/events/:id/approve", post(approve))
        .route("/events/:id/cancel", post(cancel))
        .route("/events/:id/rate", post(set_rate))
        .route("/rates", get(list_rates))
        .route("/send-invoice", post(send_invoice))
        .route("/invoices/for-events", get(invoices_for_events))
        .route("/invoices/:id", get(get_invoice))
        .route("/invoices/:id/paid", post(mark_invoice_paid))
        .route("/invoices/:id/send", post(redispatch_invoice))
}

fn parse_event_id(raw: &str) -> Result<EventId, axum::response::Response> {
    raw.parse::<EventId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid event id"))
}

fn parse_invoice_id(raw: &str) -> Result<InvoiceId, axum::response::Response> {
    raw.parse::<InvoiceId>().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid invoice id")
    })
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, axum::response::Response> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_timestamp",
                format!("{field} must be an RFC 3339 timestamp"),
            )
        })
}

pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<DateRangeParams>,
) -> axum::response::Response {
    let (from, to) = match resolve_window(&params, Utc::now()) {
        Ok(window) => window,
        Err(response) => return response,
    };

    let events = match services.bookings.list_events(from, to).await {
        Ok(events) => events,
        Err(err) => return errors::store_error_to_response(err),
    };

    let mut out = Vec::with_capacity(events.len());
    for event in &events {
        let contact_name = match services.bookings.get_contact_name(&event.contact_email).await {
            Ok(name) => name,
            Err(err) => return errors::store_error_to_response(err),
        };
        out.push(dto::admin_event(event, contact_name));
    }

    (StatusCode::OK, Json(serde_json::json!({ "events": out }))).into_response()
}

pub async fn add_event_series(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AddEventSeriesRequest>,
) -> axum::response::Response {
    let contact = match Contact::new(&body.contact.email_address, &body.contact.name) {
        Ok(contact) => contact,
        Err(err) => return errors::domain_error_to_response(err),
    };

    let status: EventStatus = match body.event.status.parse() {
        Ok(status) => status,
        Err(err) => return errors::domain_error_to_response(err),
    };

    let mut ranges = Vec::with_capacity(body.event.instances.len());
    for instance in &body.event.instances {
        let from = match parse_timestamp(&instance.from, "from") {
            Ok(from) => from,
            Err(response) => return response,
        };
        let to = match parse_timestamp(&instance.to, "to") {
            Ok(to) => to,
            Err(response) => return response,
        };
        match TimeRange::new(from, to) {
            Ok(range) => ranges.push(range),
            Err(err) => return errors::domain_error_to_response(err),
        }
    }

    let draft = EventSeriesDraft {
        contact,
        name: body.event.name,
        details: body.event.details,
        visibility: Visibility::from(body.event.publicly_visible),
        ranges,
        status,
        rate_id: body.event.rate,
    };

    match services.bookings.submit_event_series(&draft).await {
        Ok(ids) => {
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            (StatusCode::OK, Json(serde_json::json!({ "ids": ids }))).into_response()
        }
        Err(err) => errors::store_error_to_response(err),
    }
}

pub async fn get_event(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_event_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let event = match services.bookings.get_event(id).await {
        Ok(event) => event,
        Err(err) => return errors::store_error_to_response(err),
    };
    let contact_name = match services.bookings.get_contact_name(&event.contact_email).await {
        Ok(name) => name,
        Err(err) => return errors::store_error_to_response(err),
    };
    let invoices = match services.invoices.invoices_for_event(id).await {
        Ok(summaries) => summaries,
        Err(err) => return errors::store_error_to_response(err),
    };

    let mut body = serde_json::to_value(dto::admin_event(&event, contact_name))
        .unwrap_or_else(|_| serde_json::json!({}));
    body["invoices"] = serde_json::json!(invoices
        .iter()
        .map(dto::invoice_summary)
        .collect::<Vec<_>>());

    (StatusCode::OK, Json(body)).into_response()
}

pub async fn request_documents(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(checklist): Json<DocumentChecklist>,
) -> axum::response::Response {
    let id = match parse_event_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services
        .workflows
        .request_documents(id, checklist, Utc::now())
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_event_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.workflows.approve(id, Utc::now()).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_event_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.workflows.cancel(id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

pub async fn set_rate(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetRateRequest>,
) -> axum::response::Response {
    let id = match parse_event_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.workflows.set_rate(id, &body.rate).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

pub async fn list_rates(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.invoices.list_rates().await {
        Ok(rates) => (StatusCode::OK, Json(serde_json::json!(rates))).into_response(),
        Err(err) => errors::store_error_to_response(err),
    }
}

pub async fn send_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SendInvoiceRequest>,
) -> axum::response::Response {
    let mut items = Vec::with_capacity(body.items.len());
    for item in body.items {
        let event_id = match &item.event_id {
            Some(raw) => match parse_event_id(raw) {
                Ok(id) => Some(id),
                Err(response) => return response,
            },
            None => None,
        };
        items.push(NewInvoiceItem {
            event_id,
            description: item.description,
            cost: item.cost,
        });
    }

    match services.workflows.send_invoice(&body.contact, items).await {
        Ok(invoice) => (StatusCode::OK, Json(dto::invoice(&invoice))).into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoicesForEventsParams {
    /// Comma-separated event ids.
    pub events: String,
}

pub async fn invoices_for_events(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<InvoicesForEventsParams>,
) -> axum::response::Response {
    let mut ids = Vec::new();
    for raw in params.events.split(',').filter(|raw| !raw.is_empty()) {
        match parse_event_id(raw) {
            Ok(id) => ids.push(id),
            Err(response) => return response,
        }
    }

    match services.workflows.events_for_invoicing(&ids).await {
        Ok(grouped) => {
            let body: serde_json::Map<String, serde_json::Value> = grouped
                .iter()
                .map(|(email, events)| {
                    (
                        email.clone(),
                        serde_json::json!(events
                            .iter()
                            .map(dto::invoiceable_event)
                            .collect::<Vec<_>>()),
                    )
                })
                .collect();
            (StatusCode::OK, Json(serde_json::Value::Object(body))).into_response()
        }
        Err(err) => errors::workflow_error_to_response(err),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_invoice_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.invoices.get_invoice(id).await {
        Ok(invoice) => (StatusCode::OK, Json(dto::invoice(&invoice))).into_response(),
        Err(err) => errors::store_error_to_response(err),
    }
}

pub async fn mark_invoice_paid(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_invoice_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.invoices.mark_invoice_paid(id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::store_error_to_response(err),
    }
}

pub async fn redispatch_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_invoice_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.workflows.redispatch_invoice(id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}

pub async fn calendar_feed(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<DateRangeParams>,
) -> axum::response::Response {
    let now = Utc::now();
    let (from, to) = match resolve_window(&params, now) {
        Ok(window) => window,
        Err(response) => return response,
    };

    match services.workflows.admin_calendar(from, to, now).await {
        Ok(feed) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CALENDAR_MIME_TYPE)],
            feed,
        )
            .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}
