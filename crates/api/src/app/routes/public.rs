//! Public routes: booking submission, listings and the calendar feed.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};

use hallbook_booking::{Contact, EventDraft, Visibility};
use hallbook_core::TimeRange;
use hallbook_workflow::calendar::CALENDAR_MIME_TYPE;

use crate::app::routes::{resolve_window, DateRangeParams};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/events", post(add_event).get(list_events))
        .route("/events/calendar.ics", get(calendar_feed))
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

/// The five policy acknowledgements a public submission must carry.
fn check_policies(body: &dto::AddEventRequest) -> Result<(), axum::response::Response> {
    let unticked = [
        (body.privacy_policy, "privacy policy was not ticked"),
        (body.terms_of_hire, "terms of hire was not ticked"),
        (
            body.cleaning_and_damage,
            "cleaning and damage policy was not ticked",
        ),
        (body.car_parking, "car parking policy was not ticked"),
        (body.adhesives, "adhesives policy was not ticked"),
    ]
    .into_iter()
    .find(|(ticked, _)| !ticked);

    match unticked {
        Some((_, message)) => Err(errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "policy_not_ticked",
            message,
        )),
        None => Ok(()),
    }
}

pub async fn add_event(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AddEventRequest>,
) -> axum::response::Response {
    if let Err(response) = check_policies(&body) {
        return response;
    }

    let contact = match Contact::new(&body.contact.email_address, &body.contact.name) {
        Ok(contact) => contact,
        Err(err) => return errors::domain_error_to_response(err),
    };

    let from = match parse_timestamp(&body.event.from, "from") {
        Ok(from) => from,
        Err(response) => return response,
    };
    let to = match parse_timestamp(&body.event.to, "to") {
        Ok(to) => to,
        Err(response) => return response,
    };
    let range = match TimeRange::new(from, to) {
        Ok(range) => range,
        Err(err) => return errors::domain_error_to_response(err),
    };

    let draft = match EventDraft::new(
        contact,
        range,
        &body.event.name,
        Visibility::from(body.event.publicly_visible),
        &body.event.details,
    ) {
        Ok(draft) => draft,
        Err(err) => return errors::domain_error_to_response(err),
    };

    match services.bookings.submit_event(&draft).await {
        Ok(id) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id.to_string() })),
        )
            .into_response(),
        Err(err) => errors::store_error_to_response(err),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ListEventsParams {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Restrict to one contact's bookings (by email).
    pub contact: Option<String>,
}

pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<ListEventsParams>,
) -> axum::response::Response {
    let window = DateRangeParams {
        from: params.from,
        to: params.to,
    };
    let (from, to) = match resolve_window(&window, Utc::now()) {
        Ok(window) => window,
        Err(response) => return response,
    };

    let events = match &params.contact {
        Some(contact) => {
            services
                .bookings
                .list_events_for_contact(contact, from, to)
                .await
        }
        None => services.bookings.list_events(from, to).await,
    };

    match events {
        Ok(events) => {
            let events: Vec<dto::ListEventDto> =
                events.iter().map(|event| dto::list_event(event, true)).collect();
            (StatusCode::OK, Json(serde_json::json!({ "events": events }))).into_response()
        }
        Err(err) => errors::store_error_to_response(err),
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

    match services.workflows.public_calendar(from, to, now).await {
        Ok(feed) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CALENDAR_MIME_TYPE)],
            feed,
        )
            .into_response(),
        Err(err) => errors::workflow_error_to_response(err),
    }
}
