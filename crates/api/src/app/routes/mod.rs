//! HTTP routes, one module per audience.

use axum::http::StatusCode;
use axum::Router;
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use serde::Deserialize;

use super::errors::json_error;

pub mod admin;
pub mod public;

pub fn router() -> Router {
    Router::new()
        .nest("/admin", admin::router())
        .merge(public::router())
}

pub async fn health() -> &'static str {
    "ok"
}

/// `from`/`to` date filters shared by the listing endpoints.
#[derive(Debug, Deserialize)]
pub struct DateRangeParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Default listing window: start of the current month, 18 months long.
fn default_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let to = from
        .checked_add_months(Months::new(18))
        .map(|to| to - Duration::days(1))
        .unwrap_or(from);
    (from, to)
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, axum::response::Response> {
    let date = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_date",
            format!("{value:?} is not a YYYY-MM-DD date"),
        )
    })?;
    Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default()))
}

/// Resolve the requested window, falling back to the default one. If one
/// bound is given, both must be.
pub fn resolve_window(
    params: &DateRangeParams,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), axum::response::Response> {
    match (&params.from, &params.to) {
        (None, None) => Ok(default_window(now)),
        (Some(from), Some(to)) => Ok((parse_date(from)?, parse_date(to)?)),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_range",
            "if restricting by date, both from and to must be specified",
        )),
    }
}
