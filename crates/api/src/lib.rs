//! `hallbook-api` — HTTP transport for the booking service.

pub mod app;
pub mod config;
pub mod observability;
