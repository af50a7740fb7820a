//! HTTP application wiring (axum router + service wiring).
//!
//! - `services.rs`: store/collaborator wiring behind the orchestrator
//! - `routes/`: HTTP routes + handlers (public and admin)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: services::AppServices) -> Router {
    let services = Arc::new(services);

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", routes::router())
        .layer(Extension(services))
}
