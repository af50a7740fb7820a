//! Service wiring: stores, collaborators and the orchestrator.

use std::sync::Arc;

use tracing::warn;

use hallbook_booking::TransitionPolicy;
use hallbook_infra::{
    HtmlRenderer, InMemoryStore, LoggingSender, PostgresStore, SmtpSender, StaticContent,
};
use hallbook_workflow::{BookingStore, ContentProvider, EmailSender, InvoiceStore, Orchestrator};

use crate::config::Config;

/// Everything the handlers reach for, built once at startup.
pub struct AppServices {
    pub bookings: Arc<dyn BookingStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub workflows: Orchestrator,
}

/// Build production services from config: Postgres + SMTP when
/// configured, the in-memory/logging stand-ins otherwise.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let email: Arc<dyn EmailSender> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpSender::new(smtp.clone())),
        None => {
            warn!("SMTP_SERVER not set; outbound email will be logged and dropped");
            Arc::new(LoggingSender)
        }
    };

    let (bookings, invoices): (Arc<dyn BookingStore>, Arc<dyn InvoiceStore>) =
        match &config.database_url {
            Some(url) => {
                let store = PostgresStore::connect(url).await?;
                store.migrate().await?;
                let store = Arc::new(store);
                (store.clone(), store)
            }
            None => {
                warn!("DATABASE_URL not set; bookings will not survive a restart");
                let store = Arc::new(InMemoryStore::new());
                (store.clone(), store)
            }
        };

    Ok(wire(bookings, invoices, email, config.transition_policy))
}

/// In-memory wiring for tests and local development.
pub fn build_in_memory_services(policy: TransitionPolicy) -> AppServices {
    let store = Arc::new(InMemoryStore::new());
    wire(store.clone(), store, Arc::new(LoggingSender), policy)
}

fn wire(
    bookings: Arc<dyn BookingStore>,
    invoices: Arc<dyn InvoiceStore>,
    email: Arc<dyn EmailSender>,
    policy: TransitionPolicy,
) -> AppServices {
    let content: Arc<dyn ContentProvider> = Arc::new(StaticContent::with_defaults());
    let renderer = Arc::new(HtmlRenderer::new(content.clone()));

    let workflows = Orchestrator::new(
        bookings.clone(),
        invoices.clone(),
        renderer,
        email,
        content,
        policy,
    );

    AppServices {
        bookings,
        invoices,
        workflows,
    }
}
