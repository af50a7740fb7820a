//! `hallbook-infra` — adapters behind the workflow ports.
//!
//! Storage (in-memory and Postgres), SMTP delivery, document rendering and
//! managed content. The ports themselves live in `hallbook-workflow`.

pub mod content;
pub mod memory;
pub mod postgres;
pub mod render;
pub mod smtp;

pub use content::StaticContent;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use render::HtmlRenderer;
pub use smtp::{LoggingSender, SmtpConfig, SmtpSender};
