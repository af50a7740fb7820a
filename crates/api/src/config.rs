//! Environment-driven service configuration.

use hallbook_booking::TransitionPolicy;
use hallbook_infra::SmtpConfig;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// SMTP relay; outbound email is logged and dropped when unset.
    pub smtp: Option<SmtpConfig>,
    pub transition_policy: TransitionPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let smtp = std::env::var("SMTP_SERVER").ok().map(|server| SmtpConfig {
            server,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "bookings@jubileehall.org.uk".to_string()),
        });

        let transition_policy = match std::env::var("STRICT_TRANSITIONS").as_deref() {
            Ok("true") | Ok("1") => TransitionPolicy::Strict,
            _ => TransitionPolicy::Permissive,
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            smtp,
            transition_policy,
        }
    }
}
