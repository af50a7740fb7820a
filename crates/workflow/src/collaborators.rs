//! Collaborator ports: document rendering, email delivery and managed
//! content.
//!
//! These are the seams to systems the core does not own. Rendering and
//! delivery internals live behind them in `hallbook-infra`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use hallbook_invoicing::Invoice;

/// Failure in a collaborator during a workflow sequence.
///
/// Surfaced immediately; the remaining steps of the sequence do not run
/// and prior steps' effects stay in place.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("document rendering failed: {0}")]
    Render(String),

    #[error("email delivery failed: {0}")]
    Email(String),

    #[error("content fetch failed: {0}")]
    Content(String),
}

/// A file attached to an outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Subject and HTML body of a managed email template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// A managed page, as rendered into a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub heading: String,
    pub body_html: String,
    pub last_updated: DateTime<Utc>,
}

/// Variables substituted into a fetched template.
pub type TemplateVars = BTreeMap<String, String>;

/// Replace `{{name}}` placeholders with their variable values.
///
/// Unknown placeholders are left in place so a missing variable shows up
/// in the delivered email rather than vanishing silently.
pub fn substitute(template: &str, vars: &TemplateVars) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

/// Renders invoices and managed pages to a transportable document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render_invoice(&self, invoice: &Invoice) -> Result<Vec<u8>, CollaboratorError>;

    async fn render_page(&self, key: &str) -> Result<Vec<u8>, CollaboratorError>;

    /// MIME type of the documents this renderer produces.
    fn document_mime_type(&self) -> &'static str;

    /// Filename extension for the documents this renderer produces.
    fn document_extension(&self) -> &'static str;
}

/// Delivers an HTML email with optional attachments.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), CollaboratorError>;
}

/// Fetches managed email templates and pages.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn email(&self, key: &str) -> Result<EmailContent, CollaboratorError>;

    async fn page(&self, key: &str) -> Result<PageContent, CollaboratorError>;

    /// Fetch a template and substitute `vars` into subject and body.
    async fn email_with_vars(
        &self,
        key: &str,
        vars: &TemplateVars,
    ) -> Result<EmailContent, CollaboratorError> {
        let template = self.email(key).await?;
        Ok(EmailContent {
            subject: substitute(&template.subject, vars),
            body: substitute(&template.body, vars),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_replaces_known_placeholders() {
        let mut vars = TemplateVars::new();
        vars.insert("event_name".to_string(), "Spring Fair".to_string());
        vars.insert("deadline".to_string(), "Mon Mar 16 2026".to_string());

        let out = substitute("{{event_name}} documents due {{deadline}}", &vars);
        assert_eq!(out, "Spring Fair documents due Mon Mar 16 2026");
    }

    #[test]
    fn substitute_leaves_unknown_placeholders_visible() {
        let vars = TemplateVars::new();
        assert_eq!(substitute("hello {{missing}}", &vars), "hello {{missing}}");
    }
}
