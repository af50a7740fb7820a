//! Static managed content.
//!
//! A CMS-backed provider is deliberately out of scope; this adapter keeps
//! the named templates in memory and serves them behind the same port, so
//! the workflows (and tests) see exactly what a remote provider would
//! return.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;

use hallbook_workflow::{
    CollaboratorError, ContentProvider, EmailContent, PageContent, EMAIL_BOOKING_CONFIRMED,
    EMAIL_INVOICE, EMAIL_REQUEST_DOCUMENTS, PAGE_CLEANING_POLICY, PAGE_TERMS_OF_HIRE,
};

/// In-memory content provider keyed by template name.
#[derive(Debug, Default)]
pub struct StaticContent {
    emails: HashMap<String, EmailContent>,
    pages: HashMap<String, PageContent>,
}

impl StaticContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email(mut self, key: &str, subject: &str, body: &str) -> Self {
        self.emails.insert(
            key.to_string(),
            EmailContent {
                subject: subject.to_string(),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn with_page(mut self, key: &str, heading: &str, body_html: &str) -> Self {
        self.pages.insert(
            key.to_string(),
            PageContent {
                heading: heading.to_string(),
                body_html: body_html.to_string(),
                last_updated: Utc
                    .with_ymd_and_hms(2026, 1, 5, 0, 0, 0)
                    .single()
                    .unwrap_or_else(Utc::now),
            },
        );
        self
    }

    /// The stock templates the workflows expect.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_email(
                EMAIL_REQUEST_DOCUMENTS,
                "Documents needed for {{event_name}}",
                "<p>Ahead of {{event_name}} on {{date}} we need the following from you \
                 by {{deadline}}:</p>\n<pre>{{documents}}</pre>",
            )
            .with_email(
                EMAIL_BOOKING_CONFIRMED,
                "Your booking for {{event_name}} is confirmed",
                "<p>Good news: {{event_name}} on {{date}} is confirmed. The attached \
                 documents set out the conditions of hire, and the calendar invite \
                 holds your slot.</p>",
            )
            .with_email(
                EMAIL_INVOICE,
                "Your invoice from the Jubilee Hall",
                "<p>Please find your invoice attached. Payment details are on the \
                 invoice itself.</p>",
            )
            .with_page(
                PAGE_TERMS_OF_HIRE,
                "Terms of Hire",
                "<h2>Hire conditions</h2>\n<p>The hirer is responsible for the hall, \
                 its contents and its grounds for the duration of the booking.</p>",
            )
            .with_page(
                PAGE_CLEANING_POLICY,
                "Cleaning and Damage Policy",
                "<h2>Leave the hall as found</h2>\n<p>All spaces used must be cleaned \
                 and returned to their original layout; damage must be reported \
                 before leaving.</p>",
            )
    }
}

#[async_trait]
impl ContentProvider for StaticContent {
    async fn email(&self, key: &str) -> Result<EmailContent, CollaboratorError> {
        self.emails
            .get(key)
            .cloned()
            .ok_or_else(|| CollaboratorError::Content(format!("no email template named {key:?}")))
    }

    async fn page(&self, key: &str) -> Result<PageContent, CollaboratorError> {
        self.pages
            .get(key)
            .cloned()
            .ok_or_else(|| CollaboratorError::Content(format!("no page named {key:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hallbook_workflow::TemplateVars;

    #[tokio::test]
    async fn stock_templates_are_present() {
        let content = StaticContent::with_defaults();

        for key in [EMAIL_REQUEST_DOCUMENTS, EMAIL_BOOKING_CONFIRMED, EMAIL_INVOICE] {
            content.email(key).await.unwrap();
        }
        for key in [PAGE_TERMS_OF_HIRE, PAGE_CLEANING_POLICY] {
            content.page(key).await.unwrap();
        }
    }

    #[tokio::test]
    async fn unknown_keys_are_content_errors() {
        let content = StaticContent::with_defaults();
        assert!(matches!(
            content.email("no-such-template").await.unwrap_err(),
            CollaboratorError::Content(_)
        ));
    }

    #[tokio::test]
    async fn variables_substitute_into_subject_and_body() {
        let content = StaticContent::with_defaults();

        let mut vars = TemplateVars::new();
        vars.insert("event_name".to_string(), "Spring Fair".to_string());
        vars.insert("date".to_string(), "Sat Mar 14 2026".to_string());
        vars.insert("deadline".to_string(), "Sat Feb 28 2026".to_string());
        vars.insert("documents".to_string(), "- Risk Assessment".to_string());

        let email = content
            .email_with_vars(EMAIL_REQUEST_DOCUMENTS, &vars)
            .await
            .unwrap();

        assert_eq!(email.subject, "Documents needed for Spring Fair");
        assert!(email.body.contains("Spring Fair on Sat Mar 14 2026"));
        assert!(email.body.contains("- Risk Assessment"));
    }
}
