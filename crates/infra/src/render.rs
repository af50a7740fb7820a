//! Document rendering to self-contained HTML.
//!
//! Invoices render to an itemized table with an exact decimal total;
//! policy pages render from managed content. HTML keeps the documents
//! transportable as email attachments without a PDF toolchain; the
//! orchestrator only sees `render* -> bytes` either way.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use hallbook_invoicing::Invoice;
use hallbook_workflow::{CollaboratorError, ContentProvider, DocumentRenderer};

/// Fixed footer line stamped on every rendered document.
const DOCUMENT_FOOTER: &str = "Jubilee Hall Trust, Registered Charity 1097364";

/// Renders invoices and managed pages as standalone HTML documents.
pub struct HtmlRenderer {
    content: Arc<dyn ContentProvider>,
}

impl HtmlRenderer {
    pub fn new(content: Arc<dyn ContentProvider>) -> Self {
        Self { content }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn money(amount: Decimal) -> String {
    format!("£{:.2}", amount)
}

fn document(title: &str, body: &str) -> Vec<u8> {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n<footer><p>{}</p></footer>\n</body>\n</html>\n",
        escape(title),
        body,
        escape(DOCUMENT_FOOTER),
    )
    .into_bytes()
}

#[async_trait]
impl DocumentRenderer for HtmlRenderer {
    async fn render_invoice(&self, invoice: &Invoice) -> Result<Vec<u8>, CollaboratorError> {
        let mut body = String::new();
        body.push_str("<h1>Invoice</h1>\n");
        body.push_str(&format!(
            "<p><strong>Invoice Reference:</strong> {}</p>\n",
            escape(&invoice.reference)
        ));

        body.push_str("<table>\n<thead><tr><th>Description</th><th>Cost</th></tr></thead>\n<tbody>\n");
        for item in &invoice.items {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape(&item.description),
                money(item.cost)
            ));
        }
        body.push_str(&format!(
            "</tbody>\n<tfoot><tr><th>Total Cost</th><th>{}</th></tr></tfoot>\n</table>\n",
            money(invoice.total())
        ));

        Ok(document("Invoice", &body))
    }

    async fn render_page(&self, key: &str) -> Result<Vec<u8>, CollaboratorError> {
        let page = self.content.page(key).await?;

        let body = format!(
            "<h1>{}</h1>\n<p>Last updated {}.</p>\n{}\n",
            escape(&page.heading),
            page.last_updated.format("%-d %B %Y"),
            page.body_html,
        );

        Ok(document(&page.heading, &body))
    }

    fn document_mime_type(&self) -> &'static str {
        "text/html"
    }

    fn document_extension(&self) -> &'static str {
        "html"
    }
}
