//! SMTP email delivery (lettre).

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as LettreAttachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use hallbook_workflow::{Attachment, CollaboratorError, EmailSender};

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// From header, also used as the Bcc copy so the bookings inbox keeps
    /// a record of everything sent.
    pub from: String,
}

/// Sends booking email through an authenticated SMTP relay.
pub struct SmtpSender {
    config: SmtpConfig,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<SmtpTransport, CollaboratorError> {
        Ok(SmtpTransport::relay(&self.config.server)
            .map_err(|e| CollaboratorError::Email(format!("smtp relay: {e}")))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build())
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Message, CollaboratorError> {
        let from = self
            .config
            .from
            .parse()
            .map_err(|e| CollaboratorError::Email(format!("invalid from address: {e}")))?;
        let bcc = self
            .config
            .from
            .parse()
            .map_err(|e| CollaboratorError::Email(format!("invalid bcc address: {e}")))?;
        let to = to
            .parse()
            .map_err(|e| CollaboratorError::Email(format!("invalid to address: {e}")))?;

        let mut body = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html_body.to_string()),
        );
        for attachment in attachments {
            let content_type = ContentType::parse(&attachment.mime_type)
                .map_err(|e| CollaboratorError::Email(format!("invalid attachment type: {e}")))?;
            body = body.singlepart(
                LettreAttachment::new(attachment.filename).body(attachment.content, content_type),
            );
        }

        Message::builder()
            .from(from)
            .to(to)
            .bcc(bcc)
            .subject(subject)
            .multipart(body)
            .map_err(|e| CollaboratorError::Email(format!("failed to build email: {e}")))
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), CollaboratorError> {
        let message = self.build_message(to, subject, html_body, attachments)?;
        let mailer = self.build_transport()?;

        // lettre's sync transport blocks on the wire; keep it off the
        // async executor.
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&message)
                .map_err(|e| CollaboratorError::Email(format!("failed to send email: {e}")))
        })
        .await
        .map_err(|e| CollaboratorError::Email(format!("email task failed: {e}")))?
        .map(|_| ())
    }
}

/// Logs outbound email instead of delivering it. Used in dev environments
/// with no SMTP relay configured.
#[derive(Debug, Default)]
pub struct LoggingSender;

#[async_trait]
impl EmailSender for LoggingSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        _html_body: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(), CollaboratorError> {
        info!(to, subject, attachments = attachments.len(), "email not delivered (no smtp relay configured)");
        Ok(())
    }
}
