//! SMTP delivery via lettre, plus a log-only notifier for local runs.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::{Notifier, OutgoingEmail};
use crate::error::{ConfigError, NotifyError};

/// SMTP settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// e.g. `TLC <mail@tlc-onboarding.com>`
    pub from_address: String,
}

impl SmtpConfig {
    /// Build config from `SMTP_*` variables.
    /// Returns `Ok(None)` if `SMTP_HOST` is not set (delivery disabled).
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let Some(host) = var("SMTP_HOST") else {
            return Ok(None);
        };

        let port = match var("SMTP_PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "SMTP_PORT".to_string(),
                message: format!("{e}"),
            })?,
            None => 587,
        };

        let username = var("SMTP_USERNAME").unwrap_or_default();
        let password = SecretString::from(var("SMTP_PASSWORD").unwrap_or_default());
        let from_address = var("SMTP_FROM_ADDRESS").unwrap_or_else(|| username.clone());

        if from_address.parse::<Mailbox>().is_err() {
            return Err(ConfigError::InvalidValue {
                key: "SMTP_FROM_ADDRESS".to_string(),
                message: format!("'{from_address}' is not a mailbox"),
            });
        }

        Ok(Some(Self {
            host,
            port,
            username,
            password,
            from_address,
        }))
    }
}

/// Sends email through an SMTP relay.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

/// Assemble the MIME message: HTML body, plus a mixed multipart when there
/// are attachments.
fn build_message(from: &str, email: OutgoingEmail) -> Result<Message, NotifyError> {
    let from: Mailbox = from.parse().map_err(|e| NotifyError::InvalidAddress {
        address: from.to_string(),
        reason: format!("{e}"),
    })?;
    let to: Mailbox = email.to.parse().map_err(|e| NotifyError::InvalidAddress {
        address: email.to.clone(),
        reason: format!("{e}"),
    })?;

    let builder = Message::builder().from(from).to(to).subject(email.subject);
    let html = SinglePart::html(email.html_body);

    let message = if email.attachments.is_empty() {
        builder.singlepart(html)
    } else {
        let mut parts = MultiPart::mixed().singlepart(html);
        for attachment in email.attachments {
            let content_type = ContentType::parse(&attachment.mime_type).map_err(|e| {
                NotifyError::Build(format!(
                    "attachment {} has bad mime type: {e}",
                    attachment.file_name
                ))
            })?;
            parts = parts.singlepart(
                MailAttachment::new(attachment.file_name).body(attachment.bytes, content_type),
            );
        }
        builder.multipart(parts)
    };

    message.map_err(|e| NotifyError::Build(e.to_string()))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        let to = email.to.clone();
        let message = build_message(&self.config.from_address, email)?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::relay(&self.config.host)
            .map_err(|e| NotifyError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| NotifyError::SendFailed(format!("send task failed: {e}")))?
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        info!(to = %to, "Email sent");
        Ok(())
    }
}

/// Logs emails instead of sending them. Used when SMTP is not configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "SMTP disabled, email not sent"
        );
        Ok(())
    }
}
