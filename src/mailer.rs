//! Outbound email as a fire-and-forget collaborator.
//!
//! When SMTP is not configured the mailer runs in no-op mode and only logs,
//! which keeps development and test setups free of mail infrastructure.

use std::sync::Arc;

use lettre::message::{Mailbox, Message, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// SMTP settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: String,
}

impl MailerConfig {
    pub fn from_env() -> Self {
        Self {
            smtp_host: std::env::var("BOOKSHELF_SMTP_HOST").unwrap_or_default(),
            smtp_port: std::env::var("BOOKSHELF_SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("BOOKSHELF_SMTP_USERNAME").ok(),
            smtp_password: std::env::var("BOOKSHELF_SMTP_PASSWORD").ok(),
            from_address: std::env::var("BOOKSHELF_MAIL_FROM")
                .unwrap_or_else(|_| "Bookshelf <noreply@bookshelf.local>".into()),
        }
    }
}

#[derive(Clone)]
pub struct Mailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &MailerConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.from_address.parse()?;

        let transport = if config.smtp_host.trim().is_empty() {
            log::warn!("SMTP host not configured; mailer running in no-op mode");
            None
        } else {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                    .port(config.smtp_port);

            if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder = builder
                    .credentials(Credentials::new(username.clone(), password.clone()));
            }

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    /// A mailer that drops everything; used by tests.
    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: Mailbox::new(None, lettre::Address::new("noreply", "bookshelf.local")
                .expect("static address is valid")),
        }
    }

    /// Queue an email on a background task. Delivery failures are logged,
    /// never observed by the caller.
    pub fn dispatch(&self, recipients: Vec<String>, subject: &str, html_body: String) {
        let mailer = self.clone();
        let subject = subject.to_string();
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&recipients, &subject, &html_body).await {
                log::error!("failed to send '{subject}' email: {err}");
            }
        });
    }

    pub async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        let Some(transport) = &self.transport else {
            log::info!(
                "mailer disabled; dropping '{subject}' email to {} recipient(s)",
                recipients.len()
            );
            return Ok(());
        };

        for recipient in recipients {
            let message = Message::builder()
                .from(self.from.clone())
                .to(recipient.parse()?)
                .subject(subject)
                .header(header::ContentType::TEXT_HTML)
                .body(html_body.to_string())?;

            transport.send(message).await?;
            log::debug!("sent '{subject}' email to {recipient}");
        }

        Ok(())
    }
}
