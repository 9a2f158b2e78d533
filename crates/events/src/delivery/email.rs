//! Email transport for rendered [`OutboundEmailMessage`]s.
//!
//! [`SmtpEmailer`] wraps the `lettre` async SMTP transport. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and [`NoopEmailer`] should be
//! used instead.

use std::sync::Arc;

use async_trait::async_trait;
use ddb_messaging::{decode, HandlerError, MessageHandler};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::messages::OutboundEmailMessage;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// Defaults to 587.
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default |
    /// |-----------------|----------|---------|
    /// | `SMTP_HOST`     | yes      |         |
    /// | `SMTP_PORT`     | no       | `587`   |
    /// | `SMTP_USER`     | no       |         |
    /// | `SMTP_PASSWORD` | no       |         |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Emailer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Emailer: Send + Sync {
    async fn send(&self, email: &OutboundEmailMessage) -> Result<(), EmailError>;
}

/// Assemble the MIME message for an outbound email.
pub fn build_message(email: &OutboundEmailMessage) -> Result<Message, EmailError> {
    let from = Mailbox::new(Some(email.from_name.clone()), email.from_address.parse()?);
    let to_name = (!email.to_name.is_empty()).then(|| email.to_name.clone());
    let to = Mailbox::new(to_name, email.to_address.parse()?);

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(email.html_content.clone())
        .map_err(|e| EmailError::Build(e.to_string()))
}

/// Sends email through an SMTP relay.
pub struct SmtpEmailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Emailer for SmtpEmailer {
    async fn send(&self, email: &OutboundEmailMessage) -> Result<(), EmailError> {
        let message = build_message(email)?;
        self.transport.send(message).await?;
        tracing::info!(to = %email.to_address, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Logs instead of sending. Used when SMTP is not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmailer;

#[async_trait]
impl Emailer for NoopEmailer {
    async fn send(&self, email: &OutboundEmailMessage) -> Result<(), EmailError> {
        tracing::info!(to = %email.to_address, subject = %email.subject, "Email transport disabled, dropping email");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Drains `outbound_emails`. Transport errors are returned so the broker can
/// redeliver; a body that does not decode is an error as well. Emails with an
/// unparseable address or an unbuildable message are logged and dropped.
pub struct EmailDeliveryHandler {
    emailer: Arc<dyn Emailer>,
}

impl EmailDeliveryHandler {
    pub fn new(emailer: Arc<dyn Emailer>) -> Self {
        Self { emailer }
    }
}

#[async_trait]
impl MessageHandler for EmailDeliveryHandler {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let email: OutboundEmailMessage = decode(payload)?;
        match self.emailer.send(&email).await {
            Ok(()) => Ok(()),
            Err(e @ (EmailError::Address(_) | EmailError::Build(_))) => {
                tracing::warn!(
                    to = %email.to_address,
                    user_id = %email.user_id,
                    error = %e,
                    "Dropping undeliverable email"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
