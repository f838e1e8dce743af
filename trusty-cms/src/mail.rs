//! Outbound mail
//!
//! Notifications go to the site operators' address from `[mail]`. Delivery is
//! best effort: callers spawn [`dispatch`] and never wait on it.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::MailConfig;
use crate::error::{Error, Result};

/// Mail delivery failures
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// HTML notification for the site operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub html: String,
    /// Address replies should go to
    pub reply_to: Option<String>,
}

/// Delivers operator notifications
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn notify(&self, notification: &Notification) -> std::result::Result<(), MailError>;
}

/// SMTP delivery over STARTTLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| Error::Mail(format!("Invalid SMTP relay '{}': {e}", config.host)))?
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        let from = Mailbox::new(
            Some(config.from_name.clone()),
            config
                .from_address
                .parse()
                .map_err(|e| Error::Mail(format!("Invalid from_address: {e}")))?,
        );
        let to = config
            .notify_address
            .parse()
            .map_err(|e| Error::Mail(format!("Invalid notify_address: {e}")))?;

        Ok(Self { transport, from, to })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn notify(&self, notification: &Notification) -> std::result::Result<(), MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = &notification.reply_to {
            builder = builder.reply_to(reply_to.parse()?);
        }
        let message = builder.body(notification.html.clone())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Sends `notification`, logging the outcome
pub async fn dispatch(mailer: Arc<dyn Mailer>, notification: Notification) {
    match mailer.notify(&notification).await {
        Ok(()) => tracing::info!(subject = %notification.subject, "Notification sent"),
        Err(e) => tracing::error!(
            operation = "notify",
            subject = %notification.subject,
            error = %e,
            "Failed to send notification"
        ),
    }
}

/// Escapes text for inclusion in an HTML body, keeping line breaks
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).replace('\n', "<br>")
}
