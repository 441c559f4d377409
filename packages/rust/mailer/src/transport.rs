//! Outbound transports: the [`Mailer`] seam and its SMTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leadline_shared::{Attempt, LeadlineError, Result, Secret, SmtpConfig};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, instrument};

use crate::message::{OutboundEmail, SendReceipt};

/// Sends one outreach email.
///
/// `Attempt::Ok` means the transport accepted the message. Retryable failures
/// leave the contact selectable on the next run.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Attempt<SendReceipt>;
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

/// SMTP mailer for one sending account.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    /// Build a transport that logs in as `username`.
    ///
    /// `tls` is `"tls"` (implicit TLS), `"starttls"`, or `"none"`.
    pub fn new(config: &SmtpConfig, username: &str, password: &Secret) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(LeadlineError::config("smtp.host is not set"));
        }

        let mut builder = match config.tls.as_str() {
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| LeadlineError::config(format!("smtp relay: {e}")))?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| LeadlineError::config(format!("smtp relay: {e}")))?,
        };

        builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .credentials(Credentials::new(
                username.to_string(),
                password.expose().to_string(),
            ));

        Ok(Self {
            transport: Arc::new(builder.build()),
        })
    }
}

/// Build a lettre message from an outbound email.
pub fn build_message(email: &OutboundEmail) -> Result<Message> {
    let mailbox = |raw: &str| -> Result<Mailbox> {
        raw.parse()
            .map_err(|_| LeadlineError::validation(format!("invalid address: {raw}")))
    };

    let mut builder = Message::builder()
        .from(mailbox(&email.from_header())?)
        .to(mailbox(&email.to)?)
        .subject(&email.subject);

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }

    builder
        .body(email.body.clone())
        .map_err(|e| LeadlineError::validation(format!("message build failed: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip_all, fields(to = %email.to))]
    async fn send(&self, email: &OutboundEmail) -> Attempt<SendReceipt> {
        let message = match build_message(email) {
            Ok(message) => message,
            Err(e) => return Attempt::Permanent(e),
        };

        match self.transport.send(message).await {
            Ok(_) => {
                debug!("smtp accepted");
                Attempt::Ok(SendReceipt::default())
            }
            Err(e) => Attempt::failed(LeadlineError::mail(
                format!("smtp send failed: {e}"),
                !e.is_permanent(),
            )),
        }
    }
}
