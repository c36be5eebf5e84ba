//! Outbound mail transport
//!
//! One SMTP session per message: implicit TLS, PLAIN authentication, send,
//! then QUIT. Shared by the email handler and the failure notifier.

use async_trait::async_trait;
use lettre::message::{Mailbox, MessageBuilder};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Mutex;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, MailError>;

/// Sends fully built messages
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<()>;
}

/// Parse a mailbox, mapping failures to [`MailError::InvalidAddress`]
pub fn mailbox(address: &str) -> Result<Mailbox> {
    address.parse().map_err(|e: lettre::address::AddressError| {
        MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Start a message with sender, recipient and subject set
pub fn new_message(from: &Mailbox, to: &Mailbox, subject: &str) -> MessageBuilder {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject)
}

/// SMTP relay over implicit TLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let password = config.password.clone().unwrap_or_default();

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), password))
            .authentication(vec![Mechanism::Plain])
            .build();

        Ok(Self {
            transport,
            host: config.host.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: Message) -> Result<()> {
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(host = %self.host, code = %response.code(), "SMTP message accepted");
        Ok(())
    }
}

/// A message captured by [`RecordingMailer`]
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: Vec<String>,
    pub subject: Option<String>,
    pub raw: String,
}

/// In-memory transport for tests and dry runs
///
/// Records every message it accepts. Sends addressed to a recipient listed
/// with [`fail_for`](RecordingMailer::fail_for) are rejected instead.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: Mutex<Vec<String>>,
    fail_all: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport on which every send fails
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Reject messages addressed to `recipient`
    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(recipient.to_string());
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages delivered to `recipient`
    pub fn sent_to(&self, recipient: &str) -> Vec<SentMail> {
        self.sent()
            .into_iter()
            .filter(|m| m.to.iter().any(|to| to == recipient))
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: Message) -> Result<()> {
        let to: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect();

        let rejected = self.fail_all
            || self
                .failing
                .lock()
                .map(|failing| to.iter().any(|t| failing.contains(t)))
                .unwrap_or(false);
        if rejected {
            return Err(MailError::Transport(format!(
                "recipient rejected: {}",
                to.join(", ")
            )));
        }

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        let subject = raw
            .lines()
            .find_map(|line| line.strip_prefix("Subject: "))
            .map(str::to_string);

        tracing::info!(to = %to.join(", "), subject = ?subject, "Recorded mail");

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMail { to, subject, raw });
        }
        Ok(())
    }
}
