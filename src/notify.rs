//! Out-of-band failure notification

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::mail::{self, MailError, MailTransport};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to send failure notification for '{file}': {source}")]
    Send {
        file: String,
        #[source]
        source: MailError,
    },
}

/// Emails the operator when a handler fails for a file
pub struct FailureNotifier {
    mailer: Arc<dyn MailTransport>,
    from: Mailbox,
    to: Mailbox,
    subject: String,
}

impl FailureNotifier {
    pub fn new(
        mailer: Arc<dyn MailTransport>,
        from: &str,
        to: &str,
        subject: impl Into<String>,
    ) -> Result<Self, MailError> {
        Ok(Self {
            mailer,
            from: mail::mailbox(from)?,
            to: mail::mailbox(to)?,
            subject: subject.into(),
        })
    }

    /// Send the notification for `file_name`
    ///
    /// A failure here means the operator cannot be told about other
    /// failures, so it is logged and returned rather than swallowed.
    pub async fn notify(&self, file_name: &str) -> Result<(), NotifyError> {
        let wrap = |source: MailError| NotifyError::Send {
            file: file_name.to_string(),
            source,
        };

        let message = mail::new_message(&self.from, &self.to, &self.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(notification_body(file_name))
            .map_err(|e| wrap(MailError::Build(e.to_string())))?;

        match self.mailer.send(message).await {
            Ok(()) => {
                info!(file = file_name, "Sent failure notification");
                Ok(())
            }
            Err(e) => {
                error!(file = file_name, error = %e, "Failed to send failure notification");
                Err(wrap(e))
            }
        }
    }
}

fn notification_body(file_name: &str) -> String {
    format!(
        "An error occurred while processing file: '{file_name}'\nCheck the logs for more details."
    )
}
