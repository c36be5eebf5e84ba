use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use super::types::FileItem;
use crate::mail::MailError;

/// Delivery errors, consumed inside [`FileHandler::process`]
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("mail delivery failed: {0}")]
    Mail(#[from] MailError),
}

/// Delivers one file to one external system
///
/// Implementations provide [`deliver`](FileHandler::deliver). Callers use
/// [`process`](FileHandler::process), which never fails: errors are logged
/// and reported as `false`.
#[async_trait]
pub trait FileHandler: Send + Sync {
    /// Handler name as configured, used in logs and the delivery ledger
    fn name(&self) -> &str;

    /// Attempt delivery once, without retry
    async fn deliver(&self, file: &FileItem) -> Result<(), HandlerError>;

    async fn process(&self, file: &FileItem) -> bool {
        match self.deliver(file).await {
            Ok(()) => {
                info!(handler = self.name(), file = %file.path.display(), "Delivered");
                true
            }
            Err(e) => {
                error!(
                    handler = self.name(),
                    file = %file.path.display(),
                    error = %e,
                    "Delivery failed"
                );
                false
            }
        }
    }
}
