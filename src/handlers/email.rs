//! Delivery of a file as an email attachment

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use std::sync::Arc;

use super::traits::{FileHandler, HandlerError};
use super::types::FileItem;
use crate::mail::{self, MailError, MailTransport};

/// Sends each file to a fixed recipient, subject = file name
pub struct EmailHandler {
    name: String,
    mailer: Arc<dyn MailTransport>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailHandler {
    pub fn new(
        name: impl Into<String>,
        mailer: Arc<dyn MailTransport>,
        from: &str,
        to: &str,
    ) -> Result<Self, MailError> {
        Ok(Self {
            name: name.into(),
            mailer,
            from: mail::mailbox(from)?,
            to: mail::mailbox(to)?,
        })
    }

    pub fn recipient(&self) -> &Mailbox {
        &self.to
    }
}

#[async_trait]
impl FileHandler for EmailHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, file: &FileItem) -> Result<(), HandlerError> {
        let bytes = file.read().await?;

        let content_type = ContentType::parse(mime::APPLICATION_OCTET_STREAM.as_ref())
            .map_err(|e| MailError::Build(e.to_string()))?;
        let attachment = Attachment::new(file.name.clone()).body(bytes, content_type);

        let message = mail::new_message(&self.from, &self.to, &file.name)
            .multipart(MultiPart::mixed().singlepart(attachment))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.mailer.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::RecordingMailer;
    use tempfile::TempDir;

    async fn write_item(dir: &std::path::Path) -> FileItem {
        let folder = dir.join("to_bookkeeping");
        std::fs::create_dir_all(&folder).unwrap();
        let path = folder.join("receipt.pdf");
        std::fs::write(&path, b"dummy content").unwrap();
        FileItem::from_path(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_email_sends_attachment() {
        let mailer = Arc::new(RecordingMailer::new());
        let handler = EmailHandler::new(
            "bookkeeping",
            mailer.clone(),
            "scanner@example.com",
            "books@example.com",
        )
        .unwrap();

        let temp_dir = TempDir::new().unwrap();
        let item = write_item(temp_dir.path()).await;

        assert!(handler.process(&item).await);

        let sent = mailer.sent_to("books@example.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject.as_deref(), Some("receipt.pdf"));
        assert!(sent[0].raw.contains("application/octet-stream"));
        assert!(sent[0].raw.contains("filename=\"receipt.pdf\""));
    }

    #[tokio::test]
    async fn test_email_send_failure_is_false() {
        let mailer = Arc::new(RecordingMailer::failing());
        let handler = EmailHandler::new(
            "bookkeeping",
            mailer.clone(),
            "scanner@example.com",
            "books@example.com",
        )
        .unwrap();

        let temp_dir = TempDir::new().unwrap();
        let item = write_item(temp_dir.path()).await;

        assert!(matches!(
            handler.deliver(&item).await,
            Err(HandlerError::Mail(MailError::Transport(_)))
        ));
        assert!(!handler.process(&item).await);
    }

    #[test]
    fn test_email_rejects_bad_recipient() {
        let result = EmailHandler::new(
            "bookkeeping",
            Arc::new(RecordingMailer::new()),
            "scanner@example.com",
            "nope",
        );
        assert!(matches!(result, Err(MailError::InvalidAddress { .. })));
    }
}
