//! Document upload over HTTP (Paperless `post_document` style)

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, header};
use tracing::debug;

use super::traits::{FileHandler, HandlerError};
use super::types::FileItem;
use crate::config::UploadConfig;

const FORM_FIELD: &str = "document";

/// Uploads each file as multipart field `document` with a token header
pub struct UploadHandler {
    name: String,
    client: Client,
    endpoint: String,
    token: String,
}

impl UploadHandler {
    pub fn new(name: impl Into<String>, config: &UploadConfig) -> Result<Self, HandlerError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| HandlerError::Request(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            client,
            endpoint: config.endpoint(),
            token: config.token.clone().unwrap_or_default(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn classify(e: reqwest::Error) -> HandlerError {
    if e.is_timeout() {
        HandlerError::Timeout(e.to_string())
    } else if e.is_connect() {
        HandlerError::Connect(e.to_string())
    } else {
        HandlerError::Request(e.to_string())
    }
}

#[async_trait]
impl FileHandler for UploadHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, file: &FileItem) -> Result<(), HandlerError> {
        let bytes = file.read().await?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(mime::APPLICATION_OCTET_STREAM.as_ref())
            .map_err(|e| HandlerError::Request(e.to_string()))?;
        let form = Form::new().part(FORM_FIELD, part);

        debug!(endpoint = %self.endpoint, file = %file.name, size, "Uploading");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Token {}", self.token))
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "Upload response");

        if status != StatusCode::OK {
            return Err(HandlerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UPLOAD_PATH: &str = "/api/documents/post_document/";

    fn upload_config(url: String) -> UploadConfig {
        UploadConfig {
            url,
            path: UPLOAD_PATH.to_string(),
            timeout_secs: 2,
            token: Some("test-token".to_string()),
        }
    }

    async fn write_item(dir: &Path, folder: &str, name: &str) -> FileItem {
        let folder = dir.join(folder);
        std::fs::create_dir_all(&folder).unwrap();
        let path = folder.join(name);
        std::fs::write(&path, b"dummy content").unwrap();
        FileItem::from_path(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_success_on_200() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .and(header_eq("Authorization", "Token test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"ok\""))
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let item = write_item(temp_dir.path(), "to_paperless", "invoice.pdf").await;
        let handler = UploadHandler::new("paperless", &upload_config(mock_server.uri())).unwrap();

        assert!(handler.process(&item).await);

        let requests = mock_server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"document\""));
        assert!(body.contains("filename=\"invoice.pdf\""));
        assert!(body.contains("dummy content"));
    }

    #[tokio::test]
    async fn test_upload_rejected_on_500() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("error"))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let item = write_item(temp_dir.path(), "to_paperless", "invoice.pdf").await;
        let handler = UploadHandler::new("paperless", &upload_config(mock_server.uri())).unwrap();

        let err = handler.deliver(&item).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Rejected { status: 500, ref body } if body == "error"
        ));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("error"));

        assert!(!handler.process(&item).await);
    }

    #[tokio::test]
    async fn test_upload_only_200_counts() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let item = write_item(temp_dir.path(), "to_paperless", "invoice.pdf").await;
        let handler = UploadHandler::new("paperless", &upload_config(mock_server.uri())).unwrap();

        assert!(!handler.process(&item).await);
    }

    #[tokio::test]
    async fn test_upload_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let temp_dir = TempDir::new().unwrap();
        let item = write_item(temp_dir.path(), "to_paperless", "invoice.pdf").await;
        let handler = UploadHandler::new("paperless", &upload_config(format!("http://{addr}"))).unwrap();

        assert!(!handler.process(&item).await);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let item = write_item(temp_dir.path(), "to_paperless", "invoice.pdf").await;
        std::fs::remove_file(&item.path).unwrap();

        let handler =
            UploadHandler::new("paperless", &upload_config("http://127.0.0.1:9".to_string()))
                .unwrap();

        assert!(matches!(
            handler.deliver(&item).await,
            Err(HandlerError::Io(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_url_and_path() {
        let handler = UploadHandler::new(
            "paperless",
            &upload_config("http://paperless:8000/".to_string()),
        )
        .unwrap();
        assert_eq!(
            handler.endpoint(),
            "http://paperless:8000/api/documents/post_document/"
        );
    }
}
