use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub upload: Option<UploadConfig>,
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Named handler instances, referenced from bindings
    #[serde(default)]
    pub handlers: HashMap<String, HandlerConfig>,
    /// Folder bindings, scanned in declaration order
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

/// Filesystem layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root holding the drop folders and the `done` tree
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("process_folder")
}

/// Poll loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Skip handlers that already delivered an unchanged file on a prior cycle
    #[serde(default = "default_remember_deliveries")]
    pub remember_deliveries: bool,
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            remember_deliveries: default_remember_deliveries(),
        }
    }
}

fn default_interval_secs() -> u64 {
    300
}

fn default_remember_deliveries() -> bool {
    true
}

/// Log file rotation period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
    #[serde(default)]
    pub rotation: LogRotation,
    /// Number of rotated files kept on disk
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
    /// Default filter directive, `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_name: default_log_file_name(),
            rotation: LogRotation::default(),
            max_files: default_max_log_files(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_file_name() -> String {
    "docrelay.log".to_string()
}

fn default_max_log_files() -> usize {
    3
}

fn default_log_filter() -> String {
    "docrelay=info".to_string()
}

/// Document upload endpoint (Paperless-style API)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Base URL, e.g. `https://paperless.local`
    pub url: String,
    #[serde(default = "default_upload_path")]
    pub path: String,
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
    /// API token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
}

impl UploadConfig {
    /// Full endpoint URL: base without trailing slash, followed by the path
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_upload_path() -> String {
    "/api/documents/post_document/".to_string()
}

fn default_upload_timeout_secs() -> u64 {
    10
}

/// SMTP relay shared by email handlers and the failure notifier
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    /// Sender address, defaults to `username`
    pub from: Option<String>,
    /// SMTP password (loaded from environment, not from config file)
    #[serde(skip)]
    pub password: Option<String>,
}

impl SmtpConfig {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

fn default_smtp_port() -> u16 {
    465
}

/// Failure notification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    pub error_recipient: Option<String>,
    #[serde(default = "default_notification_subject")]
    pub subject: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            error_recipient: None,
            subject: default_notification_subject(),
        }
    }
}

fn default_notification_subject() -> String {
    "File Processing Error".to_string()
}

/// Handler definition
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HandlerConfig {
    /// Upload to the `[upload]` endpoint
    Upload,
    /// Send as an attachment to `to` through the `[smtp]` relay
    Email { to: String },
}

/// Folder binding: source folder name and its required handlers, in order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BindingConfig {
    pub folder: String,
    pub handlers: Vec<String>,
}
