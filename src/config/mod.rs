//! Configuration management for docrelay
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use docrelay::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Watching folders under: {}", config.paths.root.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `DOCRELAY__<section>__<key>`
//!
//! Examples:
//! - `DOCRELAY__PATHS__ROOT=/srv/scans`
//! - `DOCRELAY__POLLER__INTERVAL_SECS=60`
//! - `DOCRELAY__SMTP__HOST=smtp.example.com`
//!
//! Secrets are read from the environment only:
//! - upload token: `DOCRELAY_UPLOAD_TOKEN` (or `PAPERLESS_API_TOKEN`)
//! - SMTP password: `DOCRELAY_SMTP_PASSWORD` (or `SMTP_PWD`)
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/docrelay.toml`.
//! This can be overridden using `--config` or the `DOCRELAY_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    BindingConfig, Config, HandlerConfig, LogRotation, LoggingConfig, NotifierConfig,
    PathsConfig, PollerConfig, SmtpConfig, UploadConfig,
};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// `path` takes precedence over `DOCRELAY_CONFIG` and the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (unknown handlers, bad addresses, missing secrets, etc.)
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, without secrets from the environment
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Re-run validation, e.g. after filling in secrets by hand
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
