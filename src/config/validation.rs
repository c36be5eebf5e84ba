use super::models::{Config, HandlerConfig};
use lettre::Address;
use std::collections::HashSet;
use std::path::{Component, Path};
use thiserror::Error;

use crate::relocate::DONE_DIR;

const MIN_ADDRESS_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No folder bindings configured")]
    NoBindingsConfigured,

    #[error("Binding for folder '{folder}' has no handlers")]
    EmptyBinding { folder: String },

    #[error("Binding for folder '{folder}' references unknown handler '{handler}'")]
    UnknownHandlerReference { folder: String, handler: String },

    #[error("Folder '{folder}' is bound more than once")]
    DuplicateFolder { folder: String },

    #[error("Invalid folder name '{folder}': must be a single path segment other than 'done'")]
    InvalidFolderName { folder: String },

    #[error("Invalid email address for {field}: '{value}'")]
    InvalidEmail { field: String, value: String },

    #[error("SMTP settings are required for failure notifications")]
    MissingSmtpConfig,

    #[error("SMTP password missing (set DOCRELAY_SMTP_PASSWORD or SMTP_PWD)")]
    MissingSmtpPassword,

    #[error("No error recipient configured for failure notifications")]
    MissingErrorRecipient,

    #[error("Handler '{handler}' is an upload handler but no [upload] section is configured")]
    MissingUploadConfig { handler: String },

    #[error("Upload token missing (set DOCRELAY_UPLOAD_TOKEN or PAPERLESS_API_TOKEN)")]
    MissingUploadToken,

    #[error("Invalid upload URL scheme '{url}', expected 'http://' or 'https://'")]
    InvalidUploadUrl { url: String },

    #[error("Poll interval must be positive")]
    InvalidPollInterval,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_bindings(config)?;
    validate_handlers(config)?;
    validate_smtp(config)?;
    validate_notifier(config)?;
    validate_poller(config)?;
    Ok(())
}

/// Every binding names a plain, unique folder and only known handlers
fn validate_bindings(config: &Config) -> Result<(), ValidationError> {
    if config.bindings.is_empty() {
        return Err(ValidationError::NoBindingsConfigured);
    }

    let mut seen = HashSet::new();
    for binding in &config.bindings {
        if !is_plain_segment(&binding.folder) || binding.folder == DONE_DIR {
            return Err(ValidationError::InvalidFolderName {
                folder: binding.folder.clone(),
            });
        }

        if !seen.insert(binding.folder.as_str()) {
            return Err(ValidationError::DuplicateFolder {
                folder: binding.folder.clone(),
            });
        }

        if binding.handlers.is_empty() {
            return Err(ValidationError::EmptyBinding {
                folder: binding.folder.clone(),
            });
        }

        for handler in &binding.handlers {
            if !config.handlers.contains_key(handler) {
                return Err(ValidationError::UnknownHandlerReference {
                    folder: binding.folder.clone(),
                    handler: handler.clone(),
                });
            }
        }
    }

    Ok(())
}

fn is_plain_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Upload handlers need the upload endpoint and token, email handlers a valid recipient
fn validate_handlers(config: &Config) -> Result<(), ValidationError> {
    let mut names: Vec<&String> = config.handlers.keys().collect();
    names.sort();

    for name in names {
        match &config.handlers[name] {
            HandlerConfig::Upload => {
                let upload =
                    config
                        .upload
                        .as_ref()
                        .ok_or_else(|| ValidationError::MissingUploadConfig {
                            handler: name.clone(),
                        })?;

                if !upload.url.starts_with("http://") && !upload.url.starts_with("https://") {
                    return Err(ValidationError::InvalidUploadUrl {
                        url: upload.url.clone(),
                    });
                }

                if upload.token.as_deref().is_none_or(str::is_empty) {
                    return Err(ValidationError::MissingUploadToken);
                }
            }
            HandlerConfig::Email { to } => {
                validate_address(&format!("handlers.{name}.to"), to)?;
            }
        }
    }

    Ok(())
}

fn validate_smtp(config: &Config) -> Result<(), ValidationError> {
    let smtp = config
        .smtp
        .as_ref()
        .ok_or(ValidationError::MissingSmtpConfig)?;

    validate_address("smtp.username", &smtp.username)?;
    if let Some(from) = &smtp.from {
        validate_address("smtp.from", from)?;
    }

    if smtp.password.as_deref().is_none_or(str::is_empty) {
        return Err(ValidationError::MissingSmtpPassword);
    }

    Ok(())
}

fn validate_notifier(config: &Config) -> Result<(), ValidationError> {
    let recipient = config
        .notifier
        .error_recipient
        .as_ref()
        .ok_or(ValidationError::MissingErrorRecipient)?;

    validate_address("notifier.error_recipient", recipient)
}

fn validate_poller(config: &Config) -> Result<(), ValidationError> {
    if config.poller.interval_secs == 0 {
        return Err(ValidationError::InvalidPollInterval);
    }
    Ok(())
}

fn validate_address(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.len() < MIN_ADDRESS_LEN || value.parse::<Address>().is_err() {
        return Err(ValidationError::InvalidEmail {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}
