use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::email::EmailHandler;
use super::traits::{FileHandler, HandlerError};
use super::upload::UploadHandler;
use crate::config::{Config, HandlerConfig};
use crate::mail::{MailError, MailTransport};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler not found: {0}")]
    NotFound(String),
    #[error("handler '{handler}' needs an [upload] section")]
    MissingUpload { handler: String },
    #[error("handler '{handler}' needs an [smtp] section")]
    MissingSmtp { handler: String },
    #[error("failed to build handler '{handler}': {source}")]
    Build {
        handler: String,
        #[source]
        source: HandlerError,
    },
    #[error("invalid address for handler '{handler}': {source}")]
    Address {
        handler: String,
        #[source]
        source: MailError,
    },
}

/// A source folder and the handlers that must all succeed for its files
#[derive(Clone)]
pub struct Binding {
    pub folder: String,
    pub handlers: Vec<Arc<dyn FileHandler>>,
}

impl Binding {
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}

/// Registry mapping handler names to handler instances
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn FileHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn FileHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn FileHandler>, RegistryError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Build every configured handler; email handlers share `mailer`
    pub fn from_config(
        config: &Config,
        mailer: Arc<dyn MailTransport>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for (name, handler_config) in &config.handlers {
            let handler: Arc<dyn FileHandler> = match handler_config {
                HandlerConfig::Upload => {
                    let upload =
                        config
                            .upload
                            .as_ref()
                            .ok_or_else(|| RegistryError::MissingUpload {
                                handler: name.clone(),
                            })?;
                    let handler = UploadHandler::new(name.clone(), upload).map_err(|source| {
                        RegistryError::Build {
                            handler: name.clone(),
                            source,
                        }
                    })?;
                    Arc::new(handler)
                }
                HandlerConfig::Email { to } => {
                    let smtp =
                        config
                            .smtp
                            .as_ref()
                            .ok_or_else(|| RegistryError::MissingSmtp {
                                handler: name.clone(),
                            })?;
                    let handler =
                        EmailHandler::new(name.clone(), mailer.clone(), smtp.sender(), to)
                            .map_err(|source| RegistryError::Address {
                                handler: name.clone(),
                                source,
                            })?;
                    Arc::new(handler)
                }
            };

            tracing::debug!(handler = %name, "Registered handler");
            registry.register(handler);
        }

        Ok(registry)
    }

    /// Resolve configured bindings to handler lists, keeping binding and handler order
    pub fn bindings(&self, config: &Config) -> Result<Vec<Binding>, RegistryError> {
        config
            .bindings
            .iter()
            .map(|binding| {
                let handlers = binding
                    .handlers
                    .iter()
                    .map(|name| self.get(name))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Binding {
                    folder: binding.folder.clone(),
                    handlers,
                })
            })
            .collect()
    }
}
