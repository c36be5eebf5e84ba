//! File handlers
//!
//! A handler delivers one file to one external system and reports whether
//! it succeeded. Each watched folder is bound to an ordered list of handlers.
//!
//! ## Key Components
//!
//! - [`FileHandler`] - Delivery trait, `process(file) -> bool`
//! - [`UploadHandler`] - Multipart POST to a document API
//! - [`EmailHandler`] - File as attachment through the SMTP relay
//! - [`HandlerRegistry`] - Builds handlers from config and resolves bindings
//! - [`FileItem`] - A file found during a scan
//!
//! ## Example
//!
//! ```rust,ignore
//! use docrelay::handlers::HandlerRegistry;
//!
//! let registry = HandlerRegistry::from_config(&config, mailer)?;
//! for binding in registry.bindings(&config)? {
//!     for handler in &binding.handlers {
//!         handler.process(&item).await;
//!     }
//! }
//! ```

mod email;
mod registry;
mod traits;
mod types;
mod upload;

pub use email::EmailHandler;
pub use registry::{Binding, HandlerRegistry, RegistryError};
pub use traits::{FileHandler, HandlerError};
pub use types::FileItem;
pub use upload::UploadHandler;
