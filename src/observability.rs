//! Observability: log sinks and cycle counters

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogRotation, LoggingConfig};

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to create log directory: {0}")]
    Directory(#[from] std::io::Error),

    #[error("failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Install console and rotating-file logging
///
/// `RUST_LOG` overrides the configured filter. Keep the returned guard alive
/// for the lifetime of the process, dropping it flushes the file writer.
pub fn init_tracing(config: &LoggingConfig) -> Result<WorkerGuard, ObservabilityError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    std::fs::create_dir_all(&config.directory)?;
    let appender = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.file_name)
        .max_log_files(config.max_files.max(1))
        .build(&config.directory)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .try_init()?;

    Ok(guard)
}

/// Cumulative counters across poll cycles
#[derive(Debug, Default)]
pub struct Metrics {
    cycles: AtomicU64,
    files_relocated: AtomicU64,
    handler_failures: AtomicU64,
    notifications_failed: AtomicU64,
    relocation_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_completed(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "cycles", "Metric incremented");
    }

    pub fn file_relocated(&self) {
        self.files_relocated.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "files_relocated", "Metric incremented");
    }

    pub fn handler_failed(&self, count: u64) {
        self.handler_failures.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "handler_failures", count, "Metric incremented");
    }

    pub fn notification_failed(&self, count: u64) {
        self.notifications_failed.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "notifications_failed", count, "Metric incremented");
    }

    pub fn relocation_failed(&self) {
        self.relocation_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "relocation_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            files_relocated: self.files_relocated.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            relocation_failures: self.relocation_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub files_relocated: u64,
    pub handler_failures: u64,
    pub notifications_failed: u64,
    pub relocation_failures: u64,
}
