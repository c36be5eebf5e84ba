//! Poll cycle: scan every bound folder, dispatch, relocate

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::scan::scan_folder;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::handlers::{Binding, FileItem, HandlerRegistry, RegistryError};
use crate::mail::{MailError, MailTransport};
use crate::notify::FailureNotifier;
use crate::observability::Metrics;
use crate::relocate::Relocator;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failure notifier: {0}")]
    Notifier(#[from] MailError),

    #[error("failure notifications need an [smtp] section")]
    MissingSmtp,

    #[error("failure notifications need notifier.error_recipient")]
    MissingErrorRecipient,
}

/// Counters for one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub folders_scanned: usize,
    pub scan_failures: usize,
    pub files_seen: usize,
    pub files_relocated: usize,
    pub files_pending: usize,
    pub files_vanished: usize,
    pub files_stranded: usize,
    pub notifications_sent: usize,
    pub notification_failures: usize,
    pub relocation_failures: usize,
}

impl CycleReport {
    /// No error that needs an operator: notifications went out and nothing got stuck
    pub fn is_clean(&self) -> bool {
        self.scan_failures == 0 && self.notification_failures == 0 && self.relocation_failures == 0
    }
}

/// Scans bound folders and dispatches their files
pub struct Poller {
    root: PathBuf,
    bindings: Vec<Binding>,
    dispatcher: Dispatcher,
    relocator: Relocator,
    interval: Duration,
    metrics: Metrics,
}

impl Poller {
    pub fn new(
        root: impl Into<PathBuf>,
        bindings: Vec<Binding>,
        dispatcher: Dispatcher,
        interval: Duration,
    ) -> Self {
        let root = root.into();
        Self {
            relocator: Relocator::new(root.clone()),
            root,
            bindings,
            dispatcher,
            interval,
            metrics: Metrics::new(),
        }
    }

    /// Wire handlers, notifier and bindings from a validated config
    pub fn from_config(
        config: &Config,
        mailer: Arc<dyn MailTransport>,
    ) -> Result<Self, BuildError> {
        let smtp = config.smtp.as_ref().ok_or(BuildError::MissingSmtp)?;
        let recipient = config
            .notifier
            .error_recipient
            .as_deref()
            .ok_or(BuildError::MissingErrorRecipient)?;

        let notifier = FailureNotifier::new(
            mailer.clone(),
            smtp.sender(),
            recipient,
            config.notifier.subject.clone(),
        )?;
        let registry = HandlerRegistry::from_config(config, mailer)?;
        let bindings = registry.bindings(config)?;

        for binding in &bindings {
            info!(
                folder = %binding.folder,
                handlers = ?binding.handler_names(),
                "Registered binding"
            );
        }

        Ok(Self::new(
            config.paths.root.clone(),
            bindings,
            Dispatcher::new(notifier, config.poller.remember_deliveries),
            config.poller.interval(),
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// One full pass over all bound folders, in binding order
    pub async fn run_cycle(&mut self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", id = %cycle_id);
        let report = self.cycle(cycle_id).instrument(span).await;

        self.metrics.cycle_completed();
        report
    }

    async fn cycle(&mut self, cycle_id: Uuid) -> CycleReport {
        let mut report = CycleReport {
            cycle_id,
            ..CycleReport::default()
        };
        let mut seen = HashSet::new();
        let mut unscanned = Vec::new();

        for binding in &self.bindings {
            let folder = self.root.join(&binding.folder);
            let items = match scan_folder(&folder).await {
                Ok(items) => items,
                Err(e) => {
                    error!(folder = %folder.display(), error = %e, "Scan failed");
                    report.scan_failures += 1;
                    unscanned.push(folder);
                    continue;
                }
            };

            report.folders_scanned += 1;
            debug!(folder = %binding.folder, files = items.len(), "Scanned folder");

            for item in items {
                report.files_seen += 1;
                seen.insert(item.path.clone());
                handle_item(
                    &mut self.dispatcher,
                    &self.relocator,
                    &self.metrics,
                    binding,
                    &item,
                    &mut report,
                )
                .await;
            }
        }

        self.dispatcher.ledger_mut().retain_seen(&seen, &unscanned);

        info!(
            folders = report.folders_scanned,
            seen = report.files_seen,
            relocated = report.files_relocated,
            pending = report.files_pending,
            vanished = report.files_vanished,
            stranded = report.files_stranded,
            notification_failures = report.notification_failures,
            relocation_failures = report.relocation_failures,
            "Cycle complete"
        );
        report
    }

    /// Run cycles every interval until `shutdown` resolves
    ///
    /// Shutdown is only observed between cycles; a running cycle is never
    /// interrupted.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(root = %self.root.display(), interval_secs = self.interval.as_secs(), "Poller started");

        loop {
            let report = self.run_cycle().await;
            if !report.is_clean() {
                error!(?report, "Cycle finished with errors that need attention");
            }
            debug!(metrics = ?self.metrics.snapshot(), "Totals");

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, poller stopping");
                    break;
                }
            }
        }
    }

    /// Run until Ctrl+C or SIGTERM
    pub async fn run_forever(&mut self) {
        self.run_until(shutdown_signal()).await
    }
}

async fn handle_item(
    dispatcher: &mut Dispatcher,
    relocator: &Relocator,
    metrics: &Metrics,
    binding: &Binding,
    item: &FileItem,
    report: &mut CycleReport,
) {
    if dispatcher.ledger().is_stranded(item) {
        warn!(file = %item.path.display(), "Skipping file that could not be moved to done earlier");
        report.files_stranded += 1;
        return;
    }

    // Snapshot may be stale by now
    match tokio::fs::try_exists(&item.path).await {
        Ok(true) => {}
        Ok(false) => {
            info!(file = %item.path.display(), "File vanished before dispatch");
            report.files_vanished += 1;
            return;
        }
        Err(e) => {
            warn!(file = %item.path.display(), error = %e, "Could not check file before dispatch, dispatching anyway");
        }
    }

    let result = dispatcher.dispatch(item, &binding.handlers).await;
    report.notifications_sent += result.notifications_sent;
    report.notification_failures += result.notification_failures.len();
    metrics.handler_failed(result.failed_handlers().len() as u64);
    metrics.notification_failed(result.notification_failures.len() as u64);

    if !result.is_processed() {
        report.files_pending += 1;
        return;
    }

    match relocator.relocate(item).await {
        Ok(_) => {
            dispatcher.ledger_mut().forget(&item.path);
            metrics.file_relocated();
            report.files_relocated += 1;
        }
        Err(e) => {
            error!(file = %item.path.display(), error = %e, "Delivered but could not be moved to done");
            dispatcher.ledger_mut().mark_stranded(item);
            metrics.relocation_failed();
            report.relocation_failures += 1;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
