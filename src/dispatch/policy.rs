use std::sync::Arc;
use tracing::{debug, error, warn};

use super::ledger::DeliveryLedger;
use crate::handlers::{FileHandler, FileItem};
use crate::notify::{FailureNotifier, NotifyError};

/// Result of one handler for one file in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Succeeded,
    Failed,
    /// Skipped, the handler delivered this unchanged file on an earlier cycle
    AlreadyDelivered,
}

impl HandlerOutcome {
    pub fn is_success(self) -> bool {
        !matches!(self, HandlerOutcome::Failed)
    }
}

/// Aggregate of all bound handlers for one file
#[derive(Debug, Default)]
pub struct DispatchResult {
    pub outcomes: Vec<(String, HandlerOutcome)>,
    pub notifications_sent: usize,
    pub notification_failures: Vec<NotifyError>,
}

impl DispatchResult {
    /// Strict AND: every bound handler has the file
    pub fn is_processed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|(_, o)| o.is_success())
    }

    pub fn failed_handlers(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == HandlerOutcome::Failed)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn invoked(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o != HandlerOutcome::AlreadyDelivered)
            .count()
    }
}

/// Runs a file through its bound handlers and notifies on each failure
pub struct Dispatcher {
    notifier: FailureNotifier,
    ledger: DeliveryLedger,
    remember_deliveries: bool,
}

impl Dispatcher {
    pub fn new(notifier: FailureNotifier, remember_deliveries: bool) -> Self {
        Self {
            notifier,
            ledger: DeliveryLedger::new(),
            remember_deliveries,
        }
    }

    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DeliveryLedger {
        &mut self.ledger
    }

    /// Invoke each handler in binding order
    ///
    /// Handlers run one after another; a failing handler does not stop the
    /// rest. Each failure triggers one notification. Notification errors are
    /// collected in the result and never abort the dispatch.
    pub async fn dispatch(
        &mut self,
        item: &FileItem,
        handlers: &[Arc<dyn FileHandler>],
    ) -> DispatchResult {
        let attempt = self.ledger.record_attempt(item);
        let already = if self.remember_deliveries {
            self.ledger.delivered(item)
        } else {
            Default::default()
        };

        debug!(file = %item.path.display(), attempt, handlers = handlers.len(), "Dispatching");

        let mut result = DispatchResult::default();
        for handler in handlers {
            let name = handler.name();

            if already.contains(name) {
                debug!(handler = name, file = %item.name, "Already delivered, skipping");
                result
                    .outcomes
                    .push((name.to_string(), HandlerOutcome::AlreadyDelivered));
                continue;
            }

            if handler.process(item).await {
                self.ledger.record_success(item, name);
                result
                    .outcomes
                    .push((name.to_string(), HandlerOutcome::Succeeded));
                continue;
            }

            result.outcomes.push((name.to_string(), HandlerOutcome::Failed));
            match self.notifier.notify(&item.name).await {
                Ok(()) => result.notifications_sent += 1,
                Err(e) => {
                    error!(handler = name, file = %item.name, error = %e, "Operator could not be notified");
                    result.notification_failures.push(e);
                }
            }
        }

        if !result.is_processed() {
            warn!(
                file = %item.path.display(),
                failed = ?result.failed_handlers(),
                attempt,
                pending_since = ?self.ledger.pending_since(item),
                "File left in place for retry"
            );
        }

        result
    }
}
