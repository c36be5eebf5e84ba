//! In-memory delivery ledger
//!
//! Remembers which handlers already delivered a file so the next cycle only
//! retries the ones that failed. Records are keyed by path and invalidated
//! when the file's size or modification time changes. Nothing is persisted:
//! after a restart every pending file is dispatched from scratch.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::handlers::FileItem;

#[derive(Debug, Clone)]
struct DeliveryRecord {
    size: u64,
    modified: Option<SystemTime>,
    delivered: BTreeSet<String>,
    attempts: u32,
    first_seen: DateTime<Utc>,
    stranded: bool,
}

impl DeliveryRecord {
    fn new(item: &FileItem) -> Self {
        Self {
            size: item.size,
            modified: item.modified,
            delivered: BTreeSet::new(),
            attempts: 0,
            first_seen: Utc::now(),
            stranded: false,
        }
    }

    fn matches(&self, item: &FileItem) -> bool {
        self.size == item.size && self.modified == item.modified
    }
}

#[derive(Debug, Default)]
pub struct DeliveryLedger {
    records: HashMap<PathBuf, DeliveryRecord>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, item: &FileItem) -> &mut DeliveryRecord {
        let record = self
            .records
            .entry(item.path.clone())
            .or_insert_with(|| DeliveryRecord::new(item));
        if !record.matches(item) {
            tracing::debug!(file = %item.path.display(), "File changed since last attempt, resetting record");
            *record = DeliveryRecord::new(item);
        }
        record
    }

    fn current(&self, item: &FileItem) -> Option<&DeliveryRecord> {
        self.records.get(&item.path).filter(|r| r.matches(item))
    }

    /// Handlers that already delivered this unchanged file
    pub fn delivered(&self, item: &FileItem) -> BTreeSet<String> {
        self.current(item)
            .map(|r| r.delivered.clone())
            .unwrap_or_default()
    }

    /// Count a dispatch attempt, returning the attempt number
    pub fn record_attempt(&mut self, item: &FileItem) -> u32 {
        let record = self.entry(item);
        record.attempts += 1;
        record.attempts
    }

    pub fn record_success(&mut self, item: &FileItem, handler: &str) {
        self.entry(item).delivered.insert(handler.to_string());
    }

    /// When this version of the file was first dispatched
    pub fn pending_since(&self, item: &FileItem) -> Option<DateTime<Utc>> {
        self.current(item).map(|r| r.first_seen)
    }

    /// Mark a file whose relocation failed; it is not dispatched again until it changes
    pub fn mark_stranded(&mut self, item: &FileItem) {
        self.entry(item).stranded = true;
    }

    pub fn is_stranded(&self, item: &FileItem) -> bool {
        self.current(item).is_some_and(|r| r.stranded)
    }

    pub fn forget(&mut self, path: &Path) {
        self.records.remove(path);
    }

    /// Drop records for files that were not seen in the latest scan
    ///
    /// Records for files inside `unscanned` folders are kept, since their
    /// absence from `seen` says nothing about the files.
    pub fn retain_seen(&mut self, seen: &HashSet<PathBuf>, unscanned: &[PathBuf]) {
        self.records.retain(|path, _| {
            seen.contains(path)
                || path
                    .parent()
                    .is_some_and(|dir| unscanned.iter().any(|u| u == dir))
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
