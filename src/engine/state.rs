//! Pipeline state: the file table, record store, admission counters and the current run.
//!
//! Owned exclusively by the event loop and mutated only inside [`dispatch`](super::dispatch).

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::types::{FileEntry, FileState, NameMap, Stage};
use crate::utils::config::{MAX_CONCURRENT_LOADS, SCHEDULER_BACKOFF};

use super::progress::{RunProgress, ScanProgress};
use super::store::RecordStore;

/// Historian connection as seen by the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Connection {
    Connecting,
    Connected(String),
    Unavailable(String),
}

/// One operator-triggered conversion run. Its presence is the start latch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessingRun {
    pub progress: RunProgress,
    /// Files admitted to a load slot during this run.
    pub admitted: usize,
    pub conversion_retry_pending: bool,
    pub insert_retry_pending: bool,
    /// Nothing left to load; set once so the status is reported once.
    pub loads_exhausted: bool,
    pub finished: bool,
}

/// Tunables for the schedulers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerLimits {
    pub max_concurrent_loads: usize,
    pub backoff: Duration,
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            max_concurrent_loads: MAX_CONCURRENT_LOADS,
            backoff: SCHEDULER_BACKOFF,
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    dir: PathBuf,
    entries: Vec<FileEntry>,
    pub store: RecordStore,
    pub in_flight_loads: usize,
    pub limits: SchedulerLimits,
    pub scan: ScanProgress,
    /// Discovery has reported, with or without files.
    pub discovered: bool,
    pub scan_reported: bool,
    pub run: Option<ProcessingRun>,
    pub status: Option<String>,
    pub connection: Connection,
    pub tag_map_path: Option<PathBuf>,
    pub name_map: Option<Arc<NameMap>>,
}

impl Pipeline {
    pub fn new(dir: impl Into<PathBuf>, tag_map_path: Option<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: Vec::new(),
            store: RecordStore::new(),
            in_flight_loads: 0,
            limits: SchedulerLimits::default(),
            scan: ScanProgress::default(),
            discovered: false,
            scan_reported: false,
            run: None,
            status: None,
            connection: Connection::Connecting,
            tag_map_path,
            name_map: None,
        }
    }

    pub fn with_limits(mut self, limits: SchedulerLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entries in display order (date ascending, undated last, discovery order on ties).
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> Option<&mut FileEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected(_))
    }

    pub fn run_started(&self) -> bool {
        self.run.is_some()
    }

    pub fn count_in(&self, state: &FileState) -> usize {
        self.entries.iter().filter(|e| &e.state == state).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.state.is_failed()).count()
    }

    /// Add a newly discovered file. Duplicate names are ignored.
    pub(crate) fn add_entry(&mut self, name: &str) -> bool {
        if self.entry(name).is_some() {
            warn!("Duplicate file name ignored: {}", name);
            return false;
        }
        let index = self.entries.len();
        self.entries.push(FileEntry::new(name, index));
        true
    }

    /// Move `name` one step forward to `to`. Refuses skipped, backward and `Failed` moves;
    /// failures go through [`Pipeline::fail`].
    pub(crate) fn advance(&mut self, name: &str, to: FileState) -> bool {
        let Some(entry) = self.entry_mut(name) else {
            warn!("No row for {}; dropping transition to {}", name, to.label());
            return false;
        };
        if entry.state.is_failed() || to.is_failed() || to.rank() != entry.state.rank() + 1 {
            warn!(
                "Refusing transition {} -> {} for {}",
                entry.state.label(),
                to.label(),
                name
            );
            return false;
        }
        debug!("{}: {} -> {}", name, entry.state.label(), to.label());
        entry.state = to;
        true
    }

    /// Record a stage failure. Completed and already-failed files are left alone.
    pub(crate) fn fail(&mut self, name: &str, stage: Stage, reason: String) -> bool {
        let Some(entry) = self.entry_mut(name) else {
            warn!("No row for {}; dropping {} failure: {}", name, stage, reason);
            return false;
        };
        if entry.state.is_failed() || entry.state == FileState::Completed {
            return false;
        }
        warn!("{} failed at {}: {}", name, stage, reason);
        entry.state = FileState::Failed { stage, reason };
        true
    }

    /// Re-sort rows by date. Stable, with discovery order as the explicit tie-breaker.
    pub(crate) fn sort_by_date(&mut self) {
        self.entries.sort_by(|a, b| {
            let key = |e: &FileEntry| (e.record_date.is_none(), e.record_date, e.discovery_index);
            key(a).cmp(&key(b))
        });
    }

    pub(crate) fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.status = Some(message);
    }

    /// Release one load admission slot.
    pub(crate) fn release_slot(&mut self) {
        if self.in_flight_loads == 0 {
            warn!("Load slot released with no loads in flight");
            return;
        }
        self.in_flight_loads -= 1;
    }
}
