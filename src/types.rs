//! Public types shared by the engine, the collaborators and the UI.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Stage of the per-file lifecycle that produced a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Header,
    TagRecords,
    FloatHeader,
    Load,
    Insert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Header => "header",
            Stage::TagRecords => "tag records",
            Stage::FloatHeader => "float header",
            Stage::Load => "load",
            Stage::Insert => "insert",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of one discovered file.
///
/// States only move forward: `Pending → HeaderLoaded → TagsValidated → Loading → DataLoaded →
/// Inserting → Completed`. `Failed` absorbs any stage and is never left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileState {
    Pending,
    HeaderLoaded,
    TagsValidated,
    Loading,
    DataLoaded,
    Inserting,
    Completed,
    Failed { stage: Stage, reason: String },
}

impl FileState {
    /// Position along the forward transition graph. `Failed` ranks last.
    pub fn rank(&self) -> u8 {
        match self {
            FileState::Pending => 0,
            FileState::HeaderLoaded => 1,
            FileState::TagsValidated => 2,
            FileState::Loading => 3,
            FileState::DataLoaded => 4,
            FileState::Inserting => 5,
            FileState::Completed => 6,
            FileState::Failed { .. } => 7,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileState::Failed { .. })
    }

    /// Short label for the state column.
    pub fn label(&self) -> &'static str {
        match self {
            FileState::Pending => "Pending",
            FileState::HeaderLoaded => "Tags Loaded",
            FileState::TagsValidated => "Tags Valid",
            FileState::Loading => "Loading",
            FileState::DataLoaded => "Recs loaded",
            FileState::Inserting => "Inserting",
            FileState::Completed => "Completed",
            FileState::Failed { .. } => "Failed",
        }
    }
}

/// One row of the file table.
#[derive(Clone, Debug, PartialEq)]
pub struct FileEntry {
    /// File name, unique within the directory.
    pub name: String,
    pub selected: bool,
    pub state: FileState,
    /// Position in discovery order; tie-breaker for the date sort.
    pub discovery_index: usize,
    pub record_date: Option<NaiveDate>,
    pub tag_count: Option<usize>,
    pub valid_tag_count: Option<usize>,
    pub float_record_count: Option<usize>,
    /// Records the historian accepted for this file.
    pub records_written: Option<usize>,
    pub load_duration: Option<Duration>,
    pub insert_duration: Option<Duration>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, discovery_index: usize) -> Self {
        Self {
            name: name.into(),
            selected: true,
            state: FileState::Pending,
            discovery_index,
            record_date: None,
            tag_count: None,
            valid_tag_count: None,
            float_record_count: None,
            records_written: None,
            load_duration: None,
            insert_duration: None,
        }
    }

    /// Selected, validated and with a known record count: eligible for a load slot.
    pub fn ready_for_load(&self) -> bool {
        self.selected && self.state == FileState::TagsValidated && self.float_record_count.is_some()
    }

    /// Selected and fully loaded: eligible for the insert stage.
    pub fn ready_for_insert(&self) -> bool {
        self.selected && self.state == FileState::DataLoaded
    }
}

/// Tag descriptor read from a tag file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub id: u32,
}

/// Result of reading a tag file header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagHeader {
    pub tag_count: usize,
    pub date: Option<NaiveDate>,
}

/// One logged value from a float file.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatRecord {
    /// Index into the file's tag table ([`TagRecord::id`]).
    pub tag_id: u32,
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub status: char,
    pub marker: char,
}

/// Validated identity of a source tag on the historian.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistorianPoint {
    pub source_name: String,
    pub source_id: u32,
    /// Name on the historian (after name mapping).
    pub point_name: String,
    pub point_id: u32,
}

/// Per-file map from source tag name to validated historian point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointCache {
    by_name: HashMap<String, HistorianPoint>,
    by_id: HashMap<u32, String>,
}

impl PointCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, point: HistorianPoint) {
        self.by_id.insert(point.source_id, point.source_name.clone());
        self.by_name.insert(point.source_name.clone(), point);
    }

    pub fn get_by_source_name(&self, name: &str) -> Option<&HistorianPoint> {
        self.by_name.get(name)
    }

    pub fn get_by_source_id(&self, id: u32) -> Option<&HistorianPoint> {
        self.by_id.get(&id).and_then(|n| self.by_name.get(n))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Source tag name → historian tag name.
pub type NameMap = HashMap<String, String>;

/// Resolved run options: settings file first, then CLI flags on top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opts {
    /// Directory holding the datalog files.
    pub dir: PathBuf,
    /// Archive directory. When None, `dir.join(<package output dir name>)`.
    pub output: Option<PathBuf>,
    /// Optional source → historian tag name map (CSV).
    pub tag_map: Option<PathBuf>,
    /// Select everything, start automatically and exit when the run finishes.
    pub headless: bool,
    /// Debug-level logging for this crate.
    pub verbose: bool,
    /// Override executor thread count.
    pub workers: Option<usize>,
}

impl Opts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            output: None,
            tag_map: None,
            headless: false,
            verbose: false,
            workers: None,
        }
    }
}
