//! Per-file record store: transient parsing artifacts keyed by file name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{FloatRecord, PointCache, TagRecord};

/// Working data for one file in flight. Not shown in the UI.
#[derive(Clone, Debug, Default)]
pub struct FileArtifacts {
    pub tag_records: Arc<Vec<TagRecord>>,
    pub point_cache: Arc<PointCache>,
    /// Populated between the load and insert stages only.
    pub float_records: Option<Vec<FloatRecord>>,
    pub float_record_count: Option<usize>,
}

/// Artifacts for every file currently between tag-record read and insert completion.
#[derive(Debug, Default)]
pub struct RecordStore {
    files: HashMap<String, FileArtifacts>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace the tag records of) the entry for `name`. Resets the point cache.
    pub fn upsert_tag_records(&mut self, name: &str, records: Vec<TagRecord>) {
        let entry = self.files.entry(name.to_string()).or_default();
        entry.tag_records = Arc::new(records);
        entry.point_cache = Arc::new(PointCache::new());
    }

    pub fn set_point_cache(&mut self, name: &str, cache: Arc<PointCache>) {
        self.files.entry(name.to_string()).or_default().point_cache = cache;
    }

    pub fn set_float_record_count(&mut self, name: &str, count: usize) {
        if let Some(entry) = self.files.get_mut(name) {
            entry.float_record_count = Some(count);
        }
    }

    pub fn set_float_records(&mut self, name: &str, records: Vec<FloatRecord>) {
        if let Some(entry) = self.files.get_mut(name) {
            entry.float_records = Some(records);
        }
    }

    /// Move the float records out for the insert task; the point cache is shared.
    pub fn take_for_insert(&mut self, name: &str) -> Option<(Vec<FloatRecord>, Arc<PointCache>)> {
        let entry = self.files.get_mut(name)?;
        let records = entry.float_records.take()?;
        Some((records, Arc::clone(&entry.point_cache)))
    }

    /// Drop everything held for `name`.
    pub fn purge(&mut self, name: &str) -> Option<FileArtifacts> {
        self.files.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FileArtifacts> {
        self.files.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files currently holding float records in memory.
    pub fn resident_float_files(&self) -> usize {
        self.files
            .values()
            .filter(|a| a.float_records.is_some())
            .count()
    }
}
