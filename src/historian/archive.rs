//! Local historian: one CSV per converted file, written through a temp file and renamed.

use anyhow::{Context, Result};
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::types::{FloatRecord, PointCache};

use super::Historian;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Archive rooted at `dir`. Any non-blank point name is accepted and given a stable id.
pub struct CsvArchive {
    dir: PathBuf,
    points: Mutex<HashMap<String, u32>>,
}

impl CsvArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            points: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output path for a source file: `X (Float).DAT` → `dir/X (Float).csv`.
    pub fn output_path_for(&self, file_name: &str) -> PathBuf {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        self.dir.join(format!("{stem}.csv"))
    }
}

/// Temporary sibling of `path`, renamed over it once complete.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("archive.csv");
    path.parent()
        .unwrap_or(Path::new("."))
        .join(format!("{name}.tmp"))
}

fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "atomic rename temp archive to final path ({} -> {})",
            temp_path.display(),
            final_path.display()
        )
    })
}

impl Historian for CsvArchive {
    fn target(&self) -> String {
        format!("archive {}", self.dir.display())
    }

    fn connect(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create archive directory {}", self.dir.display()))
    }

    fn lookup_point(&self, point_name: &str) -> Option<u32> {
        let name = point_name.trim();
        if name.is_empty() {
            return None;
        }
        let mut points = match self.points.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = points.len() as u32 + 1;
        Some(*points.entry(name.to_string()).or_insert(next))
    }

    fn insert(&self, file_name: &str, records: &[FloatRecord], points: &PointCache) -> Result<usize> {
        let final_path = self.output_path_for(file_name);
        let temp_path = temp_path_for(&final_path);
        let result = write_records(&temp_path, records, points)
            .and_then(|written| rename_temp_to_final(&temp_path, &final_path).map(|()| written));
        if result.is_err() {
            remove_stale_temp(&temp_path);
        }
        result
    }
}

/// Write the CSV for one file to `temp_path`. Records without a validated point are skipped.
fn write_records(temp_path: &Path, records: &[FloatRecord], points: &PointCache) -> Result<usize> {
    let mut writer = csv::Writer::from_path(temp_path)
        .with_context(|| format!("create {}", temp_path.display()))?;
    writer.write_record(["point", "point_id", "timestamp", "value", "status"])?;

    let mut written = 0;
    for record in records {
        let Some(point) = points.get_by_source_id(record.tag_id) else {
            continue;
        };
        let point_id = point.point_id.to_string();
        let timestamp = record.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let value = record.value.to_string();
        let status = record.status.to_string();
        writer.write_record([
            point.point_name.as_str(),
            point_id.as_str(),
            timestamp.as_str(),
            value.as_str(),
            status.as_str(),
        ])?;
        written += 1;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", temp_path.display()))?;
    Ok(written)
}

/// A failed insert leaves no partial archive behind.
fn remove_stale_temp(temp_path: &Path) {
    if !temp_path.exists() {
        return;
    }
    if let Err(err) = fs::remove_file(temp_path) {
        warn!("Could not remove {}: {}", temp_path.display(), err);
    }
}
