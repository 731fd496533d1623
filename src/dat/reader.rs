//! Datalog directory reader: `(Float).DAT` / `(Tagname).DAT` table pairs.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime, Timelike};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::{FloatRecord, TagHeader, TagRecord};
use crate::utils::config::DatNaming;

use super::dbf::{DbfField, DbfHeader, field_str};

/// File-reader collaborator. Files are identified by their float-file name.
pub trait DatSource: Send + Sync {
    fn discover(&self) -> Result<Vec<String>>;
    fn read_tag_header(&self, name: &str) -> Result<TagHeader>;
    fn read_tag_records(&self, name: &str, tag_count: usize) -> Result<Vec<TagRecord>>;
    fn read_float_header(&self, name: &str) -> Result<usize>;
    fn read_float_records(&self, name: &str, record_count: usize) -> Result<Vec<FloatRecord>>;
}

/// Reads datalog pairs from one directory (non-recursive).
pub struct DatDirectory {
    dir: PathBuf,
}

impl DatDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn float_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn tag_path(&self, name: &str) -> PathBuf {
        self.dir.join(tag_file_name(name))
    }
}

/// `"2024 01 15 0000 (Float).DAT"` → `"2024 01 15 0000 (Tagname).DAT"`.
pub fn tag_file_name(float_name: &str) -> String {
    float_name.replacen(DatNaming::FLOAT_MARKER, DatNaming::TAG_MARKER, 1)
}

/// True for `... (Float).DAT`, extension case-insensitive.
pub fn is_float_file(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    ext.eq_ignore_ascii_case(DatNaming::EXTENSION) && stem.contains(DatNaming::FLOAT_MARKER)
}

/// Log date from the `YYYY MM DD` prefix of a file name, if present.
pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let prefix = name.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y %m %d").ok()
}

impl DatSource for DatDirectory {
    fn discover(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            bail!("{} is not a directory", self.dir.display());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("list {}", self.dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && is_float_file(name)
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        debug!("Discovered {} float files in {}", names.len(), self.dir.display());
        Ok(names)
    }

    fn read_tag_header(&self, name: &str) -> Result<TagHeader> {
        let header = DbfHeader::read(&self.tag_path(name))?;
        Ok(TagHeader {
            tag_count: header.record_count,
            date: date_from_file_name(name),
        })
    }

    fn read_tag_records(&self, name: &str, tag_count: usize) -> Result<Vec<TagRecord>> {
        let path = self.tag_path(name);
        let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let header = DbfHeader::parse(&bytes)?;
        let name_field = header.require_field("Tagname")?;
        let index_field = header.require_field("TTagIndex")?;

        let mut records = Vec::with_capacity(tag_count);
        for record in header.records(&bytes, tag_count)? {
            let tag_name = field_str(record, name_field);
            if tag_name.is_empty() {
                continue;
            }
            let id = field_str(record, index_field)
                .parse::<u32>()
                .with_context(|| format!("bad tag index for {tag_name} in {}", path.display()))?;
            records.push(TagRecord {
                name: tag_name.into_owned(),
                id,
            });
        }
        Ok(records)
    }

    fn read_float_header(&self, name: &str) -> Result<usize> {
        Ok(DbfHeader::read(&self.float_path(name))?.record_count)
    }

    fn read_float_records(&self, name: &str, record_count: usize) -> Result<Vec<FloatRecord>> {
        let path = self.float_path(name);
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        // Read-only mapping of a file we never write.
        let mmap = unsafe { Mmap::map(&file)? };
        let header = DbfHeader::parse(&mmap)?;
        let fields = FloatFields::resolve(&header)?;

        let mut records = Vec::with_capacity(record_count.min(header.record_count));
        for (index, record) in header.records(&mmap, record_count)?.enumerate() {
            let decoded = fields
                .decode(record)
                .with_context(|| format!("record {index} of {}", path.display()))?;
            records.push(decoded);
        }
        Ok(records)
    }
}

/// Float table columns, resolved once per file.
struct FloatFields<'h> {
    date: &'h DbfField,
    time: &'h DbfField,
    millis: Option<&'h DbfField>,
    tag_index: &'h DbfField,
    value: &'h DbfField,
    status: Option<&'h DbfField>,
    marker: Option<&'h DbfField>,
}

impl<'h> FloatFields<'h> {
    fn resolve(header: &'h DbfHeader) -> Result<Self> {
        Ok(Self {
            date: header.require_field("Date")?,
            time: header.require_field("Time")?,
            millis: header.field("Millitm"),
            tag_index: header.require_field("TagIndex")?,
            value: header.require_field("Value")?,
            status: header.field("Status"),
            marker: header.field("Marker"),
        })
    }

    fn decode(&self, record: &[u8]) -> Result<FloatRecord> {
        let date_str = field_str(record, self.date);
        let date = NaiveDate::parse_from_str(&date_str, "%Y%m%d")
            .with_context(|| format!("bad date {date_str:?}"))?;
        let time_str = field_str(record, self.time);
        let mut time = NaiveTime::parse_from_str(&time_str, "%H:%M:%S")
            .with_context(|| format!("bad time {time_str:?}"))?;
        if let Some(field) = self.millis {
            let ms = field_str(record, field).parse::<u32>().unwrap_or(0).min(999);
            time = time.with_nanosecond(ms * 1_000_000).unwrap_or(time);
        }
        let tag_str = field_str(record, self.tag_index);
        let tag_id = tag_str
            .parse::<u32>()
            .with_context(|| format!("bad tag index {tag_str:?}"))?;
        let value_str = field_str(record, self.value);
        let value = value_str
            .parse::<f64>()
            .with_context(|| format!("bad value {value_str:?}"))?;
        let first_char = |f: Option<&DbfField>| {
            f.and_then(|f| field_str(record, f).chars().next())
                .unwrap_or(' ')
        };
        Ok(FloatRecord {
            tag_id,
            timestamp: date.and_time(time),
            value,
            status: first_char(self.status),
            marker: first_char(self.marker),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_file_name() {
        assert_eq!(
            tag_file_name("2024 01 15 0000 (Float).DAT"),
            "2024 01 15 0000 (Tagname).DAT"
        );
    }

    #[test]
    fn test_is_float_file() {
        assert!(is_float_file("2024 01 15 0000 (Float).DAT"));
        assert!(is_float_file("x (Float).dat"));
        assert!(!is_float_file("2024 01 15 0000 (Tagname).DAT"));
        assert!(!is_float_file("notes (Float).txt"));
        assert!(!is_float_file("(Float)"));
    }

    #[test]
    fn test_date_from_file_name() {
        assert_eq!(
            date_from_file_name("2024 01 15 0000 (Float).DAT"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(date_from_file_name("plant (Float).DAT"), None);
        assert_eq!(date_from_file_name("short"), None);
    }
}
