//! Historian collaborator: point lookup, tag validation and record insert.

pub mod archive;
pub mod tag_map;

use anyhow::Result;
use log::debug;

use crate::types::{FloatRecord, HistorianPoint, NameMap, PointCache, TagRecord};

pub use archive::CsvArchive;
pub use tag_map::load_name_map;

/// Remote side of the conversion.
pub trait Historian: Send + Sync {
    /// Human-readable target, e.g. host or archive directory.
    fn target(&self) -> String;
    /// Open the connection.
    fn connect(&self) -> Result<()>;
    /// Historian id of `point_name`, or `None` when it does not exist.
    fn lookup_point(&self, point_name: &str) -> Option<u32>;
    /// Write the records of one file. Returns the number written.
    fn insert(&self, file_name: &str, records: &[FloatRecord], points: &PointCache) -> Result<usize>;
}

/// Resolve tag names against the historian.
///
/// With a name map, tags missing from the map are skipped and mapped names are looked up.
/// Never fails: unresolved tags are simply left out of the cache and the count.
pub fn validate_tags(
    historian: &dyn Historian,
    tag_records: &[TagRecord],
    name_map: Option<&NameMap>,
) -> (PointCache, usize) {
    let mut cache = PointCache::new();
    let mut valid = 0;
    for tag in tag_records {
        let point_name = match name_map {
            Some(map) => match map.get(&tag.name) {
                Some(mapped) => mapped.as_str(),
                None => continue,
            },
            None => tag.name.as_str(),
        };
        if cache.contains(&tag.name) {
            continue;
        }
        let Some(point_id) = historian.lookup_point(point_name) else {
            debug!("Tag {} has no historian point {}", tag.name, point_name);
            continue;
        };
        cache.add(HistorianPoint {
            source_name: tag.name.clone(),
            source_id: tag.id,
            point_name: point_name.to_string(),
            point_id,
        });
        valid += 1;
    }
    (cache, valid)
}
