use anyhow::Result;
use dat2hist::historian::{CsvArchive, Historian, load_name_map, validate_tags};
use dat2hist::types::{FloatRecord, HistorianPoint, NameMap, PointCache, TagRecord};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Historian that knows a fixed set of point names.
struct Known(HashSet<&'static str>);

impl Historian for Known {
    fn target(&self) -> String {
        "known".into()
    }
    fn connect(&self) -> Result<()> {
        Ok(())
    }
    fn lookup_point(&self, point_name: &str) -> Option<u32> {
        self.0.contains(point_name).then_some(point_name.len() as u32)
    }
    fn insert(&self, _: &str, records: &[FloatRecord], _: &PointCache) -> Result<usize> {
        Ok(records.len())
    }
}

fn tags(names: &[&str]) -> Vec<TagRecord> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| TagRecord {
            name: n.to_string(),
            id: i as u32,
        })
        .collect()
}

// --- tag validation ---

#[test]
fn test_unknown_points_excluded() {
    let historian = Known(["A", "C"].into_iter().collect());
    let (cache, valid) = validate_tags(&historian, &tags(&["A", "B", "C"]), None);
    assert_eq!(valid, 2);
    assert!(cache.contains("A"));
    assert!(!cache.contains("B"));
    assert_eq!(cache.get_by_source_id(2).unwrap().source_name, "C");
}

#[test]
fn test_name_map_limits_and_renames() {
    let historian = Known(["plant.a", "plant.b", "A", "B", "C", "D", "E"].into_iter().collect());
    let map: NameMap = [("A", "plant.a"), ("B", "plant.b")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let (cache, valid) = validate_tags(&historian, &tags(&["A", "B", "C", "D", "E"]), Some(&map));
    assert_eq!(valid, 2);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get_by_source_name("B").unwrap().point_name, "plant.b");
}

#[test]
fn test_duplicate_tag_counted_once() {
    let historian = Known(["A"].into_iter().collect());
    let (cache, valid) = validate_tags(&historian, &tags(&["A", "A"]), None);
    assert_eq!(valid, 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_zero_valid_is_not_an_error() {
    let historian = Known(HashSet::new());
    let (cache, valid) = validate_tags(&historian, &tags(&["A"]), None);
    assert_eq!(valid, 0);
    assert!(cache.is_empty());
}

// --- CSV archive ---

fn one_point() -> PointCache {
    let mut cache = PointCache::new();
    cache.add(HistorianPoint {
        source_name: "A".into(),
        source_id: 0,
        point_name: "plant.a".into(),
        point_id: 1,
    });
    cache
}

fn samples() -> Vec<FloatRecord> {
    let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_milli_opt(8, 30, 0, 250)
        .unwrap();
    [(0, 1.5), (7, 2.0), (0, 3.25)]
        .into_iter()
        .map(|(tag_id, value)| FloatRecord {
            tag_id,
            timestamp: ts,
            value,
            status: 'U',
            marker: 'B',
        })
        .collect()
}

#[test]
fn test_output_path_for() {
    let archive = CsvArchive::new("/out");
    assert_eq!(
        archive.output_path_for("2024 01 15 0000 (Float).DAT"),
        PathBuf::from("/out/2024 01 15 0000 (Float).csv")
    );
}

#[test]
fn test_lookup_point_stable_ids() {
    let archive = CsvArchive::new("/out");
    let a = archive.lookup_point("A").unwrap();
    let b = archive.lookup_point("B").unwrap();
    assert_ne!(a, b);
    assert_eq!(archive.lookup_point(" A "), Some(a));
    assert_eq!(archive.lookup_point("  "), None);
}

#[test]
fn test_insert_writes_validated_points_only() {
    let dir = tempfile::tempdir().unwrap();
    let archive = CsvArchive::new(dir.path());
    archive.connect().unwrap();
    let name = "2024 01 15 0000 (Float).DAT";
    assert_eq!(archive.insert(name, &samples(), &one_point()).unwrap(), 2);

    let mut reader = csv::Reader::from_path(archive.output_path_for(name)).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "plant.a");
    assert_eq!(&rows[0][2], "2024-01-15 08:30:00.250");
    assert_eq!(&rows[1][3], "3.25");
}

#[test]
fn test_failed_insert_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let archive = CsvArchive::new(dir.path());
    let name = "2024 01 15 0000 (Float).DAT";
    // A directory in the way makes the final rename fail.
    let final_path = archive.output_path_for(name);
    std::fs::create_dir(&final_path).unwrap();

    assert!(archive.insert(name, &samples(), &one_point()).is_err());
    let temp = dir.path().join("2024 01 15 0000 (Float).csv.tmp");
    assert!(!temp.exists());
    assert!(final_path.is_dir());
}

#[test]
fn test_insert_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let archive = CsvArchive::new(dir.path().join("never-created"));
    assert!(archive.insert("a (Float).DAT", &samples(), &one_point()).is_err());
}

// --- tag map ---

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn test_tag_map_with_header_and_comments() {
    let f = write_csv("Source,Target\n# comment\nA, plant.a\nB,plant.b,extra\n\n");
    let map = load_name_map(f.path()).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["A"], "plant.a");
    assert_eq!(map["B"], "plant.b");
}

#[test]
fn test_tag_map_single_column_row_is_an_error() {
    let f = write_csv("A,plant.a\nlonely\n");
    assert!(load_name_map(f.path()).is_err());
}

#[test]
fn test_tag_map_missing_file_is_an_error() {
    assert!(load_name_map(Path::new("/nonexistent/map.csv")).is_err());
}
