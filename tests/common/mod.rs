//! Shared helpers: dBASE fixture writer and router drivers.
#![allow(dead_code)]

use dat2hist::engine::{Event, Pipeline, SchedulerLimits, Task, dispatch};
use dat2hist::types::{HistorianPoint, PointCache, TagHeader, TagRecord};
use std::path::Path;
use std::time::Duration;

// --- dBASE fixtures ---

/// Encode a dBASE III table from `(name, kind, length)` fields and string rows.
pub fn dbf_bytes(fields: &[(&str, char, usize)], rows: &[Vec<String>]) -> Vec<u8> {
    let header_len = 32 + fields.len() * 32 + 1;
    let record_len = 1 + fields.iter().map(|f| f.2).sum::<usize>();
    let mut out = vec![0u8; 32];
    out[0] = 0x03;
    out[4..8].copy_from_slice(&(rows.len() as u32).to_le_bytes());
    out[8..10].copy_from_slice(&(header_len as u16).to_le_bytes());
    out[10..12].copy_from_slice(&(record_len as u16).to_le_bytes());
    for (name, kind, len) in fields {
        let mut desc = [0u8; 32];
        desc[..name.len()].copy_from_slice(name.as_bytes());
        desc[11] = *kind as u8;
        desc[16] = (*len & 0xFF) as u8;
        desc[17] = (*len >> 8) as u8;
        out.extend_from_slice(&desc);
    }
    out.push(0x0D);
    for row in rows {
        out.push(b' ');
        for ((_, _, len), value) in fields.iter().zip(row) {
            let len = *len;
            let mut cell = format!("{value:<len$}").into_bytes();
            cell.truncate(len);
            out.extend_from_slice(&cell);
        }
    }
    out.push(0x1A);
    out
}

/// Write a `(Tagname).DAT` table with the given tag names (index = position).
pub fn write_tag_file(dir: &Path, float_name: &str, tags: &[&str]) {
    let rows: Vec<Vec<String>> = tags
        .iter()
        .enumerate()
        .map(|(i, t)| vec![t.to_string(), i.to_string(), "1".to_string()])
        .collect();
    let bytes = dbf_bytes(
        &[("Tagname", 'C', 40), ("TTagIndex", 'N', 5), ("TType", 'N', 1)],
        &rows,
    );
    let name = float_name.replacen("(Float)", "(Tagname)", 1);
    std::fs::write(dir.join(name), bytes).unwrap();
}

/// One float row: (tag index, "YYYYMMDD", "HH:MM:SS", millis, value).
pub type FloatRow<'a> = (u32, &'a str, &'a str, u32, f64);

pub fn write_float_file(dir: &Path, float_name: &str, rows: &[FloatRow]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|(tag, date, time, ms, value)| {
            vec![
                date.to_string(),
                time.to_string(),
                ms.to_string(),
                tag.to_string(),
                value.to_string(),
                "U".to_string(),
                "B".to_string(),
            ]
        })
        .collect();
    let bytes = dbf_bytes(
        &[
            ("Date", 'D', 8),
            ("Time", 'C', 8),
            ("Millitm", 'N', 3),
            ("TagIndex", 'N', 5),
            ("Value", 'F', 17),
            ("Status", 'C', 1),
            ("Marker", 'C', 1),
        ],
        &rows,
    );
    std::fs::write(dir.join(float_name), bytes).unwrap();
}

/// A complete pair: `tags` and one sample per tag.
pub fn write_pair(dir: &Path, float_name: &str, tags: &[&str]) {
    write_tag_file(dir, float_name, tags);
    let rows: Vec<FloatRow> = (0..tags.len() as u32)
        .map(|i| (i, "20240115", "08:30:00", 250, 1.5 + i as f64))
        .collect();
    write_float_file(dir, float_name, &rows);
}

// --- router drivers ---

pub fn float_name(day: u32) -> String {
    format!("2024 01 {day:02} 0000 (Float).DAT")
}

pub fn fast_limits() -> SchedulerLimits {
    SchedulerLimits {
        max_concurrent_loads: 3,
        backoff: Duration::from_millis(5),
    }
}

/// Apply one event, keeping the tasks.
pub fn step(pipeline: Pipeline, event: Event) -> (Pipeline, Vec<Task>) {
    dispatch(pipeline, event)
}

/// Apply one event, dropping the tasks.
pub fn apply(pipeline: Pipeline, event: Event) -> Pipeline {
    dispatch(pipeline, event).0
}

pub fn point_cache(tags: &[TagRecord]) -> PointCache {
    let mut cache = PointCache::new();
    for tag in tags {
        cache.add(HistorianPoint {
            source_name: tag.name.clone(),
            source_id: tag.id,
            point_name: tag.name.clone(),
            point_id: tag.id + 100,
        });
    }
    cache
}

/// Drive one discovered file to `TagsValidated`; with `float_header`, also learn its record count.
pub fn scan_file(mut p: Pipeline, name: &str, float_header: bool) -> Pipeline {
    let tags = vec![
        TagRecord {
            name: "A".into(),
            id: 0,
        },
        TagRecord {
            name: "B".into(),
            id: 1,
        },
    ];
    p = apply(
        p,
        Event::TagHeaderRead {
            name: name.to_string(),
            result: Ok(TagHeader {
                tag_count: 2,
                date: dat2hist::dat::date_from_file_name(name),
            }),
        },
    );
    p = apply(
        p,
        Event::TagRecordsRead {
            name: name.to_string(),
            result: Ok(tags.clone()),
        },
    );
    p = apply(
        p,
        Event::TagsValidated {
            name: name.to_string(),
            point_cache: point_cache(&tags),
            valid_count: 2,
        },
    );
    if float_header {
        p = apply(
            p,
            Event::FloatHeaderRead {
                name: name.to_string(),
                result: Ok(10),
            },
        );
    }
    p
}

/// Connected pipeline with `names` discovered and scanned to load-ready.
pub fn scanned(names: &[String]) -> Pipeline {
    let mut p = Pipeline::new("/data", None).with_limits(fast_limits());
    p = apply(p, Event::Connected(Ok("archive /out".into())));
    p = apply(p, Event::Discovered(Ok(names.to_vec())));
    for name in names {
        p = scan_file(p, name, true);
    }
    p
}
