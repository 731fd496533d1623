//! Event router: one event in, new state and follow-up tasks out.

use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConvertError;
use crate::types::{FileState, FloatRecord, NameMap, PointCache, Stage, TagHeader, TagRecord};

use super::scheduler::{conversion_pass, insert_pass};
use super::state::{Connection, Pipeline, ProcessingRun};

/// Which scheduler a backoff timer wakes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retry {
    Conversion,
    Insert,
}

/// Everything the router reacts to: task completions and operator commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Connected(Result<String, ConvertError>),
    NameMapLoaded(Result<NameMap, ConvertError>),
    Discovered(Result<Vec<String>, ConvertError>),
    TagHeaderRead {
        name: String,
        result: Result<TagHeader, ConvertError>,
    },
    TagRecordsRead {
        name: String,
        result: Result<Vec<TagRecord>, ConvertError>,
    },
    TagsValidated {
        name: String,
        point_cache: PointCache,
        valid_count: usize,
    },
    FloatHeaderRead {
        name: String,
        result: Result<usize, ConvertError>,
    },
    FloatRecordsRead {
        name: String,
        result: Result<Vec<FloatRecord>, ConvertError>,
        duration: Duration,
    },
    Inserted {
        name: String,
        result: Result<usize, ConvertError>,
        duration: Duration,
    },
    Retry(Retry),
    ToggleSelected {
        name: String,
    },
    SelectAll,
    SelectNone,
    StartConversion,
}

/// Unit of asynchronous work. Each one completes as exactly one [`Event`].
#[derive(Clone, Debug, PartialEq)]
pub enum Task {
    Connect,
    LoadNameMap(PathBuf),
    Discover(PathBuf),
    ReadTagHeader {
        name: String,
    },
    ReadTagRecords {
        name: String,
        tag_count: usize,
    },
    ValidateTags {
        name: String,
        tag_records: Arc<Vec<TagRecord>>,
        name_map: Option<Arc<NameMap>>,
    },
    ReadFloatHeader {
        name: String,
    },
    ReadFloatRecords {
        name: String,
        record_count: usize,
    },
    Insert {
        name: String,
        records: Vec<FloatRecord>,
        point_cache: Arc<PointCache>,
    },
    Backoff {
        retry: Retry,
        delay: Duration,
    },
}

/// Tasks to launch when the program starts.
pub fn startup_tasks(pipeline: &Pipeline) -> Vec<Task> {
    let mut tasks = vec![Task::Connect, Task::Discover(pipeline.dir().to_path_buf())];
    if let Some(path) = &pipeline.tag_map_path {
        tasks.push(Task::LoadNameMap(path.clone()));
    }
    tasks
}

/// Apply one event. Deterministic: same state and event give the same result and tasks.
pub fn dispatch(mut pipeline: Pipeline, event: Event) -> (Pipeline, Vec<Task>) {
    let mut tasks = Vec::new();
    match event {
        Event::Connected(Ok(target)) => {
            pipeline.connection = Connection::Connected(target);
        }
        Event::Connected(Err(err)) => {
            pipeline.connection = Connection::Unavailable(err.to_string());
            pipeline.set_status(err.to_string());
        }
        Event::NameMapLoaded(result) => on_name_map(&mut pipeline, result),
        Event::Discovered(Ok(names)) => {
            pipeline.discovered = true;
            on_discovered(&mut pipeline, names, &mut tasks);
        }
        Event::Discovered(Err(err)) => {
            pipeline.discovered = true;
            pipeline.set_status(err.to_string());
        }
        Event::TagHeaderRead { name, result } => match result {
            Ok(header) => on_tag_header(&mut pipeline, name, header, &mut tasks),
            Err(err) => fail_scan(&mut pipeline, &name, err, false, false),
        },
        Event::TagRecordsRead { name, result } => match result {
            Ok(records) => {
                if pipeline.entry(&name).map(|e| &e.state) != Some(&FileState::HeaderLoaded) {
                    warn!("Tag records for {} arrived out of order; ignored", name);
                    return (pipeline, tasks);
                }
                pipeline.store.upsert_tag_records(&name, records);
                let tag_records = pipeline
                    .store
                    .get(&name)
                    .map(|a| Arc::clone(&a.tag_records))
                    .unwrap_or_default();
                tasks.push(Task::ValidateTags {
                    name,
                    tag_records,
                    name_map: pipeline.name_map.clone(),
                });
            }
            Err(err) => fail_scan(&mut pipeline, &name, err, true, false),
        },
        Event::TagsValidated {
            name,
            point_cache,
            valid_count,
        } => {
            if pipeline.advance(&name, FileState::TagsValidated) {
                if let Some(entry) = pipeline.entry_mut(&name) {
                    entry.valid_tag_count = Some(valid_count);
                }
                pipeline.store.set_point_cache(&name, Arc::new(point_cache));
                pipeline.scan.tags_validated.incr();
                tasks.push(Task::ReadFloatHeader { name });
            }
        }
        Event::FloatHeaderRead { name, result } => match result {
            Ok(count) => on_float_header(&mut pipeline, name, count),
            Err(err) => {
                pipeline.store.purge(&name);
                fail_scan(&mut pipeline, &name, err, true, true);
            }
        },
        Event::FloatRecordsRead {
            name,
            result,
            duration,
        } => on_load_done(&mut pipeline, name, result, duration, &mut tasks),
        Event::Inserted {
            name,
            result,
            duration,
        } => on_insert_done(&mut pipeline, name, result, duration, &mut tasks),
        Event::Retry(Retry::Conversion) => {
            if let Some(run) = pipeline.run.as_mut() {
                run.conversion_retry_pending = false;
                if !run.finished {
                    tasks.extend(conversion_pass(&mut pipeline, false));
                }
            }
        }
        Event::Retry(Retry::Insert) => {
            if let Some(run) = pipeline.run.as_mut() {
                run.insert_retry_pending = false;
                tasks.extend(insert_pass(&mut pipeline));
            }
        }
        Event::ToggleSelected { name } => {
            if !selection_locked(&pipeline)
                && let Some(entry) = pipeline.entry_mut(&name)
            {
                entry.selected = !entry.selected;
            }
        }
        Event::SelectAll => set_all_selected(&mut pipeline, true),
        Event::SelectNone => set_all_selected(&mut pipeline, false),
        Event::StartConversion => on_start(&mut pipeline, &mut tasks),
    }
    (pipeline, tasks)
}

fn set_all_selected(pipeline: &mut Pipeline, selected: bool) {
    if selection_locked(pipeline) {
        return;
    }
    let names: Vec<String> = pipeline.entries().iter().map(|e| e.name.clone()).collect();
    for name in names {
        if let Some(entry) = pipeline.entry_mut(&name) {
            entry.selected = selected;
        }
    }
}

fn selection_locked(pipeline: &Pipeline) -> bool {
    if pipeline.run_started() {
        debug!("Selection change ignored: conversion run already started");
        return true;
    }
    false
}

fn on_name_map(pipeline: &mut Pipeline, result: Result<NameMap, ConvertError>) {
    match result {
        Ok(map) if map.is_empty() => {
            let path = pipeline.tag_map_path.clone().unwrap_or_default();
            let err = ConvertError::Config {
                path,
                reason: "Tag mapping file was provided but had no entries.".to_string(),
            };
            pipeline.set_status(err.to_string());
        }
        Ok(map) => {
            debug!("Tag map loaded with {} entries", map.len());
            pipeline.name_map = Some(Arc::new(map));
        }
        Err(err) => pipeline.set_status(err.to_string()),
    }
}

fn on_discovered(pipeline: &mut Pipeline, names: Vec<String>, tasks: &mut Vec<Task>) {
    if names.is_empty() {
        let message = format!("No DAT files found in {}", pipeline.dir().display());
        pipeline.set_status(message);
        return;
    }
    pipeline.scan.start(names.len());
    for name in names {
        if pipeline.add_entry(&name) {
            pipeline.scan.files_discovered.incr();
            tasks.push(Task::ReadTagHeader { name });
        } else {
            pipeline.scan.settle_failed(false, false);
        }
    }
}

fn on_tag_header(pipeline: &mut Pipeline, name: String, header: TagHeader, tasks: &mut Vec<Task>) {
    if !pipeline.advance(&name, FileState::HeaderLoaded) {
        return;
    }
    if let Some(entry) = pipeline.entry_mut(&name) {
        entry.record_date = header.date;
        entry.tag_count = Some(header.tag_count);
    }
    pipeline.sort_by_date();
    pipeline.scan.tag_headers.incr();
    tasks.push(Task::ReadTagRecords {
        name,
        tag_count: header.tag_count,
    });
}

fn on_float_header(pipeline: &mut Pipeline, name: String, count: usize) {
    let Some(entry) = pipeline.entry_mut(&name) else {
        warn!("Float header for unknown file {}", name);
        return;
    };
    if entry.state != FileState::TagsValidated {
        warn!("Float header for {} in state {}", name, entry.state.label());
        return;
    }
    entry.float_record_count = Some(count);
    pipeline.store.set_float_record_count(&name, count);
    pipeline.scan.float_headers.incr();
    report_scan_complete(pipeline);
}

/// Fail a file during discovery and settle the scan counters it will never reach.
fn fail_scan(
    pipeline: &mut Pipeline,
    name: &str,
    err: ConvertError,
    reached_tag_headers: bool,
    reached_validation: bool,
) {
    let (stage, reason) = err
        .stage_and_reason()
        .unwrap_or((Stage::Header, err.to_string()));
    if pipeline.fail(name, stage, reason) {
        pipeline
            .scan
            .settle_failed(reached_tag_headers, reached_validation);
        report_scan_complete(pipeline);
    }
}

fn report_scan_complete(pipeline: &mut Pipeline) {
    if pipeline.scan_reported || !pipeline.scan.is_complete() {
        return;
    }
    pipeline.scan_reported = true;
    let ready = pipeline
        .entries()
        .iter()
        .filter(|e| e.state == FileState::TagsValidated)
        .count();
    let failed = pipeline.failed_count();
    pipeline.set_status(format!(
        "File scan complete: {ready} ready for conversion, {failed} failed"
    ));
}

fn on_start(pipeline: &mut Pipeline, tasks: &mut Vec<Task>) {
    if pipeline.run_started() {
        debug!("Start ignored: a conversion run is already in progress");
        return;
    }
    if !pipeline.is_connected() {
        pipeline.set_status("Must be connected to server to process.");
        return;
    }
    pipeline.run = Some(ProcessingRun::default());
    tasks.extend(conversion_pass(pipeline, true));
    if pipeline.run_started() {
        tasks.extend(insert_pass(pipeline));
    }
}

fn on_load_done(
    pipeline: &mut Pipeline,
    name: String,
    result: Result<Vec<FloatRecord>, ConvertError>,
    duration: Duration,
    tasks: &mut Vec<Task>,
) {
    if pipeline.entry(&name).map(|e| &e.state) != Some(&FileState::Loading) {
        warn!("Load result for {} which is not loading; ignored", name);
        return;
    }
    if let Some(entry) = pipeline.entry_mut(&name) {
        entry.load_duration = Some(duration);
    }
    match result {
        Ok(records) => {
            if let Some(entry) = pipeline.entry_mut(&name) {
                entry.float_record_count = Some(records.len());
            }
            pipeline.store.set_float_records(&name, records);
            pipeline.advance(&name, FileState::DataLoaded);
            if let Some(run) = pipeline.run.as_mut() {
                run.progress.loads_completed += 1;
            }
        }
        Err(err) => {
            let (stage, reason) = err.stage_and_reason().unwrap_or((Stage::Load, err.to_string()));
            pipeline.fail(&name, stage, reason);
            pipeline.store.purge(&name);
            pipeline.release_slot();
            if let Some(run) = pipeline.run.as_mut() {
                run.progress.failed += 1;
            }
        }
    }
    tasks.extend(conversion_pass(pipeline, false));
}

fn on_insert_done(
    pipeline: &mut Pipeline,
    name: String,
    result: Result<usize, ConvertError>,
    duration: Duration,
    tasks: &mut Vec<Task>,
) {
    // Resolve the row before looking at the outcome.
    let Some(entry) = pipeline.entry_mut(&name) else {
        warn!("Insert result for unknown file {}; ignored", name);
        return;
    };
    if entry.state != FileState::Inserting {
        warn!(
            "Insert result for {} in state {}; ignored",
            name,
            entry.state.label()
        );
        return;
    }
    entry.insert_duration = Some(duration);
    pipeline.release_slot();
    pipeline.store.purge(&name);
    match result {
        Ok(written) => {
            debug!("{}: {} records written", name, written);
            if let Some(entry) = pipeline.entry_mut(&name) {
                entry.records_written = Some(written);
            }
            pipeline.advance(&name, FileState::Completed);
            if let Some(run) = pipeline.run.as_mut() {
                run.progress.inserts_completed += 1;
            }
        }
        Err(err) => {
            let reason = err
                .stage_and_reason()
                .map(|(_, r)| r)
                .unwrap_or_else(|| err.to_string());
            pipeline.fail(&name, Stage::Insert, reason);
            if let Some(run) = pipeline.run.as_mut() {
                run.progress.failed += 1;
            }
        }
    }
    tasks.extend(conversion_pass(pipeline, false));
    tasks.extend(insert_pass(pipeline));
}
