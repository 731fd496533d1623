//! Run one task against the collaborators and turn its outcome into exactly one event.

use std::thread;
use std::time::Instant;

use log::{debug, trace};

use crate::engine::{Event, Task};
use crate::error::ConvertError;
use crate::historian::{load_name_map, validate_tags};
use crate::types::{PointCache, Stage};

use super::context::Collaborators;

/// Execute `task`. Blocking; called on a worker thread (or a timer thread for backoffs).
pub fn run_task(task: Task, collab: &Collaborators) -> Event {
    trace!("Running task {}", task_label(&task));
    match task {
        Task::Connect => {
            let target = collab.historian.target();
            let result = collab
                .historian
                .connect()
                .map(|()| target.clone())
                .map_err(|e| ConvertError::Connect {
                    target,
                    reason: format!("{e:#}"),
                });
            Event::Connected(result)
        }
        Task::LoadNameMap(path) => {
            let result = load_name_map(&path).map_err(|e| ConvertError::Config {
                path,
                reason: format!("{e:#}"),
            });
            Event::NameMapLoaded(result)
        }
        Task::Discover(dir) => {
            let result = collab
                .source
                .discover()
                .map_err(|e| ConvertError::Discovery {
                    dir,
                    reason: format!("{e:#}"),
                });
            Event::Discovered(result)
        }
        Task::ReadTagHeader { name } => {
            let result = collab
                .source
                .read_tag_header(&name)
                .map_err(|e| ConvertError::parse(Stage::Header, &e));
            Event::TagHeaderRead { name, result }
        }
        Task::ReadTagRecords { name, tag_count } => {
            let result = collab
                .source
                .read_tag_records(&name, tag_count)
                .map_err(|e| ConvertError::parse(Stage::TagRecords, &e));
            Event::TagRecordsRead { name, result }
        }
        Task::ValidateTags {
            name,
            tag_records,
            name_map,
        } => {
            let (point_cache, valid_count) =
                validate_tags(collab.historian.as_ref(), &tag_records, name_map.as_deref());
            debug!(
                "{}: {} of {} tags valid",
                name,
                valid_count,
                tag_records.len()
            );
            Event::TagsValidated {
                name,
                point_cache,
                valid_count,
            }
        }
        Task::ReadFloatHeader { name } => {
            let result = collab
                .source
                .read_float_header(&name)
                .map_err(|e| ConvertError::parse(Stage::FloatHeader, &e));
            Event::FloatHeaderRead { name, result }
        }
        Task::ReadFloatRecords { name, record_count } => {
            let start = Instant::now();
            let result = collab
                .source
                .read_float_records(&name, record_count)
                .map_err(|e| ConvertError::parse(Stage::Load, &e));
            Event::FloatRecordsRead {
                name,
                result,
                duration: start.elapsed(),
            }
        }
        Task::Insert {
            name,
            records,
            point_cache,
        } => {
            let start = Instant::now();
            let result = collab
                .historian
                .insert(&name, &records, &point_cache)
                .map_err(|e| ConvertError::insert(&e));
            Event::Inserted {
                name,
                result,
                duration: start.elapsed(),
            }
        }
        Task::Backoff { retry, delay } => {
            thread::sleep(delay);
            Event::Retry(retry)
        }
    }
}

/// Event reported when a task could not run to completion (worker panic).
/// Keeps the one-task-one-event contract so no row is left waiting.
pub fn failure_event(task: &Task, reason: &str) -> Event {
    let reason = reason.to_string();
    match task {
        Task::Connect => Event::Connected(Err(ConvertError::Connect {
            target: String::new(),
            reason,
        })),
        Task::LoadNameMap(path) => Event::NameMapLoaded(Err(ConvertError::Config {
            path: path.clone(),
            reason,
        })),
        Task::Discover(dir) => Event::Discovered(Err(ConvertError::Discovery {
            dir: dir.clone(),
            reason,
        })),
        Task::ReadTagHeader { name } => Event::TagHeaderRead {
            name: name.clone(),
            result: Err(ConvertError::Parse {
                stage: Stage::Header,
                reason,
            }),
        },
        Task::ReadTagRecords { name, .. } => Event::TagRecordsRead {
            name: name.clone(),
            result: Err(ConvertError::Parse {
                stage: Stage::TagRecords,
                reason,
            }),
        },
        Task::ValidateTags { name, .. } => Event::TagsValidated {
            name: name.clone(),
            point_cache: PointCache::new(),
            valid_count: 0,
        },
        Task::ReadFloatHeader { name } => Event::FloatHeaderRead {
            name: name.clone(),
            result: Err(ConvertError::Parse {
                stage: Stage::FloatHeader,
                reason,
            }),
        },
        Task::ReadFloatRecords { name, .. } => Event::FloatRecordsRead {
            name: name.clone(),
            result: Err(ConvertError::Parse {
                stage: Stage::Load,
                reason,
            }),
            duration: Default::default(),
        },
        Task::Insert { name, .. } => Event::Inserted {
            name: name.clone(),
            result: Err(ConvertError::Insert { reason }),
            duration: Default::default(),
        },
        Task::Backoff { retry, .. } => Event::Retry(*retry),
    }
}

/// Short description for logs.
pub fn task_label(task: &Task) -> String {
    match task {
        Task::Connect => "connect".to_string(),
        Task::LoadNameMap(path) => format!("load tag map {}", path.display()),
        Task::Discover(dir) => format!("discover {}", dir.display()),
        Task::ReadTagHeader { name } => format!("read tag header {name}"),
        Task::ReadTagRecords { name, .. } => format!("read tag records {name}"),
        Task::ValidateTags { name, .. } => format!("validate tags {name}"),
        Task::ReadFloatHeader { name } => format!("read float header {name}"),
        Task::ReadFloatRecords { name, .. } => format!("load {name}"),
        Task::Insert { name, .. } => format!("insert {name}"),
        Task::Backoff { retry, delay } => format!("{retry:?} backoff {delay:?}"),
    }
}
