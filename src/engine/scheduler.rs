//! Conversion scheduler (bounded load admission) and insert scheduler (serial).
//!
//! Both run inside dispatch and only return tasks. When there is nothing they can do right
//! now they arm a single backoff timer instead of being woken by a slot-freed signal.

use log::debug;

use crate::types::{FileState, Stage};

use super::progress::RunProgress;
use super::router::{Retry, Task};
use super::state::Pipeline;

/// Admit load-ready files until the ceiling is reached.
///
/// `first` is the pass that opens the run: it sizes `total_to_process` and, when nothing is
/// ready, drops the run so that start can be pressed again.
pub fn conversion_pass(pipeline: &mut Pipeline, first: bool) -> Vec<Task> {
    let mut tasks = Vec::new();
    let finished = match pipeline.run.as_ref() {
        Some(run) => run.finished,
        None => return tasks,
    };
    if first {
        let ready = pipeline.entries().iter().filter(|e| e.ready_for_load()).count();
        if let Some(run) = pipeline.run.as_mut() {
            run.progress = RunProgress::new(ready);
        }
    } else if finished {
        return tasks;
    }

    let max = pipeline.limits.max_concurrent_loads;
    let mut admitted_any = false;
    loop {
        let Some((name, record_count)) = pipeline
            .entries()
            .iter()
            .find(|e| e.ready_for_load())
            .map(|e| (e.name.clone(), e.float_record_count.unwrap_or(0)))
        else {
            break;
        };
        if pipeline.in_flight_loads >= max {
            debug!("Load slots saturated ({}/{}); backing off", pipeline.in_flight_loads, max);
            tasks.extend(arm_backoff(pipeline, Retry::Conversion));
            return tasks;
        }
        if !pipeline.advance(&name, FileState::Loading) {
            break;
        }
        pipeline.in_flight_loads += 1;
        admitted_any = true;
        if let Some(run) = pipeline.run.as_mut() {
            run.admitted += 1;
            run.progress.total_to_process = run.progress.total_to_process.max(run.admitted);
        }
        debug!("Admitted {} ({}/{} slots)", name, pipeline.in_flight_loads, max);
        tasks.push(Task::ReadFloatRecords { name, record_count });
    }
    if admitted_any {
        return tasks;
    }

    if first {
        pipeline.run = None;
        pipeline.set_status(
            "No files in state ready for processing. Files should be Selected and marked \"Tags Valid\"",
        );
        return tasks;
    }
    if upstream_pending(pipeline) {
        // Selected files are still being scanned; pick them up when they become ready.
        tasks.extend(arm_backoff(pipeline, Retry::Conversion));
    } else if let Some(run) = pipeline.run.as_mut()
        && !run.loads_exhausted
    {
        run.loads_exhausted = true;
        let loaded = run.progress.loads_completed;
        pipeline.set_status(format!("All selected files loaded ({loaded}); finishing inserts"));
    }
    tasks
}

/// Start the insert of the first selected, fully loaded file. At most one insert runs at a time.
pub fn insert_pass(pipeline: &mut Pipeline) -> Vec<Task> {
    let mut tasks = Vec::new();
    match pipeline.run.as_ref() {
        Some(run) if !run.finished => {}
        _ => return tasks,
    }
    if pipeline.count_in(&FileState::Inserting) > 0 {
        return tasks;
    }

    while let Some(name) = pipeline
        .entries()
        .iter()
        .find(|e| e.ready_for_insert())
        .map(|e| e.name.clone())
    {
        match pipeline.store.take_for_insert(&name) {
            Some((records, point_cache)) => {
                pipeline.advance(&name, FileState::Inserting);
                debug!("Inserting {} ({} records)", name, records.len());
                tasks.push(Task::Insert {
                    name,
                    records,
                    point_cache,
                });
                return tasks;
            }
            None => {
                pipeline.fail(&name, Stage::Insert, "no loaded records in store".to_string());
                pipeline.store.purge(&name);
                pipeline.release_slot();
                if let Some(run) = pipeline.run.as_mut() {
                    run.progress.failed += 1;
                }
            }
        }
    }

    if run_settled(pipeline) {
        finish_run(pipeline);
    } else {
        tasks.extend(arm_backoff(pipeline, Retry::Insert));
    }
    tasks
}

/// A selected file that has not yet reached the load stage and has not failed.
fn upstream_pending(pipeline: &Pipeline) -> bool {
    pipeline.entries().iter().any(|e| {
        e.selected && !e.state.is_failed() && e.state.rank() <= FileState::TagsValidated.rank()
    })
}

/// Every selected file is terminal.
fn run_settled(pipeline: &Pipeline) -> bool {
    pipeline
        .entries()
        .iter()
        .filter(|e| e.selected)
        .all(|e| e.state == FileState::Completed || e.state.is_failed())
}

fn finish_run(pipeline: &mut Pipeline) {
    let Some(run) = pipeline.run.as_mut() else {
        return;
    };
    run.finished = true;
    let message = format!(
        "Conversion run finished: {} files inserted, {} failed",
        run.progress.inserts_completed, run.progress.failed
    );
    pipeline.set_status(message);
}

/// One pending timer per scheduler; extra requests while armed are dropped.
fn arm_backoff(pipeline: &mut Pipeline, retry: Retry) -> Option<Task> {
    let delay = pipeline.limits.backoff;
    let run = pipeline.run.as_mut()?;
    let pending = match retry {
        Retry::Conversion => &mut run.conversion_retry_pending,
        Retry::Insert => &mut run.insert_retry_pending,
    };
    if *pending {
        return None;
    }
    *pending = true;
    Some(Task::Backoff { retry, delay })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::{Connection, ProcessingRun};

    fn validated(p: &mut Pipeline, names: &[&str]) {
        for name in names {
            p.add_entry(name);
            p.advance(name, FileState::HeaderLoaded);
            p.advance(name, FileState::TagsValidated);
            p.entry_mut(name).unwrap().float_record_count = Some(10);
        }
    }

    fn started(names: &[&str]) -> Pipeline {
        let mut p = Pipeline::new("/data", None);
        p.connection = Connection::Connected("archive".into());
        validated(&mut p, names);
        p.run = Some(ProcessingRun::default());
        p
    }

    #[test]
    fn test_first_pass_fills_slots_then_backs_off() {
        let mut p = started(&["a", "b", "c", "d", "e"]);
        let tasks = conversion_pass(&mut p, true);
        let loads = tasks
            .iter()
            .filter(|t| matches!(t, Task::ReadFloatRecords { .. }))
            .count();
        assert_eq!(loads, 3);
        assert!(tasks.contains(&Task::Backoff {
            retry: Retry::Conversion,
            delay: p.limits.backoff
        }));
        assert_eq!(p.in_flight_loads, 3);
        assert_eq!(p.run.as_ref().unwrap().progress.total_to_process, 5);
    }

    #[test]
    fn test_backoff_armed_once() {
        let mut p = started(&["a", "b", "c", "d"]);
        conversion_pass(&mut p, true);
        let again = conversion_pass(&mut p, false);
        assert!(again.is_empty());
    }

    #[test]
    fn test_first_pass_with_nothing_ready_clears_run() {
        let mut p = started(&[]);
        let tasks = conversion_pass(&mut p, true);
        assert!(tasks.is_empty());
        assert!(p.run.is_none());
        assert!(p.status.as_deref().unwrap().starts_with("No files in state ready"));
    }

    #[test]
    fn test_insert_pass_idle_arms_backoff() {
        let mut p = started(&["a"]);
        conversion_pass(&mut p, true);
        let tasks = insert_pass(&mut p);
        assert_eq!(
            tasks,
            vec![Task::Backoff {
                retry: Retry::Insert,
                delay: p.limits.backoff
            }]
        );
    }

    #[test]
    fn test_insert_pass_without_records_fails_and_releases() {
        let mut p = started(&["a"]);
        conversion_pass(&mut p, true);
        p.advance("a", FileState::DataLoaded);
        let tasks = insert_pass(&mut p);
        assert!(tasks.is_empty());
        assert_eq!(p.in_flight_loads, 0);
        assert!(p.entry("a").unwrap().state.is_failed());
        assert!(p.run.as_ref().unwrap().finished);
    }
}
