//! dat2hist: convert FactoryTalk datalog files into a historian archive.
//!
//! The core is a pure state machine ([`engine::dispatch`]) driven by a single event loop;
//! file reads, tag validation and inserts run on worker threads and report back as events.

pub mod cli;
pub mod dat;
pub mod engine;
pub mod error;
pub mod historian;
pub mod pipeline;
pub mod types;
pub mod ui;
pub mod utils;

/// Re-export types for API
pub use types::*;

use crossbeam_channel::Receiver;
use log::debug;

use crate::engine::{Pipeline, startup_tasks};
use crate::pipeline::{Collaborators, Executor, PipelineChannels, create_pipeline_channels};
use crate::ui::{Frontend, Input};

/// Result alias used by public dat2hist API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: start the executor, launch the startup tasks for `pipeline` and run the
/// event loop with `frontend` until it quits. Returns the final pipeline state.
pub fn run_pipeline(
    pipeline: Pipeline,
    collab: Collaborators,
    frontend: &mut dyn Frontend,
    input_rx: Receiver<Input>,
    num_threads: usize,
) -> Result<Pipeline> {
    let PipelineChannels {
        task_tx,
        task_rx,
        event_tx,
        event_rx,
    } = create_pipeline_channels();
    let executor = Executor::spawn(collab, task_tx, task_rx, event_tx, num_threads);
    for task in startup_tasks(&pipeline) {
        executor.submit(task);
    }

    let pipeline = pipeline::run_event_loop(pipeline, &executor, &event_rx, input_rx, frontend)?;

    // Join only when nothing is left running; an operator quit mid-run leaves workers behind.
    let settled = pipeline.run.as_ref().is_none_or(|run| run.finished)
        && pipeline.in_flight_loads == 0
        && (pipeline.entries().is_empty() || pipeline.scan_reported);
    debug!("Shutting down executor (wait: {})", settled);
    executor.shutdown(settled);
    Ok(pipeline)
}
