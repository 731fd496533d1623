//! Pipeline runtime: collaborators, task workers and the event loop that drives the router.

pub mod context;
pub mod event_loop;
pub mod executor;
pub mod tasks;

pub use context::{Collaborators, PipelineChannels, create_pipeline_channels};
pub use event_loop::{apply, run_event_loop};
pub use executor::{Executor, spawn_task_workers};
pub use tasks::{failure_event, run_task, task_label};
