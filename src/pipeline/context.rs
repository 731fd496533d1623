//! Pipeline context: collaborators shared by the task workers and the channels that connect them
//! to the event loop.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;

use crate::dat::DatSource;
use crate::engine::{Event, Task};
use crate::historian::Historian;

/// The two external systems every task talks to. Cheap to clone into each worker.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn DatSource>,
    pub historian: Arc<dyn Historian>,
}

impl Collaborators {
    pub fn new(source: Arc<dyn DatSource>, historian: Arc<dyn Historian>) -> Self {
        Self { source, historian }
    }
}

/// Channels for the pipeline. Workers get task_rx and event_tx; the event loop keeps event_rx
/// and submits through task_tx.
///
/// Both are unbounded: the event loop must never block on submit, and workers must never block
/// on reporting a result.
pub struct PipelineChannels {
    pub task_tx: Sender<Task>,
    pub task_rx: Receiver<Task>,
    pub event_tx: Sender<Event>,
    pub event_rx: Receiver<Event>,
}

pub fn create_pipeline_channels() -> PipelineChannels {
    let (task_tx, task_rx) = unbounded::<Task>();
    let (event_tx, event_rx) = unbounded::<Event>();
    PipelineChannels {
        task_tx,
        task_rx,
        event_tx,
        event_rx,
    }
}
