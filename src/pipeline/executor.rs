//! Task executor: a fixed pool of worker threads fed over a channel, plus detached timer
//! threads for backoffs so a sleeping retry never occupies a worker.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, warn};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crate::engine::{Event, Task};

use super::context::Collaborators;
use super::tasks::{failure_event, run_task, task_label};

/// Single worker: take tasks from task_rx, run them, send the resulting event.
/// Exits when the task channel closes or nobody listens for events anymore.
fn worker_loop(task_rx: Receiver<Task>, event_tx: Sender<Event>, collab: Collaborators) {
    while let Ok(task) = task_rx.recv() {
        let event = run_guarded(task, &collab);
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

/// Run a task; a panic in a collaborator becomes a failure event for the same task.
fn run_guarded(task: Task, collab: &Collaborators) -> Event {
    let fallback = failure_event(&task, "task panicked");
    let label = task_label(&task);
    match panic::catch_unwind(AssertUnwindSafe(|| run_task(task, collab))) {
        Ok(event) => event,
        Err(_) => {
            error!("Task {} panicked", label);
            fallback
        }
    }
}

/// Spawn task workers. Caller keeps the task sender; dropping it lets the workers exit.
pub fn spawn_task_workers(
    task_rx: Receiver<Task>,
    event_tx: &Sender<Event>,
    collab: &Collaborators,
    num_threads: usize,
) -> Vec<JoinHandle<()>> {
    (0..num_threads)
        .map(|_| {
            let task_rx = task_rx.clone();
            let event_tx = event_tx.clone();
            let collab = collab.clone();
            thread::spawn(move || worker_loop(task_rx, event_tx, collab))
        })
        .collect()
}

/// Owns the worker pool and routes submitted tasks.
pub struct Executor {
    task_tx: Option<Sender<Task>>,
    event_tx: Sender<Event>,
    collab: Collaborators,
    workers: Vec<JoinHandle<()>>,
}

impl Executor {
    pub fn spawn(
        collab: Collaborators,
        task_tx: Sender<Task>,
        task_rx: Receiver<Task>,
        event_tx: Sender<Event>,
        num_threads: usize,
    ) -> Self {
        let workers = spawn_task_workers(task_rx, &event_tx, &collab, num_threads);
        debug!("Executor started with {} workers", workers.len());
        Self {
            task_tx: Some(task_tx),
            event_tx,
            collab,
            workers,
        }
    }

    /// Queue a task. Backoffs get their own timer thread; everything else goes to the pool.
    pub fn submit(&self, task: Task) {
        if let Task::Backoff { .. } = task {
            let event_tx = self.event_tx.clone();
            let collab = self.collab.clone();
            thread::spawn(move || {
                let _ = event_tx.send(run_guarded(task, &collab));
            });
            return;
        }
        let Some(task_tx) = &self.task_tx else {
            warn!("Task {} submitted after shutdown; dropped", task_label(&task));
            return;
        };
        if let Err(err) = task_tx.send(task) {
            warn!("Task {} dropped: workers gone", task_label(&err.0));
        }
    }

    /// Close the task queue. With `wait`, join the workers (after they drain the queue);
    /// without it they are left to finish or die with the process.
    pub fn shutdown(mut self, wait: bool) {
        drop(self.task_tx.take());
        if !wait {
            return;
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Task worker exited with a panic");
            }
        }
    }
}
