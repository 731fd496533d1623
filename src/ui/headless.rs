//! Non-interactive frontend: selects everything once the scan completes, starts the run and
//! quits when it finishes. Progress goes to kdam bars on stderr.

use anyhow::Result;
use kdam::{Animation, Bar, BarExt};
use std::collections::VecDeque;

use crate::engine::{Connection, Counter, Event, Pipeline};

use super::{Action, Frontend, Input};

/// A kdam bar plus what it currently shows, so updates are sent as deltas.
struct TrackedBar {
    bar: Bar,
    shown: usize,
}

impl TrackedBar {
    fn new(total: usize, desc: &'static str, position: u16) -> Self {
        Self {
            bar: kdam::tqdm!(
                total = total,
                desc = desc,
                animation = Animation::Classic,
                position = position,
                unit = " files"
            ),
            shown: 0,
        }
    }

    /// Bring the bar to `counter`. Totals may grow during a run.
    fn sync(&mut self, counter: Counter) {
        if self.bar.total != counter.total {
            self.bar.total = counter.total;
            let _ = self.bar.refresh();
        }
        if counter.completed > self.shown {
            let _ = self.bar.update(counter.completed - self.shown);
            self.shown = counter.completed;
        }
    }
}

#[derive(Default)]
pub struct Headless {
    scan_bar: Option<TrackedBar>,
    load_bar: Option<TrackedBar>,
    insert_bar: Option<TrackedBar>,
    pending: VecDeque<Action>,
    started: bool,
}

impl Headless {
    pub fn new() -> Self {
        Self::default()
    }

    fn quit(&mut self) -> Option<Action> {
        for bar in [&mut self.scan_bar, &mut self.load_bar, &mut self.insert_bar]
            .into_iter()
            .flatten()
        {
            let _ = bar.bar.refresh();
        }
        if self.scan_bar.is_some() || self.load_bar.is_some() {
            eprintln!();
        }
        Some(Action::Quit)
    }
}

impl Frontend for Headless {
    fn render(&mut self, pipeline: &Pipeline) -> Result<()> {
        let scan = &pipeline.scan;
        if !self.started && scan.files_discovered.total > 0 {
            self.scan_bar
                .get_or_insert_with(|| TrackedBar::new(scan.float_headers.total, "Scanning", 0))
                .sync(scan.float_headers);
        }
        if let Some(run) = &pipeline.run {
            let total = run.progress.total_to_process;
            self.load_bar
                .get_or_insert_with(|| TrackedBar::new(total, "Loaded", 1))
                .sync(run.progress.loads());
            self.insert_bar
                .get_or_insert_with(|| TrackedBar::new(total, "Inserted", 2))
                .sync(run.progress.inserts());
        }
        Ok(())
    }

    fn on_input(&mut self, input: Input, _pipeline: &Pipeline) -> Option<Action> {
        match input {
            Input::Interrupt => self.quit(),
            Input::Key(_) | Input::Resize(..) => None,
        }
    }

    fn poll(&mut self, pipeline: &Pipeline) -> Option<Action> {
        if let Some(action) = self.pending.pop_front() {
            return Some(action);
        }
        if matches!(pipeline.connection, Connection::Unavailable(_)) {
            return self.quit();
        }
        if pipeline.discovered && pipeline.entries().is_empty() {
            return self.quit();
        }
        if !self.started {
            if pipeline.scan_reported && pipeline.is_connected() {
                self.started = true;
                self.pending
                    .push_back(Action::Dispatch(Event::StartConversion));
                return Some(Action::Dispatch(Event::SelectAll));
            }
            return None;
        }
        match &pipeline.run {
            None => self.quit(),
            Some(run) if run.finished => self.quit(),
            Some(_) => None,
        }
    }
}
