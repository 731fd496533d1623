//! Operator surfaces. Both read the pipeline state and answer with router events.

pub mod headless;
pub mod tui;
pub mod view;

use anyhow::Result;
use crossterm::event::KeyEvent;

use crate::engine::{Event, Pipeline};

pub use headless::Headless;
pub use tui::Tui;

/// Raw operator input delivered to the event loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Ctrl-C outside raw mode.
    Interrupt,
}

/// What a frontend wants the loop to do next.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Dispatch(Event),
    Quit,
}

pub trait Frontend {
    /// Draw the current state.
    fn render(&mut self, pipeline: &Pipeline) -> Result<()>;

    /// Translate one input into an action.
    fn on_input(&mut self, input: Input, pipeline: &Pipeline) -> Option<Action>;

    /// Called once per loop turn; lets a frontend act on state alone.
    fn poll(&mut self, _pipeline: &Pipeline) -> Option<Action> {
        None
    }
}
