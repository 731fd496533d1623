//! Interactive terminal frontend: file table, scan popup, run bars and status line.

use anyhow::{Context, Result};
use colored::Colorize;
use crossbeam_channel::Sender;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use log::{debug, warn};
use std::io::{self, Stdout, Write};
use std::thread::{self, JoinHandle};

use crate::engine::{Event, Pipeline};
use crate::types::FileEntry;
use crate::utils::config::UiConsts;

use super::view;
use super::{Action, Frontend, Input};

/// Rows above the table: title, connection, tag map, blank, column header.
const HEADER_ROWS: usize = 5;
/// Rows below the table: detail, run bars (up to three), status, help.
const FOOTER_ROWS: usize = 7;

pub struct Tui {
    stdout: Stdout,
    cursor: usize,
    /// First table row on screen.
    scroll: usize,
    width: u16,
    height: u16,
    active: bool,
}

impl Tui {
    /// Switch the terminal to raw mode on the alternate screen.
    pub fn enter() -> Result<Self> {
        let (width, height) = terminal::size().unwrap_or((100, 30));
        terminal::enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(ClearType::All)
        )
        .context("enter alternate screen")?;
        Ok(Self {
            stdout,
            cursor: 0,
            scroll: 0,
            width,
            height,
            active: true,
        })
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn leave(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(err) = execute!(self.stdout, terminal::LeaveAlternateScreen, cursor::Show) {
            warn!("Failed to leave alternate screen: {}", err);
        }
        if let Err(err) = terminal::disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", err);
        }
    }

    fn table_height(&self) -> usize {
        (self.height as usize).saturating_sub(HEADER_ROWS + FOOTER_ROWS).max(1)
    }

    fn keep_cursor_visible(&mut self) {
        let height = self.table_height();
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + height {
            self.scroll = self.cursor + 1 - height;
        }
    }

    fn compose(&mut self, pipeline: &Pipeline) -> Vec<String> {
        let entries = pipeline.entries();
        if !entries.is_empty() {
            self.cursor = self.cursor.min(entries.len() - 1);
        }
        self.keep_cursor_visible();

        let mut lines = vec![
            format!("dat2hist  {}", pipeline.dir().display())
                .bold()
                .to_string(),
            view::connection_line(&pipeline.connection).to_string(),
            view::tag_map_line(pipeline).unwrap_or_default(),
            String::new(),
            view::table_header().underline().to_string(),
        ];

        let height = self.table_height();
        if scan_popup_open(pipeline) {
            let bars = view::scan_lines(pipeline, UiConsts::BAR_WIDTH);
            lines.push("Scanning files...".bold().to_string());
            lines.extend(bars);
            lines.extend((5..height).map(|_| String::new()));
        } else {
            for row in 0..height {
                let index = self.scroll + row;
                lines.push(match entries.get(index) {
                    Some(entry) => view::row_colored(entry, index == self.cursor).to_string(),
                    None => String::new(),
                });
            }
        }

        lines.push(
            entries
                .get(self.cursor)
                .and_then(view::failure_detail)
                .unwrap_or_default()
                .red()
                .to_string(),
        );
        let mut run = view::run_lines(pipeline, UiConsts::BAR_WIDTH);
        run.resize(3, String::new());
        lines.extend(run);
        lines.push(pipeline.status.clone().unwrap_or_default().cyan().to_string());
        lines.push(view::KEY_HELP.dimmed().to_string());
        lines
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        self.leave();
    }
}

/// True while discovery is still running and the popup should cover the table.
fn scan_popup_open(pipeline: &Pipeline) -> bool {
    pipeline.scan.files_discovered.total > 0 && !pipeline.scan.is_complete()
}

/// Map a key to an action, moving `cursor` for navigation keys.
pub(crate) fn handle_key(key: KeyEvent, cursor: &mut usize, entries: &[FileEntry]) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => {
            if *cursor + 1 < entries.len() {
                *cursor += 1;
            }
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            *cursor = cursor.saturating_sub(1);
            None
        }
        KeyCode::Char(' ') | KeyCode::Enter => entries.get(*cursor).map(|e| {
            Action::Dispatch(Event::ToggleSelected {
                name: e.name.clone(),
            })
        }),
        KeyCode::Char('a') => Some(Action::Dispatch(Event::SelectAll)),
        KeyCode::Char('n') => Some(Action::Dispatch(Event::SelectNone)),
        KeyCode::Char('p') => Some(Action::Dispatch(Event::StartConversion)),
        _ => None,
    }
}

impl Frontend for Tui {
    fn render(&mut self, pipeline: &Pipeline) -> Result<()> {
        let lines = self.compose(pipeline);
        let width = self.width as usize;
        for (row, line) in lines.iter().take(self.height as usize).enumerate() {
            queue!(
                self.stdout,
                cursor::MoveTo(0, row as u16),
                terminal::Clear(ClearType::CurrentLine)
            )?;
            // Styled lines carry escape codes; only clip plain ones.
            if line.contains('\x1b') {
                write!(self.stdout, "{line}")?;
            } else {
                let clipped: String = line.chars().take(width).collect();
                write!(self.stdout, "{clipped}")?;
            }
        }
        self.stdout.flush()?;
        Ok(())
    }

    fn on_input(&mut self, input: Input, pipeline: &Pipeline) -> Option<Action> {
        match input {
            Input::Key(key) => handle_key(key, &mut self.cursor, pipeline.entries()),
            Input::Resize(width, height) => {
                self.width = width;
                self.height = height;
                let _ = queue!(self.stdout, terminal::Clear(ClearType::All));
                None
            }
            Input::Interrupt => Some(Action::Quit),
        }
    }
}

/// Forward terminal key presses and resizes to `tx` until the receiver goes away.
pub fn spawn_input_reader(tx: Sender<Input>) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match event::poll(UiConsts::TICK) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(err) => {
                    warn!("Terminal input error: {}", err);
                    break;
                }
            }
            let input = match event::read() {
                Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => Input::Key(key),
                Ok(TermEvent::Resize(w, h)) => Input::Resize(w, h),
                Ok(_) => continue,
                Err(err) => {
                    warn!("Terminal input error: {}", err);
                    break;
                }
            };
            if tx.send(input).is_err() {
                break;
            }
        }
        debug!("Input reader stopped");
    })
}
