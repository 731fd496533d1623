//! Plain-text pieces of the screen: table rows, header, progress bars. Kept free of terminal
//! I/O so both frontends and tests can use them.

use colored::{ColoredString, Colorize};
use std::time::Duration;

use crate::engine::{Connection, Counter, Pipeline};
use crate::types::{FileEntry, FileState};

/// Column widths: mark, name, state, date, tags, valid, records, written, load, insert.
const COLUMNS: [usize; 10] = [3, 34, 12, 10, 6, 6, 9, 9, 8, 8];

/// `[#####---------] 3/10 30%`
pub fn text_bar(counter: &Counter, width: usize) -> String {
    let fraction = counter.percent();
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!(
        "[{}{}] {}/{} {:.0}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        counter.completed,
        counter.total,
        fraction * 100.0
    )
}

/// Seconds with one decimal, or blank.
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{:.1}s", d.as_secs_f64()),
        None => String::new(),
    }
}

fn opt_count(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Fit `text` into `width` columns, cutting with `~` when too long.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return format!("{text:<width$}");
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn cells_to_line(cells: &[String]) -> String {
    cells
        .iter()
        .zip(COLUMNS)
        .map(|(cell, width)| fit(cell, width))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn table_header() -> String {
    let cells = [
        "", "File", "State", "Date", "Tags", "Valid", "Records", "Written", "Load", "Insert",
    ]
    .map(String::from);
    cells_to_line(&cells)
}

/// One table row, uncolored.
pub fn row_text(entry: &FileEntry) -> String {
    let mark = if entry.selected { "[x]" } else { "[ ]" };
    let date = entry
        .record_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let cells = [
        mark.to_string(),
        entry.name.clone(),
        entry.state.label().to_string(),
        date,
        opt_count(entry.tag_count),
        opt_count(entry.valid_tag_count),
        opt_count(entry.float_record_count),
        opt_count(entry.records_written),
        format_duration(entry.load_duration),
        format_duration(entry.insert_duration),
    ];
    cells_to_line(&cells)
}

/// Row colored by state; the cursor row is reversed.
pub fn row_colored(entry: &FileEntry, is_cursor: bool) -> ColoredString {
    let text = row_text(entry);
    let styled = match &entry.state {
        FileState::Completed => text.green(),
        FileState::Failed { .. } => text.red(),
        FileState::Loading | FileState::DataLoaded | FileState::Inserting => text.yellow(),
        FileState::TagsValidated => text.normal(),
        _ => text.dimmed(),
    };
    if is_cursor { styled.reversed() } else { styled }
}

/// Failure reason line shown under the table for the cursor row.
pub fn failure_detail(entry: &FileEntry) -> Option<String> {
    match &entry.state {
        FileState::Failed { stage, reason } => {
            Some(format!("{}: {} failed: {}", entry.name, stage, reason))
        }
        _ => None,
    }
}

pub fn connection_line(connection: &Connection) -> ColoredString {
    match connection {
        Connection::Connecting => "Connecting to historian...".yellow(),
        Connection::Connected(target) => format!("Connected to {target}").green(),
        Connection::Unavailable(reason) => format!("Unable to connect: {reason}").red(),
    }
}

/// Shown only once the map has loaded with entries; until then validation runs unmapped.
pub fn tag_map_line(pipeline: &Pipeline) -> Option<String> {
    pipeline.name_map.as_ref()?;
    pipeline
        .tag_map_path
        .as_ref()
        .map(|p| format!("Using tag map file: {}", p.display()))
}

/// The four discovery-phase bars.
pub fn scan_lines(pipeline: &Pipeline, width: usize) -> Vec<String> {
    let scan = &pipeline.scan;
    [
        ("Files scanned", &scan.files_discovered),
        ("Tag headers loaded", &scan.tag_headers),
        ("Historian tags validated", &scan.tags_validated),
        ("Record headers loaded", &scan.float_headers),
    ]
    .iter()
    .map(|(label, counter)| format!("{label:<26}{}", text_bar(counter, width)))
    .collect()
}

/// Load and insert bars for the active run, if any.
pub fn run_lines(pipeline: &Pipeline, width: usize) -> Vec<String> {
    let Some(run) = &pipeline.run else {
        return Vec::new();
    };
    let mut lines = vec![
        format!("{:<26}{}", "Files loaded", text_bar(&run.progress.loads(), width)),
        format!(
            "{:<26}{}",
            "Files inserted",
            text_bar(&run.progress.inserts(), width)
        ),
    ];
    if run.progress.failed > 0 {
        lines.push(format!("{:<26}{}", "Failed", run.progress.failed));
    }
    lines
}

pub const KEY_HELP: &str =
    "q quit | j/k move | space toggle | a all | n none | p start conversion";
