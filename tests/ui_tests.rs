use dat2hist::engine::{Connection, Counter, Event, Pipeline, dispatch};
use dat2hist::error::ConvertError;
use dat2hist::types::{FileEntry, FileState, NameMap, Stage};
use dat2hist::ui::view::{failure_detail, row_text, table_header, tag_map_line, text_bar};
use dat2hist::ui::{Action, Frontend, Headless, Input};
use std::path::PathBuf;
use std::time::Duration;

// --- view ---

#[test]
fn test_text_bar() {
    let mut c = Counter::new(4);
    c.incr();
    assert_eq!(text_bar(&c, 8), "[##------] 1/4 25%");
    assert_eq!(text_bar(&Counter::new(0), 4), "[----] 0/0 0%");
}

#[test]
fn test_row_text_columns() {
    let mut entry = FileEntry::new("2024 01 15 0000 (Float).DAT", 0);
    entry.tag_count = Some(12);
    entry.records_written = Some(480);
    entry.load_duration = Some(Duration::from_millis(1500));
    let row = row_text(&entry);
    assert!(row.starts_with("[x] 2024 01 15 0000 (Float).DAT"));
    assert!(row.contains("Pending"));
    assert!(row.contains("12"));
    assert!(row.contains("480"));
    assert!(row.contains("1.5s"));
    assert!(table_header().contains("Written"));
}

#[test]
fn test_long_name_cut_to_column() {
    let entry = FileEntry::new(format!("{} (Float).DAT", "x".repeat(60)), 0);
    let row = row_text(&entry);
    assert!(row.contains("x~"));
    assert!(!row.contains("(Float)"));
}

#[test]
fn test_failure_detail() {
    let mut entry = FileEntry::new("a (Float).DAT", 0);
    assert_eq!(failure_detail(&entry), None);
    entry.state = FileState::Failed {
        stage: Stage::Load,
        reason: "bad date".into(),
    };
    assert_eq!(
        failure_detail(&entry).unwrap(),
        "a (Float).DAT: load failed: bad date"
    );
}

fn with_tag_map() -> Pipeline {
    Pipeline::new("/data", Some(PathBuf::from("/data/map.csv")))
}

#[test]
fn test_tag_map_line_hidden_until_loaded() {
    assert_eq!(tag_map_line(&with_tag_map()), None);

    let map: NameMap = [("A".to_string(), "plant.a".to_string())].into_iter().collect();
    let (p, _) = dispatch(with_tag_map(), Event::NameMapLoaded(Ok(map)));
    assert_eq!(
        tag_map_line(&p).as_deref(),
        Some("Using tag map file: /data/map.csv")
    );
}

#[test]
fn test_tag_map_line_hidden_after_failed_load() {
    let err = ConvertError::Config {
        path: "/data/map.csv".into(),
        reason: "missing".into(),
    };
    let (p, _) = dispatch(with_tag_map(), Event::NameMapLoaded(Err(err)));
    assert!(p.status.is_some());
    assert_eq!(tag_map_line(&p), None);

    let (p, _) = dispatch(with_tag_map(), Event::NameMapLoaded(Ok(NameMap::new())));
    assert_eq!(tag_map_line(&p), None);
}

// --- headless ---

#[test]
fn test_headless_waits_for_scan_then_starts() {
    let mut pipeline = Pipeline::new("/data", None);
    pipeline.connection = Connection::Connected("archive".into());
    let mut ui = Headless::new();
    assert_eq!(ui.poll(&pipeline), None);

    let (p, _) = dispatch(pipeline, Event::Discovered(Ok(vec!["a (Float).DAT".into()])));
    pipeline = p;
    pipeline.scan_reported = true;
    assert_eq!(ui.poll(&pipeline), Some(Action::Dispatch(Event::SelectAll)));
    assert_eq!(
        ui.poll(&pipeline),
        Some(Action::Dispatch(Event::StartConversion))
    );
    // Start found nothing ready: the run is absent, so headless stops.
    assert_eq!(ui.poll(&pipeline), Some(Action::Quit));
}

#[test]
fn test_headless_quits_when_discovery_fails() {
    let (pipeline, _) = dispatch(
        Pipeline::new("/missing", None),
        Event::Discovered(Err(ConvertError::Discovery {
            dir: "/missing".into(),
            reason: "not a directory".into(),
        })),
    );
    let mut ui = Headless::new();
    assert_eq!(ui.poll(&pipeline), Some(Action::Quit));
}

#[test]
fn test_headless_interrupt_quits() {
    let pipeline = Pipeline::new("/data", None);
    let mut ui = Headless::new();
    assert_eq!(ui.on_input(Input::Interrupt, &pipeline), Some(Action::Quit));
}
