//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived paths: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    settings_filename: String,
    log_filename: String,
    output_dir_name: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                settings_filename: format!(".{pkg}.toml"),
                log_filename: format!("{pkg}.log"),
                output_dir_name: "converted".to_string(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Optional settings file looked up in the data directory.
    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }

    /// Log file used while the terminal UI owns the screen.
    pub fn log_filename(&self) -> &str {
        &self.log_filename
    }

    /// Default archive directory name, created under the data directory.
    pub fn output_dir_name(&self) -> &str {
        &self.output_dir_name
    }
}

// ---- Scheduling ----

/// Files allowed in the expensive load stage at once (held until their insert finishes).
pub const MAX_CONCURRENT_LOADS: usize = 3;

/// Delay before a saturated or idle scheduler looks again.
pub const SCHEDULER_BACKOFF: Duration = Duration::from_secs(2);

// ---- Worker threads ----

/// Executor pool sizing.
pub struct WorkerThreadLimits;

impl WorkerThreadLimits {
    /// Default number of task threads: enough for the load ceiling, one insert and header reads.
    pub const DEFAULT: usize = MAX_CONCURRENT_LOADS + 3;
    /// Never run with fewer than this many.
    pub const FLOOR: usize = 2;

    pub fn clamp(requested: Option<usize>) -> usize {
        requested.unwrap_or(Self::DEFAULT).max(Self::FLOOR)
    }
}

// ---- File naming ----

/// Name fragments of a datalog file pair.
pub struct DatNaming;

impl DatNaming {
    pub const FLOAT_MARKER: &'static str = "(Float)";
    pub const TAG_MARKER: &'static str = "(Tagname)";
    pub const EXTENSION: &'static str = "DAT";
}

// ---- UI ----

/// Terminal refresh and layout.
pub struct UiConsts;

impl UiConsts {
    /// How long the loop waits for an event before redrawing anyway.
    pub const TICK: Duration = Duration::from_millis(250);
    /// Width of text progress bars.
    pub const BAR_WIDTH: usize = 40;
}
