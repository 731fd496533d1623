//! Load `.dat2hist.toml` from the data directory. Values in it apply before CLI flags.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::types::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct SettingsToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    output: Option<String>,
    tag_map: Option<String>,
    headless: Option<bool>,
    verbose: Option<bool>,
    workers: Option<usize>,
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable;
/// a parse error is logged and treated as missing.
pub fn load_settings_toml(dir: &Path) -> Option<SettingsToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_settings(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub fn parse_settings(s: &str) -> Result<SettingsToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $sec.$field {
            $opts.$field = v;
        }
    };
}

/// Resolve a path from the file: relative paths are taken from the data directory.
fn resolve(dir: &Path, p: &str) -> PathBuf {
    let path = PathBuf::from(p);
    if path.is_absolute() { path } else { dir.join(path) }
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &SettingsToml, opts: &mut Opts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.output {
        opts.output = Some(resolve(&opts.dir, p));
    }
    if let Some(ref p) = sec.tag_map {
        opts.tag_map = Some(resolve(&opts.dir, p));
    }
    apply_file_opt!(sec, opts, headless);
    apply_file_opt!(sec, opts, verbose);
    if sec.workers.is_some() {
        opts.workers = sec.workers;
    }
}
