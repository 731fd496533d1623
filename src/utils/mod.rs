pub mod config;
pub mod logger;
pub mod settings_file;

pub use config::*;
pub use logger::setup_logging;
pub use settings_file::{SettingsToml, apply_file_to_opts, load_settings_toml};
