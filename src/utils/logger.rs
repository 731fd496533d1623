use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Set up env_logger. With `log_file`, records go there uncolored (the TUI owns the terminal);
/// otherwise to stderr.
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::from_default_env();
    builder
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level); // Our crate: use requested level

    let plain = log_file.is_some();
    if let Some(path) = log_file {
        let file =
            File::create(path).with_context(|| format!("create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.format(move |buf, record| {
        let name = env!("CARGO_PKG_NAME");
        if plain {
            return writeln!(
                buf,
                "{} [{} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            );
        }
        let line = match record.level() {
            Level::Error | Level::Warn => {
                let level_str = match record.level() {
                    Level::Warn => "WARN".yellow(),
                    _ => "ERROR".red(),
                };
                let path = record.target().to_string().white();
                format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
            }
            _ => format!("[{}] {}", name.cyan(), record.args()),
        };
        writeln!(buf, "{}", line)
    });
    builder.try_init().context("install logger")?;
    Ok(())
}
