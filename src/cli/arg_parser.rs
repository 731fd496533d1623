use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Convert FactoryTalk datalog files into a historian archive.
#[derive(Clone, Debug, Parser)]
#[command(name = "dat2hist")]
#[command(about = "Scan a directory of (Float).DAT / (Tagname).DAT pairs and convert the selected files.")]
pub struct Cli {
    /// Directory with datalog files. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Archive directory for converted files. Default: `converted` in DIR.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// CSV mapping source tag names to historian tag names (two columns).
    #[arg(long, short)]
    pub tag_map: Option<PathBuf>,

    /// No terminal UI: select all files, start once the scan completes, exit when done.
    #[arg(long, short = 'y', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub headless: Option<bool>,

    /// Number of task worker threads.
    #[arg(long, short = 'w', value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
