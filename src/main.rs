//! dat2hist CLI: scan a datalog directory and convert the selected files.

use anyhow::Result;
use clap::Parser;
use dat2hist::cli::{Cli, handle_run};
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
