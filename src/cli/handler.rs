//! CLI command handler: resolve options, set up logging and the frontend, run the pipeline.

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, unbounded};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

use crate::Opts;
use crate::dat::DatDirectory;
use crate::engine::{Connection, Pipeline};
use crate::historian::CsvArchive;
use crate::pipeline::Collaborators;
use crate::run_pipeline;
use crate::types::FileState;
use crate::ui::{Headless, Input, Tui, tui};
use crate::utils::config::{PackagePaths, WorkerThreadLimits};
use crate::utils::{apply_file_to_opts, load_settings_toml, setup_logging};

use super::arg_parser::Cli;

/// Settings file first, then CLI flags on top.
pub fn resolve_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::new(&cli.dir);
    if let Some(file) = load_settings_toml(&cli.dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    if cli.output.is_some() {
        opts.output = cli.output.clone();
    }
    if cli.tag_map.is_some() {
        opts.tag_map = cli.tag_map.clone();
    }
    if let Some(v) = cli.headless {
        opts.headless = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if cli.workers.is_some() {
        opts.workers = cli.workers;
    }
    opts
}

/// Archive directory: `--output`, or `converted` under the data directory.
pub fn output_dir(opts: &Opts) -> PathBuf {
    opts.output
        .clone()
        .unwrap_or_else(|| opts.dir.join(PackagePaths::get().output_dir_name()))
}

/// Headless exit status: error when nothing could be converted cleanly.
pub fn check_outcome(pipeline: &Pipeline) -> Result<()> {
    if let Connection::Unavailable(reason) = &pipeline.connection {
        bail!("historian unavailable: {reason}");
    }
    if pipeline.entries().is_empty() {
        let status = pipeline.status.clone().unwrap_or_else(|| "no files".to_string());
        bail!("{status}");
    }
    if let Some(run) = &pipeline.run
        && !run.finished
    {
        bail!("conversion interrupted");
    }
    let failed = pipeline.failed_count();
    if failed > 0 {
        bail!("{failed} file(s) failed");
    }
    Ok(())
}

fn interrupt_channel() -> Result<Receiver<Input>> {
    let (tx, rx) = unbounded();
    ctrlc::set_handler(move || {
        let _ = tx.send(Input::Interrupt);
    })
    .context("install Ctrl-C handler")?;
    Ok(rx)
}

/// Run the conversion with the terminal UI or headless, per `opts`.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = resolve_opts(cli);
    let log_file = (!opts.headless).then(|| PathBuf::from(PackagePaths::get().log_filename()));
    setup_logging(opts.verbose, log_file.as_deref())?;
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );

    let collab = Collaborators::new(
        Arc::new(DatDirectory::new(&opts.dir)),
        Arc::new(CsvArchive::new(output_dir(&opts))),
    );
    let pipeline = Pipeline::new(&opts.dir, opts.tag_map.clone());
    let workers = WorkerThreadLimits::clamp(opts.workers);

    let pipeline = if opts.headless {
        let input_rx = interrupt_channel()?;
        let mut frontend = Headless::new();
        run_pipeline(pipeline, collab, &mut frontend, input_rx, workers)?
    } else {
        let (tx, input_rx) = unbounded();
        let mut frontend = Tui::enter()?;
        tui::spawn_input_reader(tx);
        let result = run_pipeline(pipeline, collab, &mut frontend, input_rx, workers);
        frontend.leave();
        result?
    };

    if let Some(status) = &pipeline.status {
        println!("{status}");
    }
    info!(
        "{} completed, {} failed",
        pipeline.count_in(&FileState::Completed),
        pipeline.failed_count()
    );
    if opts.headless {
        check_outcome(&pipeline)?;
    }
    Ok(())
}
