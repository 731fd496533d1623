//! Command line: argument parsing and the run handler.

pub mod arg_parser;
pub mod handler;

pub use arg_parser::Cli;
pub use handler::{check_outcome, handle_run, output_dir, resolve_opts};
