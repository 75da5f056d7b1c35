//! Command-line interface for tonearm.
//!
//! Each subcommand is implemented in its own submodule:
//! - `scan`: reconcile the library roots against the index, list tracks
//! - `stats`: aggregate library statistics
//! - `art`: manual artwork assignment and full reset
//! - `roots`: library root management

mod commands;

pub use commands::{Cli, Commands, run_command};
