//! Tonearm - a local music library indexer.
//!
//! Walks the configured library roots, reconciles what it finds against a
//! SQLite track index, and keeps a content-addressed cover-art cache in
//! sync. Repeated scans only touch what actually changed on disk.

pub mod classify;
pub mod cli;
pub mod config;
pub mod cover;
pub mod db;
pub mod error;
pub mod library;
pub mod metadata;
pub mod model;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("tonearm=info".parse()?))
        .init();

    cli::run_command(&args)
}
