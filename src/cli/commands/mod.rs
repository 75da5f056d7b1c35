//! CLI command definitions and dispatch.

mod art;
mod roots;
mod scan;
mod stats;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use anyhow::Context;

use crate::config;
use crate::library::LibraryService;

pub use art::{cmd_reset, cmd_set_art};
pub use roots::cmd_add_root;
pub use scan::{cmd_list, cmd_scan};
pub use stats::cmd_stats;

/// Tonearm CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Index store path (default: the per-user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Artwork cache directory (default: the per-user cache directory)
    #[arg(long, global = true)]
    pub art_dir: Option<PathBuf>,

    /// Config file path (default: the per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan the configured library roots and reconcile the index
    Scan {
        /// Prefer directory images over embedded artwork for this scan
        #[arg(long)]
        prefer_directory_art: bool,
    },
    /// List every indexed track
    List,
    /// Show aggregate library statistics
    Stats,
    /// Add a directory to the library roots
    AddRoot {
        /// Directory to index on future scans
        path: PathBuf,
    },
    /// Assign an artwork image to every track on (artist, album)
    SetArt {
        artist: String,
        album: String,
        /// Image file to copy into the artwork cache
        image: PathBuf,
    },
    /// Delete every indexed track and the artwork cache
    Reset {
        /// Actually do it
        #[arg(long)]
        yes: bool,
    },
    /// Print the config file location
    ConfigPath,
}

/// Dispatch the parsed command.
pub fn run_command(args: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    match &args.command {
        Commands::Scan {
            prefer_directory_art,
        } => cmd_scan(&rt, args, *prefer_directory_art),
        Commands::List => cmd_list(&rt, args),
        Commands::Stats => cmd_stats(&rt, args),
        Commands::AddRoot { path } => cmd_add_root(args, path),
        Commands::SetArt {
            artist,
            album,
            image,
        } => cmd_set_art(&rt, args, artist, album, image),
        Commands::Reset { yes } => cmd_reset(&rt, args, *yes),
        Commands::ConfigPath => {
            let path = config::config_path().context("could not determine config directory")?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Resolve paths and build the service a command operates on.
///
/// `prefer_directory_art` overrides the configured artwork preference
/// when set (the `scan --prefer-directory-art` flag).
pub(crate) async fn open_service(
    args: &Cli,
    prefer_directory_art: Option<bool>,
) -> anyhow::Result<LibraryService> {
    let mut config = match &args.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(prefer) = prefer_directory_art {
        config.library.prefer_directory_art = prefer;
    }

    let db_path = args
        .db
        .clone()
        .or_else(config::default_db_path)
        .context("could not determine data directory")?;
    let art_dir = args
        .art_dir
        .clone()
        .or_else(config::default_art_dir)
        .context("could not determine cache directory")?;

    let service = LibraryService::open(&db_path, &art_dir, &config.library).await?;
    Ok(service)
}
