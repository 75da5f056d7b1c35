//! Library root management.

use std::path::Path;

use anyhow::Context;

use crate::config;

use super::Cli;

/// Add a directory to the configured library roots and save the config.
pub fn cmd_add_root(args: &Cli, path: &Path) -> anyhow::Result<()> {
    let root = std::fs::canonicalize(path)
        .with_context(|| format!("{} is not an accessible directory", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::config_path().context("could not determine config directory")?,
    };

    let mut config = config::load_from(&config_path);
    if config.library.roots.contains(&root) {
        println!("{} is already a library root.", root.display());
        return Ok(());
    }
    config.library.roots.push(root.clone());
    config::save_to(&config_path, &config)?;

    println!("Added library root {}.", root.display());
    Ok(())
}
