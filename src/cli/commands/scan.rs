//! Library scanning and listing commands.

use tokio::runtime::Runtime;

use crate::db::SchemaState;

use super::{Cli, open_service};

/// Reconcile the configured library roots against the index.
///
/// Ctrl-C asks the scan to stop at the next file; whatever was already
/// reconciled is kept.
pub fn cmd_scan(rt: &Runtime, args: &Cli, prefer_directory_art: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = open_service(args, prefer_directory_art.then_some(true)).await?;

        if service.options().roots.is_empty() {
            return Err(crate::error::Error::config(
                "no library roots configured; add one with `tonearm add-root <path>`",
            )
            .into());
        }

        if service.schema_state() == SchemaState::Recreated {
            println!("Index was just (re)created, performing a full scan.");
        }

        let Some(mut handle) = service.spawn_scan() else {
            println!("A scan is already in progress.");
            return Ok(());
        };

        let stats = tokio::select! {
            res = &mut handle => res??,
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted, stopping at the next file...");
                service.request_cancel();
                handle.await??
            }
        };

        if stats.cancelled {
            println!("Scan cancelled; partial progress was kept.");
        }
        println!(
            "Scan complete: {} added, {} updated, {} removed, {} orphaned artwork files deleted.",
            stats.inserted, stats.updated, stats.removed, stats.art_removed
        );
        Ok(())
    })
}

/// Print every indexed track, expanded over its artist/album values.
pub fn cmd_list(rt: &Runtime, args: &Cli) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = open_service(args, None).await?;
        for row in service.database().all_track_rows().await? {
            println!("{} - {} ({})", row.artist, row.title, row.file_path);
        }
        Ok(())
    })
}
