//! Manual artwork assignment and full reset.

use std::path::Path;

use tokio::runtime::Runtime;

use super::{Cli, open_service};

/// Copy `image` into the artwork cache and assign it to every track on
/// (artist, album).
pub fn cmd_set_art(
    rt: &Runtime,
    args: &Cli,
    artist: &str,
    album: &str,
    image: &Path,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = open_service(args, None).await?;
        let dest = service.set_media_art(artist, album, image).await?;
        println!("Assigned {} to '{artist} - {album}'.", dest.display());
        Ok(())
    })
}

/// Delete every indexed track and the whole artwork cache.
pub fn cmd_reset(rt: &Runtime, args: &Cli, yes: bool) -> anyhow::Result<()> {
    if !yes {
        println!("This deletes the whole index and artwork cache. Re-run with --yes to confirm.");
        return Ok(());
    }
    rt.block_on(async {
        let service = open_service(args, None).await?;
        let art_dir = service.art_dir().to_path_buf();
        service.reset().await?;
        println!("Removed the track index and the artwork cache at {}.", art_dir.display());
        Ok(())
    })
}
