//! Aggregate library statistics.

use tokio::runtime::Runtime;

use super::{Cli, open_service};

fn format_duration(total_secs: i64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{minutes}m {seconds:02}s")
    }
}

/// Print distinct counts, total duration, and a sample artwork pick.
pub fn cmd_stats(rt: &Runtime, args: &Cli) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = open_service(args, None).await?;
        let db = service.database();

        println!("Tracks:   {}", db.tracks_count().await?);
        println!("Artists:  {}", db.artists_count().await?);
        println!("Albums:   {}", db.albums_count().await?);
        println!("Duration: {}", format_duration(db.tracks_duration().await?));

        if let Some(art) = db.random_media_art().await? {
            println!("Artwork:  {art}");
        }
        Ok(())
    })
}
