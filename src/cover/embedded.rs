//! Content-addressed persistence of embedded artwork.
//!
//! An embedded picture is written to the cache directory exactly once:
//! the filename is `<sha256-hex>-embedded.<ext>`, a pure function of the
//! byte content, so two tracks carrying byte-identical art always resolve
//! to the same file. The index of known hashes is seeded from the files
//! already on disk at scan start and extended as new art is written.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Marker distinguishing content-addressed embedded art from user-assigned
/// images in the same cache directory.
pub const EMBEDDED_MARKER: &str = "-embedded";

/// Content-hash hex -> cache file path.
pub type EmbeddedArtIndex = HashMap<String, PathBuf>;

/// Build the embedded-art index from the cache files already on disk.
///
/// Only `*-embedded.*` names participate; user-assigned images keep their
/// random names and are never deduplicated.
pub fn index_embedded_art(art_dir: &Path) -> EmbeddedArtIndex {
    let mut index = EmbeddedArtIndex::new();

    let Ok(entries) = std::fs::read_dir(art_dir) else {
        return index;
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(hash) = stem.strip_suffix(EMBEDDED_MARKER) {
            index.insert(hash.to_string(), path.clone());
        }
    }

    index
}

/// Persist embedded artwork bytes, deduplicating by content hash.
///
/// Returns the cache path for the content, or `None` when the bytes are
/// not a recognizable image or the file cannot be written ("no artwork"
/// is the degraded result, never an error).
pub fn save_embedded_art(
    data: &[u8],
    art_dir: &Path,
    index: &mut EmbeddedArtIndex,
) -> Option<PathBuf> {
    let hash = format!("{:x}", Sha256::digest(data));

    if let Some(existing) = index.get(&hash) {
        return Some(existing.clone());
    }

    let suffix = image_suffix(data)?;

    let path = art_dir.join(format!("{hash}{EMBEDDED_MARKER}.{suffix}"));
    if let Err(e) = std::fs::write(&path, data) {
        warn!("failed to write embedded art {:?}: {}", path, e);
        return None;
    }

    index.insert(hash, path.clone());
    Some(path)
}

/// Sniff the image format of raw bytes and pick a file suffix.
fn image_suffix(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        image::ImageFormat::Jpeg => Some("jpg"),
        image::ImageFormat::Png => Some("png"),
        image::ImageFormat::Gif => Some("gif"),
        image::ImageFormat::WebP => Some("webp"),
        image::ImageFormat::Bmp => Some("bmp"),
        other => other.extensions_str().first().copied(),
    }
}
