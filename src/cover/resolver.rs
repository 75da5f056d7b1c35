//! Artwork source selection for one track.
//!
//! Two candidate sources, one preference flag:
//! - directory preferred: sibling image first, embedded bytes as fallback;
//! - otherwise: embedded bytes first, sibling image only when the track
//!   has none.

use std::path::{Path, PathBuf};

use super::directory::{DirectoryArtCache, find_directory_art};
use super::embedded::{EmbeddedArtIndex, index_embedded_art, save_embedded_art};

/// The artwork lookup state for one scan.
///
/// Owned exclusively by the in-flight scan and passed down by mutable
/// reference; nothing here outlives the scan.
pub struct ArtCaches {
    pub directories: DirectoryArtCache,
    pub embedded: EmbeddedArtIndex,
}

impl ArtCaches {
    /// Build scan-start caches: an empty directory memo and the embedded
    /// index seeded from the files already in the cache directory.
    pub fn new(art_dir: &Path) -> Self {
        Self {
            directories: DirectoryArtCache::new(),
            embedded: index_embedded_art(art_dir),
        }
    }
}

/// Resolve the artwork path for a track.
///
/// `embedded` is the raw picture bytes from the track's tags, if any;
/// `directory` is the track's containing directory. Returns `None` for
/// "no artwork".
pub fn resolve_art(
    embedded: Option<&[u8]>,
    directory: &Path,
    art_dir: &Path,
    caches: &mut ArtCaches,
    prefer_directory_art: bool,
) -> Option<PathBuf> {
    let embedded = embedded.filter(|b| !b.is_empty());

    if prefer_directory_art {
        find_directory_art(directory, &mut caches.directories)
            .or_else(|| embedded.and_then(|b| save_embedded_art(b, art_dir, &mut caches.embedded)))
    } else {
        match embedded {
            Some(bytes) => save_embedded_art(bytes, art_dir, &mut caches.embedded),
            None => find_directory_art(directory, &mut caches.directories),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::EMBEDDED_MARKER;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        music_dir: PathBuf,
        art_dir: PathBuf,
    }

    fn fixture(with_directory_art: bool) -> Fixture {
        let temp = TempDir::new().unwrap();
        let music_dir = temp.path().join("album");
        let art_dir = temp.path().join("media-art");
        std::fs::create_dir_all(&music_dir).unwrap();
        std::fs::create_dir_all(&art_dir).unwrap();
        if with_directory_art {
            std::fs::write(music_dir.join("folder.jpg"), b"jpg bytes").unwrap();
        }
        Fixture {
            _temp: temp,
            music_dir,
            art_dir,
        }
    }

    #[test]
    fn test_directory_preferred_wins_over_embedded() {
        let fx = fixture(true);
        let mut caches = ArtCaches::new(&fx.art_dir);

        let resolved = resolve_art(
            Some(&crate::test_utils::png_bytes()),
            &fx.music_dir,
            &fx.art_dir,
            &mut caches,
            true,
        )
        .unwrap();
        assert_eq!(resolved, fx.music_dir.join("folder.jpg"));
    }

    #[test]
    fn test_embedded_wins_by_default() {
        let fx = fixture(true);
        let mut caches = ArtCaches::new(&fx.art_dir);

        let resolved = resolve_art(
            Some(&crate::test_utils::png_bytes()),
            &fx.music_dir,
            &fx.art_dir,
            &mut caches,
            false,
        )
        .unwrap();
        assert!(resolved.starts_with(&fx.art_dir));
        assert!(resolved.to_str().unwrap().contains(EMBEDDED_MARKER));
    }

    #[test]
    fn test_directory_preferred_falls_back_to_embedded() {
        let fx = fixture(false);
        let mut caches = ArtCaches::new(&fx.art_dir);

        let resolved = resolve_art(
            Some(&crate::test_utils::png_bytes()),
            &fx.music_dir,
            &fx.art_dir,
            &mut caches,
            true,
        )
        .unwrap();
        assert!(resolved.starts_with(&fx.art_dir));
    }

    #[test]
    fn test_no_embedded_falls_back_to_directory() {
        let fx = fixture(true);
        let mut caches = ArtCaches::new(&fx.art_dir);

        let resolved = resolve_art(None, &fx.music_dir, &fx.art_dir, &mut caches, false).unwrap();
        assert_eq!(resolved, fx.music_dir.join("folder.jpg"));
    }

    #[test]
    fn test_empty_bytes_count_as_no_embedded() {
        let fx = fixture(false);
        let mut caches = ArtCaches::new(&fx.art_dir);

        assert!(resolve_art(Some(b""), &fx.music_dir, &fx.art_dir, &mut caches, false).is_none());
    }
}
