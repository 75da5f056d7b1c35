//! Detect album artwork files sitting next to the audio files.
//!
//! A directory is listed at most once per scan: results, including "this
//! directory has no artwork", are memoized in a per-scan cache because
//! every contained track asks the same question.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-scan memo of directory -> resolved artwork path (None = looked,
/// found nothing).
pub type DirectoryArtCache = HashMap<PathBuf, Option<PathBuf>>;

/// Exact stems that qualify as directory artwork (lowercase)
const ART_STEMS: &[&str] = &["cover", "folder", "front"];

/// Image extensions considered (lowercase)
const ART_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png"];

/// Find the artwork image for a directory, memoized.
///
/// Entries are matched case-insensitively against
/// `(albumart*|cover|folder|front).(jpeg|jpg|png)` in file-name order, so
/// the first match is deterministic.
pub fn find_directory_art(directory: &Path, cache: &mut DirectoryArtCache) -> Option<PathBuf> {
    if let Some(found) = cache.get(directory) {
        return found.clone();
    }

    let art = scan_directory(directory);
    cache.insert(directory.to_path_buf(), art.clone());
    art
}

fn scan_directory(directory: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(directory).ok()?;

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();

    names
        .into_iter()
        .find(|name| matches_art_name(name))
        .map(|name| directory.join(name))
}

fn matches_art_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    let Some((stem, ext)) = lower.rsplit_once('.') else {
        return false;
    };
    if !ART_EXTENSIONS.contains(&ext) {
        return false;
    }
    ART_STEMS.contains(&stem) || stem.starts_with("albumart")
}
