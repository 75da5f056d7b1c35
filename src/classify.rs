//! File-type recognition for library scanning.
//!
//! Recognition is two-stage, and both stages must pass before a file is
//! indexed:
//! 1. a cheap extension gate ([`has_audio_extension`]), so the scanner
//!    never opens obviously-unrelated files, then
//! 2. a content sniff ([`sniff_audio`]), which reads the file's leading
//!    bytes and must land on a format we can actually parse. Files with an
//!    audio extension but foreign content (renamed videos, truncated
//!    downloads) are rejected here.

use std::path::Path;

use lofty::file::FileType;
use lofty::probe::Probe;

/// Extensions that are worth sniffing at all (lowercase).
const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aiff", "ape", "f4a", "f4b", "flac", "m4a", "m4b", "mp3", "mpga", "oga", "ogg", "opus",
    "wav", "wv", "wvp",
];

/// Check whether a path carries a known audio extension (case-insensitive).
pub fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sniff a file's content and return its format if it is supported audio.
///
/// This is the strict "match by content" mode: the result comes from the
/// file's bytes, not its name. Returns `None` for unreadable files and for
/// content we can't parse.
pub fn sniff_audio(path: &Path) -> Option<FileType> {
    let file_type = Probe::open(path).ok()?.guess_file_type().ok()?.file_type()?;
    is_supported(file_type).then_some(file_type)
}

/// Whether a sniffed format is one the tag reader can handle.
fn is_supported(file_type: FileType) -> bool {
    matches!(
        file_type,
        FileType::Aac
            | FileType::Aiff
            | FileType::Ape
            | FileType::Flac
            | FileType::Mpeg
            | FileType::Mp4
            | FileType::Opus
            | FileType::Vorbis
            | FileType::Speex
            | FileType::Wav
            | FileType::WavPack
    )
}
