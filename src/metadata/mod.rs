//! Audio file tag extraction.
//!
//! Uses the lofty crate for format-independent metadata access. Reading is
//! the only direction supported here; the indexer never writes tags back.
//!
//! Extraction is deliberately forgiving: a parseable file with missing
//! fields yields empty strings and zeros, while an unparseable file yields
//! `None` and the caller treats it as unrecognized.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::PictureType;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::Path;

/// Everything the indexer wants to know about one audio file.
///
/// Artist, album, and genre are multi-valued: a tag container can carry
/// several values for each, and all of them are indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artists: Vec<String>,
    pub albums: Vec<String>,
    pub genres: Vec<String>,
    /// Release year, 0 if unknown
    pub year: u32,
    /// Track number, 0 if unknown
    pub track_number: u32,
    /// Disc number, 0 if unknown
    pub disc_number: u32,
    /// Duration in whole seconds
    pub duration: u64,
    /// Raw embedded artwork bytes, if the tag carries a picture
    pub embedded_art: Option<Vec<u8>>,
}

/// Read tags and properties from an audio file.
///
/// Returns `None` if the file cannot be opened or parsed at all; callers
/// treat that as "no usable metadata" rather than an error. Files that
/// parse but carry no tag still produce a result (title falls back to the
/// file stem).
pub fn extract(path: &Path) -> Option<TrackInfo> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        });

    let artists = tag.map(|t| strings_for(t, &ItemKey::TrackArtist)).unwrap_or_default();
    let albums = tag.map(|t| strings_for(t, &ItemKey::AlbumTitle)).unwrap_or_default();
    let genres = tag.map(|t| strings_for(t, &ItemKey::Genre)).unwrap_or_default();

    let year = tag.and_then(|t| t.year()).unwrap_or(0);
    let track_number = tag.and_then(|t| t.track()).unwrap_or(0);
    let disc_number = tag.and_then(|t| t.disk()).unwrap_or(0);

    let duration = tagged_file.properties().duration().as_secs();

    let embedded_art = tag.and_then(|t| {
        let pictures = t.pictures();
        pictures
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.first())
            .map(|p| p.data().to_vec())
    });

    Some(TrackInfo {
        title,
        artists,
        albums,
        genres,
        year,
        track_number,
        disc_number,
        duration,
        embedded_art,
    })
}

/// Collect every value a tag carries for one key, in tag order,
/// dropping empties.
fn strings_for(tag: &Tag, key: &ItemKey) -> Vec<String> {
    tag.get_strings(key)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
