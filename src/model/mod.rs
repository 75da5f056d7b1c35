//! Core data models for the track index.
//!
//! # Database Schema
//!
//! One physical audio file maps to one `tracks` row. Multi-valued tag
//! fields live in join tables keyed by track id:
//! - `tracks` - per-file fields (path, mtime, title, duration, artwork...)
//! - `track_artists` / `track_albums` / `track_genres` - ordered values;
//!   a track with no values for a field gets a single empty-string row so
//!   distinct-count and filter queries behave the same for "unknown"
//! - `track_rows` - a view expanding a track back into the cartesian
//!   (artist x album x genre) row shape for list-style reads

use sqlx::FromRow;

/// The slice of a track row the reconciliation engine needs.
///
/// Loaded for every track before a scan; the remaining columns are only
/// read by display queries and never by reconciliation.
#[derive(Debug, Clone, FromRow)]
pub struct TrackFileInfo {
    pub id: i64,
    pub file_path: String,
    pub modification_time: i64,
    pub media_art: String,
}

/// One row of the `track_rows` view: a track expanded over its
/// artist/album/genre values.
#[derive(Debug, Clone, FromRow)]
pub struct TrackRow {
    pub id: i64,
    pub file_path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub duration: i64,
    pub media_art: String,
}
