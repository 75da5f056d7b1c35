//! Index store for the track library.
//!
//! Uses SQLx with SQLite for lightweight, embedded storage. One physical
//! audio file is one `tracks` row; multi-valued tag fields (artist, album,
//! genre) live in join tables, with a `track_rows` view reconstructing the
//! flat cartesian shape for list-style reads.
//!
//! Two kinds of access:
//! - [`Database`] holds a small pool for interactive reads (aggregate
//!   counts, random-artwork picks) and user actions; these see committed
//!   data only and stay available while a scan runs.
//! - The scan opens its own dedicated connection
//!   ([`open_scan_connection`]) and performs every mutation inside one
//!   transaction; the free functions in this module all expect to run on
//!   that connection and never commit by themselves.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Connection, Row, SqliteConnection};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metadata::TrackInfo;
use crate::model::{TrackFileInfo, TrackRow};

/// SQLite limits bound parameters per statement; stay under it when
/// building `IN (?)` lists.
const MAX_PARAMS: usize = 999;

/// Expected column sets, used by the schema check.
const EXPECTED_TABLES: &[(&str, &[&str])] = &[
    (
        "tracks",
        &[
            "id",
            "file_path",
            "modification_time",
            "title",
            "year",
            "track_number",
            "disc_number",
            "duration",
            "media_art",
        ],
    ),
    ("track_artists", &["track_id", "position", "artist"]),
    ("track_albums", &["track_id", "position", "album"]),
    ("track_genres", &["track_id", "position", "genre"]),
];

/// Whether [`Database::ensure_schema`] found a usable schema or had to
/// build one (meaning any prior data is gone).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Existing,
    Recreated,
}

/// Handle to the index store.
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open (creating if missing) the store at `path`.
    ///
    /// The parent directory is created on demand. Failure here is fatal:
    /// nothing else can proceed without the store.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(Error::StoreOpen)?;

        debug!("opened index store at {:?}", path);
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Verify the schema matches what this build expects; drop and
    /// recreate everything on any mismatch.
    ///
    /// Returns [`SchemaState::Recreated`] when the tables were (re)built,
    /// so callers know prior index content is gone and a full scan is due.
    pub async fn ensure_schema(&self) -> Result<SchemaState> {
        let mut intact = true;
        for (table, expected) in EXPECTED_TABLES {
            let actual = self.table_columns(table).await.map_err(Error::Schema)?;
            if actual.len() != expected.len()
                || !expected.iter().all(|c| actual.iter().any(|a| a == c))
            {
                intact = false;
                break;
            }
        }

        if intact {
            return Ok(SchemaState::Existing);
        }

        info!("track schema mismatch, recreating index tables");
        self.recreate_schema().await.map_err(Error::Schema)?;
        Ok(SchemaState::Recreated)
    }

    async fn table_columns(&self, table: &str) -> sqlx::Result<Vec<String>> {
        // PRAGMA cannot take bound parameters; table names come from the
        // static EXPECTED_TABLES list
        let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| r.try_get::<String, _>("name")).collect()
    }

    async fn recreate_schema(&self) -> sqlx::Result<()> {
        let statements = [
            "DROP VIEW IF EXISTS track_rows",
            "DROP TABLE IF EXISTS track_genres",
            "DROP TABLE IF EXISTS track_albums",
            "DROP TABLE IF EXISTS track_artists",
            "DROP TABLE IF EXISTS tracks",
            "CREATE TABLE tracks (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL,
                modification_time INTEGER NOT NULL,
                title TEXT NOT NULL COLLATE NOCASE,
                year INTEGER NOT NULL DEFAULT 0,
                track_number INTEGER NOT NULL DEFAULT 0,
                disc_number INTEGER NOT NULL DEFAULT 0,
                duration INTEGER NOT NULL DEFAULT 0,
                media_art TEXT NOT NULL DEFAULT ''
            )",
            "CREATE TABLE track_artists (
                track_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                artist TEXT NOT NULL COLLATE NOCASE
            )",
            "CREATE TABLE track_albums (
                track_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                album TEXT NOT NULL COLLATE NOCASE
            )",
            "CREATE TABLE track_genres (
                track_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                genre TEXT NOT NULL
            )",
            "CREATE INDEX idx_tracks_path ON tracks(file_path)",
            "CREATE INDEX idx_track_artists_track ON track_artists(track_id)",
            "CREATE INDEX idx_track_artists_artist ON track_artists(artist)",
            "CREATE INDEX idx_track_albums_track ON track_albums(track_id)",
            "CREATE INDEX idx_track_albums_album ON track_albums(album)",
            "CREATE INDEX idx_track_genres_track ON track_genres(track_id)",
            "CREATE INDEX idx_track_genres_genre ON track_genres(genre)",
            "CREATE VIEW track_rows AS
                SELECT t.id, t.file_path, t.title, a.artist, al.album, g.genre,
                       t.duration, t.media_art
                FROM tracks t
                JOIN track_artists a ON a.track_id = t.id
                JOIN track_albums al ON al.track_id = t.id
                JOIN track_genres g ON g.track_id = t.id",
        ];
        for sql in statements {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// The interactive connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path of the backing file (the scan opens its own connection to it).
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // Aggregate read surface
    // ------------------------------------------------------------------

    /// Number of distinct artists (the unknown artist counts as one).
    pub async fn artists_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT artist) FROM track_artists")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Number of distinct albums.
    pub async fn albums_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT album) FROM track_albums")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Number of indexed tracks (physical files).
    pub async fn tracks_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Total duration of the library in seconds, each track counted once.
    pub async fn tracks_duration(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COALESCE(SUM(duration), 0) FROM tracks")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// A uniformly random pick among all distinct non-empty artwork paths.
    pub async fn random_media_art(&self) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT media_art FROM tracks WHERE media_art != '' \
             GROUP BY media_art ORDER BY RANDOM() LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Random artwork among tracks by the given artist.
    pub async fn random_media_art_for_artist(&self, artist: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT t.media_art FROM tracks t \
             JOIN track_artists a ON a.track_id = t.id \
             WHERE t.media_art != '' AND a.artist = ? \
             GROUP BY t.media_art ORDER BY RANDOM() LIMIT 1",
        )
        .bind(artist)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Random artwork among tracks on the given (artist, album).
    pub async fn random_media_art_for_album(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT t.media_art FROM tracks t \
             JOIN track_artists a ON a.track_id = t.id \
             JOIN track_albums al ON al.track_id = t.id \
             WHERE t.media_art != '' AND a.artist = ? AND al.album = ? \
             GROUP BY t.media_art ORDER BY RANDOM() LIMIT 1",
        )
        .bind(artist)
        .bind(album)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Random artwork among tracks in the given genre.
    pub async fn random_media_art_for_genre(&self, genre: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT t.media_art FROM tracks t \
             JOIN track_genres g ON g.track_id = t.id \
             WHERE t.media_art != '' AND g.genre = ? \
             GROUP BY t.media_art ORDER BY RANDOM() LIMIT 1",
        )
        .bind(genre)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Every track expanded over its artist/album/genre values, the
    /// original flat row shape.
    pub async fn all_track_rows(&self) -> Result<Vec<TrackRow>> {
        let rows = sqlx::query_as::<_, TrackRow>(
            "SELECT id, file_path, title, artist, album, genre, duration, media_art \
             FROM track_rows ORDER BY id, artist, album, genre",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Assign an artwork image to every track on (artist, album).
    ///
    /// The image is copied into the cache directory under a fresh random
    /// name (so it is never confused with content-addressed embedded
    /// art). If the copy fails, nothing is modified.
    pub async fn set_media_art(
        &self,
        art_dir: &Path,
        artist: &str,
        album: &str,
        image: &Path,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(art_dir)?;

        let suffix = image
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("jpg");
        let dest = art_dir.join(format!("{}.{}", uuid::Uuid::new_v4(), suffix));

        std::fs::copy(image, &dest).map_err(|e| Error::ArtCopy {
            from: image.to_path_buf(),
            to: dest.clone(),
            source: e,
        })?;

        let updated = sqlx::query(
            "UPDATE tracks SET media_art = ? WHERE id IN (\
                SELECT a.track_id FROM track_artists a \
                JOIN track_albums al ON al.track_id = a.track_id \
                WHERE a.artist = ? AND al.album = ?)",
        )
        .bind(dest.to_string_lossy().as_ref())
        .bind(artist)
        .bind(album)
        .execute(&self.pool)
        .await?
        .rows_affected();

        info!(artist, album, updated, "assigned artwork {:?}", dest);
        Ok(dest)
    }

    /// Delete every indexed track and remove the artwork cache directory.
    pub async fn reset(&self, art_dir: &Path) -> Result<()> {
        for sql in [
            "DELETE FROM track_genres",
            "DELETE FROM track_albums",
            "DELETE FROM track_artists",
            "DELETE FROM tracks",
        ] {
            sqlx::query(sql).execute(&self.pool).await?;
        }

        if art_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(art_dir) {
                warn!("failed to remove media art directory {:?}: {}", art_dir, e);
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Scan-side operations (dedicated connection, caller-managed transaction)
// ----------------------------------------------------------------------

/// Open the dedicated connection a scan mutates through.
///
/// Distinct from the interactive pool so reads stay responsive while the
/// scan transaction is open.
pub async fn open_scan_connection(path: &Path) -> Result<SqliteConnection> {
    let options = SqliteConnectOptions::new().filename(path);
    SqliteConnection::connect_with(&options)
        .await
        .map_err(Error::StoreOpen)
}

/// Load the reconciliation slice of every track, ordered by id ascending.
///
/// The ordering matters: id allocation for new tracks continues from the
/// highest id seen here.
pub async fn load_file_index(conn: &mut SqliteConnection) -> Result<Vec<TrackFileInfo>> {
    let rows = sqlx::query_as::<_, TrackFileInfo>(
        "SELECT id, file_path, modification_time, media_art FROM tracks ORDER BY id",
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Insert one track and its multi-value rows.
///
/// A field with no values gets a single empty-string row, so "unknown"
/// stays one distinct bucket in every aggregate and filter.
pub async fn insert_track(
    conn: &mut SqliteConnection,
    id: i64,
    file_path: &str,
    modification_time: i64,
    info: &TrackInfo,
    media_art: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO tracks (id, file_path, modification_time, title, year, \
         track_number, disc_number, duration, media_art) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(file_path)
    .bind(modification_time)
    .bind(&info.title)
    .bind(info.year as i64)
    .bind(info.track_number as i64)
    .bind(info.disc_number as i64)
    .bind(info.duration as i64)
    .bind(media_art)
    .execute(&mut *conn)
    .await?;

    insert_values(conn, "track_artists", "artist", id, &info.artists).await?;
    insert_values(conn, "track_albums", "album", id, &info.albums).await?;
    insert_values(conn, "track_genres", "genre", id, &info.genres).await?;
    Ok(())
}

async fn insert_values(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    track_id: i64,
    values: &[String],
) -> sqlx::Result<()> {
    let empty = [String::new()];
    let values: &[String] = if values.is_empty() { &empty } else { values };

    let sql = format!("INSERT INTO {table} (track_id, position, {column}) VALUES (?, ?, ?)");
    for (position, value) in values.iter().enumerate() {
        sqlx::query(&sql)
            .bind(track_id)
            .bind(position as i64)
            .bind(value)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Batch-delete tracks (and their multi-value rows) by id.
pub async fn delete_tracks(conn: &mut SqliteConnection, ids: &[i64]) -> sqlx::Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    // ids are integers; inline them rather than binding to stay clear of
    // the parameter limit
    let list = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    for table in ["track_genres", "track_albums", "track_artists"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE track_id IN ({list})"))
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query(&format!("DELETE FROM tracks WHERE id IN ({list})"))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Point one track at a different artwork path.
pub async fn update_media_art(
    conn: &mut SqliteConnection,
    id: i64,
    media_art: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE tracks SET media_art = ? WHERE id = ?")
        .bind(media_art)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Set `media_art = ''` for every track whose art path is in `paths`,
/// chunked to respect the statement parameter limit.
pub async fn clear_media_art(conn: &mut SqliteConnection, paths: &[String]) -> sqlx::Result<()> {
    for chunk in paths.chunks(MAX_PARAMS) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!("UPDATE tracks SET media_art = '' WHERE media_art IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for path in chunk {
            query = query.bind(path);
        }
        query.execute(&mut *conn).await?;
    }
    Ok(())
}

/// All distinct non-empty artwork paths currently referenced.
pub async fn distinct_media_art(conn: &mut SqliteConnection) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT media_art FROM tracks WHERE media_art != ''")
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
