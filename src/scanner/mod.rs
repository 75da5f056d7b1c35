//! Library reconciliation engine.
//!
//! Compares the current filesystem state of the configured library roots
//! against the persisted index and applies the minimal set of inserts,
//! updates, and deletes, resolving artwork along the way. Runs as one
//! transaction on a dedicated connection:
//!
//! 1. load the index ordered by id, sweep it for rows whose file is gone,
//!    unreadable, outside every root, blacklisted, or in a no-media
//!    directory (this also covers rows the walk would never reach);
//! 2. walk every root; each file is either unknown (insert when both the
//!    extension gate and the content sniff pass), unchanged by mtime
//!    (artwork may still be re-resolved), or changed (full re-extract,
//!    delete + reinsert under the same id);
//! 3. delete the marked rows, clear references to artwork files that
//!    vanished, sweep the artwork cache for files no surviving row
//!    references, commit.
//!
//! Per-file and per-statement failures are logged and skipped; the loop
//! never propagates them. Cancellation is polled once per walked entry
//! and commits the work done so far instead of rolling back.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, UNIX_EPOCH};

use sqlx::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::classify;
use crate::config::LibraryConfig;
use crate::cover::{ArtCaches, EMBEDDED_MARKER, resolve_art};
use crate::db;
use crate::error::Result;
use crate::metadata;

/// Sentinel file excluding a directory's contents from indexing.
pub const NO_MEDIA_MARKER: &str = ".nomedia";

/// Cooperative cancellation flag, polled once per visited entry.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to scan and how to pick artwork.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Top-level directories to walk, in order
    pub roots: Vec<PathBuf>,
    /// Directory prefixes excluded from indexing
    pub blacklist: Vec<PathBuf>,
    /// Prefer a sibling image file over art embedded in the track
    pub prefer_directory_art: bool,
}

impl ScanOptions {
    pub fn from_config(config: &LibraryConfig) -> Self {
        Self {
            roots: config.roots.clone(),
            blacklist: config.blacklist.clone(),
            prefer_directory_art: config.prefer_directory_art,
        }
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Orphaned cache files deleted from the artwork directory
    pub art_removed: usize,
    /// True when the scan was cancelled mid-walk (partial progress was
    /// committed, cleanup skipped)
    pub cancelled: bool,
}

/// Scan-scoped lookup state, owned by exactly one in-flight scan.
struct ScanContext {
    art_dir: PathBuf,
    roots: Vec<PathBuf>,
    blacklist: Vec<PathBuf>,
    prefer_directory_art: bool,
    art: ArtCaches,
    no_media: HashMap<PathBuf, bool>,
}

impl ScanContext {
    fn new(art_dir: &Path, options: &ScanOptions) -> Self {
        // Resolve roots where possible so containment checks agree with
        // the absolute paths the walk produces; keep order, drop repeats.
        let mut roots: Vec<PathBuf> = Vec::new();
        for root in &options.roots {
            let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.clone());
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        let blacklist = options
            .blacklist
            .iter()
            .map(|p| std::fs::canonicalize(p).unwrap_or_else(|_| p.clone()))
            .collect();

        Self {
            art_dir: art_dir.to_path_buf(),
            roots,
            blacklist,
            prefer_directory_art: options.prefer_directory_art,
            art: ArtCaches::new(art_dir),
            no_media: HashMap::new(),
        }
    }

    fn in_library(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }

    fn is_blacklisted(&self, path: &Path) -> bool {
        self.blacklist.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Memoized check for a `.nomedia` marker in `directory`.
    fn is_no_media_dir(&mut self, directory: &Path) -> bool {
        if let Some(&cached) = self.no_media.get(directory) {
            return cached;
        }
        let marked = directory.join(NO_MEDIA_MARKER).is_file();
        self.no_media.insert(directory.to_path_buf(), marked);
        marked
    }

    fn resolve(&mut self, embedded: Option<&[u8]>, directory: &Path) -> String {
        let art_dir = self.art_dir.clone();
        resolve_art(
            embedded,
            directory,
            &art_dir,
            &mut self.art,
            self.prefer_directory_art,
        )
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
    }
}

fn file_mtime_millis(metadata: &std::fs::Metadata) -> Option<i64> {
    metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as i64)
}

/// Run one full reconciliation of the library roots against the index.
///
/// Fatal errors are limited to opening the store, starting the
/// transaction, and reading the pre-scan index; everything after that
/// degrades per file and the transaction commits whatever was validated.
pub async fn reconcile(
    db_path: &Path,
    art_dir: &Path,
    options: &ScanOptions,
    cancel: &CancelFlag,
) -> Result<ScanStats> {
    let started = Instant::now();
    info!("starting library scan");

    let mut conn = db::open_scan_connection(db_path).await?;

    if let Err(e) = std::fs::create_dir_all(art_dir) {
        warn!("failed to create media art directory {:?}: {}", art_dir, e);
    }

    let mut ctx = ScanContext::new(art_dir, options);
    let mut tx = conn.begin().await?;
    let index = db::load_file_index(&mut *tx).await?;

    // --- pre-walk sweep over the loaded index ---------------------------
    let mut files: HashMap<String, i64> = HashMap::new();
    let mut mtimes: HashMap<i64, i64> = HashMap::new();
    let mut art_by_id: HashMap<i64, String> = HashMap::new();
    let mut art_exists: HashMap<String, bool> = HashMap::new();
    let mut to_remove: Vec<i64> = Vec::new();
    let mut last_id: i64 = -1;

    for row in index {
        last_id = row.id;

        let path = Path::new(&row.file_path);
        let parent = path.parent().map(Path::to_path_buf);
        let gone = match std::fs::metadata(path) {
            Ok(md) => !md.is_file(),
            Err(_) => true,
        };
        let excluded = gone
            || !ctx.in_library(path)
            || ctx.is_blacklisted(path)
            || parent.map(|d| ctx.is_no_media_dir(&d)).unwrap_or(false);

        if excluded {
            to_remove.push(row.id);
            continue;
        }

        files.insert(row.file_path, row.id);
        mtimes.insert(row.id, row.modification_time);

        if row.media_art.is_empty() {
            art_by_id.insert(row.id, row.media_art);
        } else {
            // Art paths repeat across tracks; check existence once each.
            // A row whose art file vanished gets no entry here, which is
            // what later triggers re-resolution.
            let exists = *art_exists
                .entry(row.media_art.clone())
                .or_insert_with(|| Path::new(&row.media_art).exists());
            if exists {
                art_by_id.insert(row.id, row.media_art);
            }
        }
    }

    // --- walk ----------------------------------------------------------
    let mut stats = ScanStats::default();
    let roots = ctx.roots.clone();

    'walk: for root in &roots {
        for entry in WalkDir::new(root).follow_links(true) {
            if cancel.is_cancelled() {
                warn!("scan cancelled, committing partial progress");
                stats.cancelled = true;
                break 'walk;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            let Some(path_str) = path.to_str() else {
                warn!("skipping non-UTF-8 path {:?}", path);
                continue;
            };
            let Ok(md) = entry.metadata() else {
                debug!("skipping unreadable file {:?}", path);
                continue;
            };
            let Some(disk_mtime) = file_mtime_millis(&md) else {
                continue;
            };

            match files.get(path_str).copied() {
                None => {
                    handle_new_file(&mut tx, &mut ctx, path, path_str, disk_mtime, &mut last_id, &mut stats)
                        .await;
                }
                Some(id) => {
                    let known_mtime = mtimes.get(&id).copied().unwrap_or(-1);
                    if disk_mtime == known_mtime {
                        handle_unchanged_file(&mut tx, &mut ctx, path, id, &art_by_id, &mut stats)
                            .await;
                    } else {
                        handle_changed_file(
                            &mut tx, &mut ctx, path, path_str, id, disk_mtime, &mut to_remove,
                            &mut stats,
                        )
                        .await;
                    }
                }
            }
        }
    }

    if stats.cancelled {
        tx.commit().await?;
        return Ok(stats);
    }

    // --- post-walk cleanup ---------------------------------------------
    if !to_remove.is_empty() {
        debug!("removing {} tracks from the index", to_remove.len());
        match db::delete_tracks(&mut tx, &to_remove).await {
            Ok(()) => stats.removed = to_remove.len(),
            Err(e) => warn!("failed to remove tracks: {}", e),
        }
    }

    let dead_art: Vec<String> = art_exists
        .iter()
        .filter(|&(_, &exists)| !exists)
        .map(|(path, _)| path.clone())
        .collect();
    if !dead_art.is_empty() {
        if let Err(e) = db::clear_media_art(&mut tx, &dead_art).await {
            warn!("failed to clear dangling artwork references: {}", e);
        }
    }

    match db::distinct_media_art(&mut tx).await {
        Ok(referenced) => {
            let referenced: HashSet<String> = referenced.into_iter().collect();
            stats.art_removed = sweep_art_dir(art_dir, &referenced);
        }
        Err(e) => {
            // Without the reference set the sweep could delete live art
            warn!("failed to read referenced artwork, skipping cache sweep: {}", e);
        }
    }

    tx.commit().await?;
    info!(
        inserted = stats.inserted,
        updated = stats.updated,
        removed = stats.removed,
        art_removed = stats.art_removed,
        "scan finished in {} ms",
        started.elapsed().as_millis()
    );
    Ok(stats)
}

/// A file the index has never seen: insert it if both recognition stages
/// pass and it yields usable metadata.
async fn handle_new_file(
    tx: &mut sqlx::SqliteConnection,
    ctx: &mut ScanContext,
    path: &Path,
    path_str: &str,
    mtime: i64,
    last_id: &mut i64,
    stats: &mut ScanStats,
) {
    let Some(parent) = path.parent().map(Path::to_path_buf) else {
        return;
    };
    if ctx.is_no_media_dir(&parent) || ctx.is_blacklisted(path) {
        return;
    }
    if !classify::has_audio_extension(path) {
        return;
    }
    if classify::sniff_audio(path).is_none() {
        return;
    }

    let Some(track) = metadata::extract(path) else {
        debug!("no usable metadata in {:?}", path);
        return;
    };

    let art = ctx.resolve(track.embedded_art.as_deref(), &parent);

    *last_id += 1;
    match db::insert_track(tx, *last_id, path_str, mtime, &track, &art).await {
        Ok(()) => stats.inserted += 1,
        Err(e) => warn!("failed to insert {:?}: {}", path, e),
    }
}

/// A file whose mtime matches the index: tags are left alone, but the
/// artwork column may need refreshing.
///
/// The rules, in order:
/// - user-assigned art (in the cache dir without the embedded marker) is
///   never touched;
/// - embedded art stays as-is unless directory art is preferred;
/// - embedded bytes are only re-read from the file when the stored art
///   was an external path whose file vanished;
/// - an embedded-art row is never downgraded to "no artwork".
async fn handle_unchanged_file(
    tx: &mut sqlx::SqliteConnection,
    ctx: &mut ScanContext,
    path: &Path,
    id: i64,
    art_by_id: &HashMap<i64, String>,
    stats: &mut ScanStats,
) {
    let (media_art, art_file_gone) = match art_by_id.get(&id) {
        Some(art) => (art.clone(), false),
        None => (String::new(), true),
    };

    let embedded_or_manual = !media_art.is_empty() && Path::new(&media_art).starts_with(&ctx.art_dir);
    let embedded = embedded_or_manual && media_art.contains(EMBEDDED_MARKER);
    let manual = embedded_or_manual && !embedded;

    if manual {
        return;
    }
    if embedded && !ctx.prefer_directory_art {
        return;
    }

    // Stored art was empty or embedded: the resolver can work from the
    // caches alone. Only a dead external path forces re-reading the tags.
    let embedded_bytes = if (!art_file_gone && media_art.is_empty()) || embedded {
        None
    } else {
        metadata::extract(path).and_then(|t| t.embedded_art)
    };

    let Some(parent) = path.parent().map(Path::to_path_buf) else {
        return;
    };
    let new_art = ctx.resolve(embedded_bytes.as_deref(), &parent);

    if (embedded && new_art.is_empty()) || new_art == media_art {
        return;
    }
    match db::update_media_art(tx, id, &new_art).await {
        Ok(()) => stats.updated += 1,
        Err(e) => warn!("failed to update artwork for {:?}: {}", path, e),
    }
}

/// A file whose mtime moved: re-extract everything. If it is no longer
/// recognizable audio it leaves the index; otherwise its rows are
/// replaced under the same id.
async fn handle_changed_file(
    tx: &mut sqlx::SqliteConnection,
    ctx: &mut ScanContext,
    path: &Path,
    path_str: &str,
    id: i64,
    mtime: i64,
    to_remove: &mut Vec<i64>,
    stats: &mut ScanStats,
) {
    if classify::sniff_audio(path).is_none() {
        to_remove.push(id);
        return;
    }
    let Some(track) = metadata::extract(path) else {
        to_remove.push(id);
        return;
    };

    let Some(parent) = path.parent().map(Path::to_path_buf) else {
        return;
    };
    let art = ctx.resolve(track.embedded_art.as_deref(), &parent);

    if let Err(e) = db::delete_tracks(tx, &[id]).await {
        warn!("failed to replace {:?}: {}", path, e);
        return;
    }
    match db::insert_track(tx, id, path_str, mtime, &track, &art).await {
        Ok(()) => stats.updated += 1,
        Err(e) => warn!("failed to reinsert {:?}: {}", path, e),
    }
}

/// Delete cache files no surviving row references. Returns how many went.
fn sweep_art_dir(art_dir: &Path, referenced: &HashSet<String>) -> usize {
    let Ok(entries) = std::fs::read_dir(art_dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if referenced.contains(path.to_string_lossy().as_ref()) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("removed orphaned artwork {:?}", path);
                removed += 1;
            }
            Err(e) => warn!("failed to remove orphaned artwork {:?}: {}", path, e),
        }
    }
    removed
}
