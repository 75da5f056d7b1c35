//! The library service: one handle owning the index store, the scan
//! worker, and the notification channel.
//!
//! Constructed once at startup and passed to whoever needs it; there is
//! no global instance. A scan runs as a single background task on the
//! runtime; starting another while one is in flight is a no-op, enforced
//! by an atomic flag checked-and-set before dispatch. Observers subscribe
//! to a broadcast channel of [`LibraryEvent`]s; sends are fire-and-forget
//! (no subscribers is fine).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::LibraryConfig;
use crate::db::{Database, SchemaState};
use crate::error::Result;
use crate::scanner::{CancelFlag, ScanOptions, ScanStats, reconcile};

/// Notifications observed by whatever front-end sits on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryEvent {
    ScanStarted,
    ScanFinished,
    /// Index content changed (scan finished, or a reset)
    IndexChanged,
    /// Artwork assignments may have changed
    ArtworkChanged,
    /// The schema check had to (re)create the tables; prior index content
    /// is gone and a full scan is due
    SchemaRecreated,
}

/// Process-wide handle to the track library.
pub struct LibraryService {
    db: Database,
    art_dir: PathBuf,
    options: ScanOptions,
    scanning: Arc<AtomicBool>,
    cancel: CancelFlag,
    events: broadcast::Sender<LibraryEvent>,
    schema_state: SchemaState,
}

impl LibraryService {
    /// Open the store, verify the schema, and build the service.
    pub async fn open(db_path: &Path, art_dir: &Path, config: &LibraryConfig) -> Result<Self> {
        let db = Database::open(db_path).await?;
        let schema_state = db.ensure_schema().await?;

        let (events, _) = broadcast::channel(32);
        if schema_state == SchemaState::Recreated {
            let _ = events.send(LibraryEvent::SchemaRecreated);
        }

        Ok(Self {
            db,
            art_dir: art_dir.to_path_buf(),
            options: ScanOptions::from_config(config),
            scanning: Arc::new(AtomicBool::new(false)),
            cancel: CancelFlag::new(),
            events,
            schema_state,
        })
    }

    /// The index store, for read queries.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The artwork cache directory.
    pub fn art_dir(&self) -> &Path {
        &self.art_dir
    }

    /// The scan options this service was configured with.
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Whether the schema check at open time had to rebuild the tables.
    pub fn schema_state(&self) -> SchemaState {
        self.schema_state
    }

    /// Subscribe to library notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.events.subscribe()
    }

    /// Whether a scan is currently in flight.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Ask an in-flight scan to stop at the next file boundary.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Run a scan to completion on the caller's task.
    ///
    /// Returns `Ok(None)` when a scan was already in flight.
    pub async fn scan(&self) -> Result<Option<ScanStats>> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        let result = run_scan(
            self.db.path().to_path_buf(),
            self.art_dir.clone(),
            self.options.clone(),
            self.cancel.clone(),
            self.scanning.clone(),
            self.events.clone(),
        )
        .await;
        result.map(Some)
    }

    /// Dispatch a scan onto the runtime as a background task.
    ///
    /// Returns `None` (and does nothing) when a scan is already in
    /// flight. Completion is observable through the returned handle or
    /// through the event channel.
    pub fn spawn_scan(&self) -> Option<JoinHandle<Result<ScanStats>>> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(tokio::spawn(run_scan(
            self.db.path().to_path_buf(),
            self.art_dir.clone(),
            self.options.clone(),
            self.cancel.clone(),
            self.scanning.clone(),
            self.events.clone(),
        )))
    }

    /// Assign an artwork image to every track on (artist, album).
    pub async fn set_media_art(&self, artist: &str, album: &str, image: &Path) -> Result<PathBuf> {
        let dest = self.db.set_media_art(&self.art_dir, artist, album, image).await?;
        let _ = self.events.send(LibraryEvent::ArtworkChanged);
        Ok(dest)
    }

    /// Drop every indexed track and the whole artwork cache.
    pub async fn reset(&self) -> Result<()> {
        self.db.reset(&self.art_dir).await?;
        let _ = self.events.send(LibraryEvent::IndexChanged);
        let _ = self.events.send(LibraryEvent::ArtworkChanged);
        Ok(())
    }
}

/// The scan body shared by [`LibraryService::scan`] and
/// [`LibraryService::spawn_scan`]. The scanning flag is already set when
/// this runs; it is cleared on every exit path.
async fn run_scan(
    db_path: PathBuf,
    art_dir: PathBuf,
    options: ScanOptions,
    cancel: CancelFlag,
    scanning: Arc<AtomicBool>,
    events: broadcast::Sender<LibraryEvent>,
) -> Result<ScanStats> {
    let _ = events.send(LibraryEvent::ScanStarted);

    let result = reconcile(&db_path, &art_dir, &options, &cancel).await;

    scanning.store(false, Ordering::SeqCst);
    let _ = events.send(LibraryEvent::ScanFinished);

    match result {
        Ok(stats) => {
            let _ = events.send(LibraryEvent::IndexChanged);
            let _ = events.send(LibraryEvent::ArtworkChanged);
            Ok(stats)
        }
        Err(e) => {
            warn!("scan failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
        service: LibraryService,
    }

    async fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("music");
        std::fs::create_dir_all(&root).unwrap();
        let root = std::fs::canonicalize(&root).unwrap();

        let config = LibraryConfig {
            roots: vec![root.clone()],
            blacklist: Vec::new(),
            prefer_directory_art: false,
        };
        let service = LibraryService::open(
            &temp.path().join("library.sqlite"),
            &temp.path().join("media-art"),
            &config,
        )
        .await
        .unwrap();

        Fixture {
            _temp: temp,
            root,
            service,
        }
    }

    #[tokio::test]
    async fn test_open_reports_schema_recreated_once() {
        let fx = fixture().await;
        assert_eq!(fx.service.schema_state(), SchemaState::Recreated);
    }

    #[tokio::test]
    async fn test_scan_indexes_and_notifies() {
        let fx = fixture().await;
        crate::test_utils::write_tagged_wav(&fx.root.join("song.wav"), 2, "T", "A", "Alb", "");

        let mut events = fx.service.subscribe();
        let stats = fx.service.scan().await.unwrap().expect("not already scanning");
        assert_eq!(stats.inserted, 1);

        assert_eq!(events.try_recv().unwrap(), LibraryEvent::ScanStarted);
        assert_eq!(events.try_recv().unwrap(), LibraryEvent::ScanFinished);
        assert_eq!(events.try_recv().unwrap(), LibraryEvent::IndexChanged);
        assert_eq!(events.try_recv().unwrap(), LibraryEvent::ArtworkChanged);

        assert_eq!(fx.service.database().tracks_count().await.unwrap(), 1);
        assert_eq!(fx.service.database().tracks_duration().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_at_most_one_scan() {
        let fx = fixture().await;

        // Simulate an in-flight scan
        fx.service.scanning.store(true, Ordering::SeqCst);
        assert!(fx.service.is_scanning());
        assert!(fx.service.spawn_scan().is_none());
        assert!(fx.service.scan().await.unwrap().is_none());

        fx.service.scanning.store(false, Ordering::SeqCst);
        assert!(fx.service.scan().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_spawn_scan_clears_flag_on_completion() {
        let fx = fixture().await;
        let handle = fx.service.spawn_scan().expect("first scan dispatches");
        let stats = handle.await.unwrap().unwrap();
        assert!(!stats.cancelled);
        assert!(!fx.service.is_scanning());
    }

    #[tokio::test]
    async fn test_reset_emits_events() {
        let fx = fixture().await;
        crate::test_utils::write_tagged_wav(&fx.root.join("song.wav"), 1, "T", "A", "", "");
        fx.service.scan().await.unwrap();

        let mut events = fx.service.subscribe();
        fx.service.reset().await.unwrap();
        assert_eq!(events.try_recv().unwrap(), LibraryEvent::IndexChanged);
        assert_eq!(events.try_recv().unwrap(), LibraryEvent::ArtworkChanged);
        assert_eq!(fx.service.database().tracks_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_media_art_through_service() {
        let fx = fixture().await;
        crate::test_utils::write_tagged_wav(&fx.root.join("song.wav"), 1, "T", "A", "Alb", "");
        fx.service.scan().await.unwrap();

        let image = fx.root.join("pick.png");
        std::fs::write(&image, crate::test_utils::png_bytes()).unwrap();

        let dest = fx.service.set_media_art("A", "Alb", &image).await.unwrap();
        assert!(dest.starts_with(fx.service.art_dir()));
        assert_eq!(
            fx.service
                .database()
                .random_media_art_for_album("A", "Alb")
                .await
                .unwrap(),
            Some(dest.to_string_lossy().into_owned())
        );
    }
}
