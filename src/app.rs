//! App Core for Kizuna.
//!
//! Wires settings, the SQLite store, the sync bus, the metadata resolver and
//! the identity together, and builds sessions on top of them.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::database::Database;
use crate::managers::bookmark_session::BookmarkSession;
use crate::managers::bookmark_store::{BookmarkStore, SqliteBookmarkStore};
use crate::platform;
use crate::services::identity::SessionIdentity;
use crate::services::metadata_resolver::{MetadataResolver, OfflineMetadataResolver};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::sync_signal::{FileSyncBus, LocalSyncBus, SyncBus};
use crate::types::settings::ArchiveSettings;

/// Everything a surface needs, shared by all sessions of one process.
pub struct App {
    pub settings: ArchiveSettings,
    pub store: Arc<SqliteBookmarkStore>,
    pub sync_bus: Arc<dyn SyncBus>,
    pub resolver: Arc<dyn MetadataResolver>,
    pub identity: Arc<SessionIdentity>,
}

impl App {
    /// Loads settings from the default location and opens the archive in the
    /// platform data directory.
    pub fn from_environment() -> Result<Self, Box<dyn Error>> {
        let mut engine = SettingsEngine::new(None);
        let settings = engine.load()?;
        info!(path = %engine.get_config_path().display(), "settings loaded");
        Self::open(&platform::get_data_dir(), settings)
    }

    /// Opens (or creates) the archive under `data_dir`.
    pub fn open(data_dir: &Path, settings: ArchiveSettings) -> Result<Self, Box<dyn Error>> {
        fs::create_dir_all(data_dir)
            .map_err(|e| format!("Failed to create data directory {}: {}", data_dir.display(), e))?;

        let db_path = resolve_in(data_dir, &settings.storage.database_file);
        info!(path = %db_path.display(), "opening bookmark archive");
        let db = Database::open(&db_path)?;

        let sync_bus: Arc<dyn SyncBus> = match &settings.sync.signal_file {
            Some(file) => {
                let path = resolve_in(data_dir, file);
                info!(path = %path.display(), "cross-process sync signal enabled");
                Arc::new(FileSyncBus::new(path, settings.sync.signal_poll()))
            }
            None => Arc::new(LocalSyncBus::new()),
        };

        Ok(Self::assemble(SqliteBookmarkStore::new(db), sync_bus, settings))
    }

    /// In-memory archive with an in-process bus and no network access.
    pub fn in_memory(settings: ArchiveSettings) -> Result<Self, Box<dyn Error>> {
        let store = SqliteBookmarkStore::open_in_memory()?;
        let mut app = Self::assemble(store, Arc::new(LocalSyncBus::new()), settings);
        app.resolver = Arc::new(OfflineMetadataResolver);
        Ok(app)
    }

    fn assemble(store: SqliteBookmarkStore, sync_bus: Arc<dyn SyncBus>, settings: ArchiveSettings) -> Self {
        Self {
            resolver: build_resolver(&settings),
            store: Arc::new(store),
            sync_bus,
            identity: Arc::new(SessionIdentity::new(None)),
            settings,
        }
    }

    /// A new surface for whoever is currently signed in.
    pub fn session(&self) -> BookmarkSession {
        let store: Arc<dyn BookmarkStore> = self.store.clone();
        BookmarkSession::new(
            store,
            self.resolver.clone(),
            self.sync_bus.clone(),
            self.identity.clone(),
            self.settings.clone(),
        )
    }
}

fn resolve_in(dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

#[cfg(feature = "network")]
fn build_resolver(settings: &ArchiveSettings) -> Arc<dyn MetadataResolver> {
    use crate::services::metadata_resolver::HttpMetadataResolver;

    match HttpMetadataResolver::new(&settings.metadata) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            warn!(error = %e, "HTTP client unavailable, page titles will not be resolved");
            Arc::new(OfflineMetadataResolver)
        }
    }
}

#[cfg(not(feature = "network"))]
fn build_resolver(_settings: &ArchiveSettings) -> Arc<dyn MetadataResolver> {
    warn!("built without the network feature, page titles will not be resolved");
    Arc::new(OfflineMetadataResolver)
}
