use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level archive settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArchiveSettings {
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub bookmarks: BookmarkSettings,
    #[serde(default)]
    pub metadata: MetadataSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Timing of refreshes, notices and the cross-surface signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Minimum time the refreshing indicator stays on after a refetch starts.
    pub min_refresh_ms: u64,
    /// How long a notice stays visible before it is dismissed automatically.
    pub notice_ttl_ms: u64,
    /// Poll interval of the file-backed sync bus.
    pub signal_poll_ms: u64,
    /// Shared stamp file. When unset, signals stay inside the process.
    pub signal_file: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            min_refresh_ms: 900,
            notice_ttl_ms: 3200,
            signal_poll_ms: 500,
            signal_file: None,
        }
    }
}

impl SyncSettings {
    pub fn min_refresh(&self) -> Duration {
        Duration::from_millis(self.min_refresh_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn signal_poll(&self) -> Duration {
        // A zero interval would spin the poller.
        Duration::from_millis(self.signal_poll_ms.max(10))
    }
}

/// Input handling for new and edited bookmarks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarkSettings {
    /// Scheme prepended to bare domains.
    pub default_scheme: String,
    /// Maximum length of a user category label, in characters.
    pub category_max_chars: usize,
}

impl Default for BookmarkSettings {
    fn default() -> Self {
        Self {
            default_scheme: "https".to_string(),
            category_max_chars: 32,
        }
    }
}

/// HTTP metadata lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataSettings {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 8000,
            user_agent: "Mozilla/5.0 (compatible; KizunaArchive/1.0)".to_string(),
        }
    }
}

/// Local database location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// File name inside the data directory, or an absolute path.
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "kizuna.db".to_string(),
        }
    }
}
