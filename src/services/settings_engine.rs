// Kizuna Settings Engine
// Loads, edits and persists `ArchiveSettings` as a JSON file. Missing files and
// missing sections fall back to defaults; unknown keys are rejected on edit.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::ArchiveSettings;

pub const SETTINGS_FILE: &str = "settings.json";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ArchiveSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ArchiveSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &Path;
}

/// Settings engine that persists settings as pretty-printed JSON on disk.
pub struct SettingsEngine {
    config_path: PathBuf,
    settings: ArchiveSettings,
}

impl SettingsEngine {
    /// Uses `path_override` when given, otherwise `<config dir>/settings.json`.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let config_path =
            path_override.unwrap_or_else(|| platform::get_config_dir().join(SETTINGS_FILE));
        Self {
            config_path,
            settings: ArchiveSettings::default(),
        }
    }

    fn to_json(settings: &ArchiveSettings) -> Result<Value, SettingsError> {
        serde_json::to_value(settings)
            .map_err(|e| SettingsError::SerializationError(format!("Failed to serialize settings: {}", e)))
    }
}

/// Walks `parts` down from `root` and returns the slot for the last part.
/// Only existing keys may be addressed.
fn lookup_mut<'a>(root: &'a mut Value, key: &str) -> Result<&'a mut Value, SettingsError> {
    let mut current = root;
    for part in key.split('.') {
        if part.is_empty() {
            return Err(SettingsError::InvalidKey(format!("Empty segment in '{}'", key)));
        }
        let Value::Object(map) = current else {
            return Err(SettingsError::InvalidKey(format!(
                "'{}' does not name a settings section",
                key
            )));
        };
        current = map
            .get_mut(part)
            .ok_or_else(|| SettingsError::InvalidKey(format!("Key '{}' not found in settings", key)))?;
    }
    Ok(current)
}

impl SettingsEngineTrait for SettingsEngine {
    /// Reads the settings file. A missing file yields defaults; a malformed one
    /// is a serialization error.
    fn load(&mut self) -> Result<ArchiveSettings, SettingsError> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "no settings file, using defaults");
            self.settings = ArchiveSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;
        self.settings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        fs::write(&self.config_path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    /// Updates one value by dot path (`"sync.notice_ttl_ms"`) and saves.
    ///
    /// The edited document must still deserialize into `ArchiveSettings`,
    /// otherwise nothing changes and `InvalidValue` is returned.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut document = Self::to_json(&self.settings)?;
        *lookup_mut(&mut document, key)? = value;

        self.settings = serde_json::from_value(document).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        self.save()
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ArchiveSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}
