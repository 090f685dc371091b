// Kizuna platform paths
// Config: settings.json. Data: the SQLite archive and the sync stamp file.
//
// `KIZUNA_DATA_DIR` overrides the data directory on every platform.

use std::env;
use std::path::PathBuf;

pub const APP_DIR: &str = "kizuna";
pub const DATA_DIR_ENV: &str = "KIZUNA_DATA_DIR";

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let home = env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = env::var("HOME");
    PathBuf::from(home.unwrap_or_else(|_| env::temp_dir().to_string_lossy().to_string()))
}

/// Directory holding `settings.json`.
///
/// - **Linux**: `$XDG_CONFIG_HOME/kizuna` or `~/.config/kizuna`
/// - **macOS**: `~/Library/Application Support/kizuna`
/// - **Windows**: `%APPDATA%/kizuna`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(APP_DIR)
    }
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
            .join(APP_DIR)
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".config"))
            .join(APP_DIR)
    }
}

/// Directory holding the database and the sync stamp.
///
/// `KIZUNA_DATA_DIR` wins when set and non-empty. Otherwise:
/// - **Linux**: `$XDG_DATA_HOME/kizuna` or `~/.local/share/kizuna`
/// - **macOS**: `~/Library/Application Support/kizuna`
/// - **Windows**: `%LOCALAPPDATA%/kizuna`
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(APP_DIR)
    }
    #[cfg(target_os = "windows")]
    {
        env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
            .join(APP_DIR)
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".local").join("share"))
            .join(APP_DIR)
    }
}
