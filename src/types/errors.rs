use std::fmt;

// === ValidationError ===

/// Errors raised while checking user input, before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing was entered.
    Empty,
    /// The input does not look like a domain or web address.
    InvalidDomain(String),
    /// The address uses a scheme other than http or https.
    UnsupportedScheme(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty => write!(f, "Please paste a link first."),
            ValidationError::InvalidDomain(input) => {
                write!(f, "Not a valid domain: {}", input)
            }
            ValidationError::UnsupportedScheme(scheme) => {
                write!(f, "Unsupported link scheme: {}", scheme)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// === StoreError ===

/// Errors reported by the bookmark store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row with the given id exists for the owner.
    NotFound(String),
    /// The store schema does not know the named column.
    UnknownColumn(String),
    /// Database operation failed.
    DatabaseError(String),
    /// The store could not be reached.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            StoreError::UnknownColumn(column) => {
                write!(f, "Unknown bookmark column: {}", column)
            }
            StoreError::DatabaseError(msg) => write!(f, "Bookmark database error: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Bookmark store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let msg = err.to_string();
        // SQLite reports "table bookmarks has no column named category" on insert
        // and "no such column: category" on update.
        for marker in ["has no column named ", "no such column: "] {
            if let Some(pos) = msg.find(marker) {
                let column = msg[pos + marker.len()..]
                    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .next()
                    .unwrap_or_default();
                return StoreError::UnknownColumn(column.to_string());
            }
        }
        StoreError::DatabaseError(msg)
    }
}

// === EventError ===

/// Errors raised while validating a realtime payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The payload does not have the expected shape.
    MalformedPayload(String),
    /// The payload names an event type this client does not handle.
    UnknownEventType(String),
    /// The affected row belongs to a different owner.
    OwnerMismatch(String),
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::MalformedPayload(msg) => write!(f, "Malformed change payload: {}", msg),
            EventError::UnknownEventType(kind) => write!(f, "Unknown change event: {}", kind),
            EventError::OwnerMismatch(owner) => {
                write!(f, "Change event for foreign owner: {}", owner)
            }
        }
    }
}

impl std::error::Error for EventError {}

// === SyncError ===

/// Errors related to the cross-surface sync signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Reading or writing the shared signal file failed.
    IoError(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::IoError(msg) => write!(f, "Sync signal I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The settings key is invalid or not found.
    InvalidKey(String),
    /// The provided value is invalid for the setting.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}
