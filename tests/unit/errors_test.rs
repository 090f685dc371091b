use kizuna::types::errors::*;

// === ValidationError Tests ===

#[test]
fn validation_error_display_variants() {
    assert_eq!(ValidationError::Empty.to_string(), "Please paste a link first.");
    assert_eq!(
        ValidationError::InvalidDomain("not a domain".to_string()).to_string(),
        "Not a valid domain: not a domain"
    );
    assert_eq!(
        ValidationError::UnsupportedScheme("ftp".to_string()).to_string(),
        "Unsupported link scheme: ftp"
    );
}

#[test]
fn validation_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(ValidationError::Empty);
    assert!(err.source().is_none());
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::NotFound("bm-1".to_string()).to_string(),
        "Bookmark not found: bm-1"
    );
    assert_eq!(
        StoreError::UnknownColumn("category".to_string()).to_string(),
        "Unknown bookmark column: category"
    );
    assert_eq!(
        StoreError::DatabaseError("disk full".to_string()).to_string(),
        "Bookmark database error: disk full"
    );
    assert_eq!(
        StoreError::Unavailable("offline".to_string()).to_string(),
        "Bookmark store unavailable: offline"
    );
}

#[test]
fn store_error_from_sqlite_missing_column_on_insert() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE bookmarks (id TEXT)").unwrap();
    let err = conn
        .execute("INSERT INTO bookmarks (id, category) VALUES ('a', 'b')", [])
        .unwrap_err();
    assert_eq!(
        StoreError::from(err),
        StoreError::UnknownColumn("category".to_string())
    );
}

#[test]
fn store_error_from_sqlite_missing_column_on_update() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE bookmarks (id TEXT)").unwrap();
    let err = conn
        .execute("UPDATE bookmarks SET category = 'x' WHERE id = 'a'", [])
        .unwrap_err();
    assert_eq!(
        StoreError::from(err),
        StoreError::UnknownColumn("category".to_string())
    );
}

#[test]
fn store_error_from_other_sqlite_failure() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = conn.execute("SELECT * FROM missing_table", []).unwrap_err();
    assert!(matches!(StoreError::from(err), StoreError::DatabaseError(_)));
}

// === EventError Tests ===

#[test]
fn event_error_display_variants() {
    assert_eq!(
        EventError::MalformedPayload("missing eventType".to_string()).to_string(),
        "Malformed change payload: missing eventType"
    );
    assert_eq!(
        EventError::UnknownEventType("TRUNCATE".to_string()).to_string(),
        "Unknown change event: TRUNCATE"
    );
    assert_eq!(
        EventError::OwnerMismatch("user-2".to_string()).to_string(),
        "Change event for foreign owner: user-2"
    );
}

// === SyncError Tests ===

#[test]
fn sync_error_display() {
    assert_eq!(
        SyncError::IoError("permission denied".to_string()).to_string(),
        "Sync signal I/O error: permission denied"
    );
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("read failed".to_string()).to_string(),
        "Settings I/O error: read failed"
    );
    assert_eq!(
        SettingsError::SerializationError("bad json".to_string()).to_string(),
        "Settings serialization error: bad json"
    );
    assert_eq!(
        SettingsError::InvalidKey("sync.nope".to_string()).to_string(),
        "Invalid settings key: sync.nope"
    );
    assert_eq!(
        SettingsError::InvalidValue("expected u64".to_string()).to_string(),
        "Invalid settings value: expected u64"
    );
}

#[test]
fn all_errors_are_boxable() {
    let errors: Vec<Box<dyn std::error::Error>> = vec![
        Box::new(ValidationError::Empty),
        Box::new(StoreError::NotFound("x".into())),
        Box::new(EventError::MalformedPayload("x".into())),
        Box::new(SyncError::IoError("x".into())),
        Box::new(SettingsError::InvalidKey("x".into())),
    ];
    assert!(errors.iter().all(|e| !e.to_string().is_empty()));
}
