//! Unit tests for the Kizuna database layer (connection + migrations).

use kizuna::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use kizuna::database::Database;

fn columns(db: &Database) -> Vec<String> {
    let mut stmt = db
        .connection()
        .prepare("SELECT name FROM pragma_table_info('bookmarks')")
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_current_schema_has_category() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.schema_version(), CURRENT_SCHEMA_VERSION);
    let cols = columns(&db);
    for expected in [
        "id",
        "user_id",
        "url",
        "title",
        "icon_url",
        "sort_order",
        "created_at",
        "category",
    ] {
        assert!(cols.iter().any(|c| c == expected), "missing column {}", expected);
    }
}

#[test]
fn test_schema_v1_has_no_category() {
    let db = Database::open_in_memory_at(1).unwrap();
    assert_eq!(db.schema_version(), 1);
    assert!(!columns(&db).iter().any(|c| c == "category"));
}

#[test]
fn test_upgrade_from_v1_adds_category() {
    let db = Database::open_in_memory_at(1).unwrap();
    db.connection()
        .execute(
            "INSERT INTO bookmarks (id, user_id, url, title, created_at) VALUES ('a', 'u', 'https://a.io', 'A', 1)",
            [],
        )
        .unwrap();

    run_all(db.connection()).unwrap();

    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
    let category: Option<String> = db
        .connection()
        .query_row("SELECT category FROM bookmarks WHERE id = 'a'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(category, None);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().unwrap();
    run_all(db.connection()).unwrap();
    run_all(db.connection()).unwrap();
    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, CURRENT_SCHEMA_VERSION as i64);
}

#[test]
fn test_owner_order_index_exists() {
    let db = Database::open_in_memory().unwrap();
    let exists: bool = db
        .connection()
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='index' AND name='idx_bookmarks_owner_order'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(exists);
}

#[test]
fn test_open_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.db");
    {
        let db = Database::open(&path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO bookmarks (id, user_id, url, title, created_at) VALUES ('a', 'u', 'https://a.io', 'A', 1)",
                [],
            )
            .unwrap();
    }
    let db = Database::open(&path).unwrap();
    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM bookmarks", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
