//! Unit tests for the RPC handler: method parsing, identity methods, request
//! envelopes and an end-to-end pass through `App` and a running session.

use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;

use kizuna::app::App;
use kizuna::managers::bookmark_session::SessionCommand;
use kizuna::rpc_handler::{handle_method, handle_request, parse_command, view_event};
use kizuna::services::identity::{IdentityProvider, SessionIdentity};
use kizuna::types::bookmark::AddBookmarkRequest;
use kizuna::types::settings::ArchiveSettings;
use kizuna::types::view::BookmarkView;

fn setup() -> (SessionIdentity, mpsc::Sender<SessionCommand>, mpsc::Receiver<SessionCommand>) {
    let (tx, rx) = mpsc::channel(8);
    (SessionIdentity::new(None), tx, rx)
}

// ─── Ping & unknown ───

#[test]
fn test_ping() {
    let (identity, tx, _rx) = setup();
    let res = handle_method(&identity, &tx, "ping", &json!({})).unwrap();
    assert_eq!(res, json!({"pong": true}));
}

#[test]
fn test_unknown_method_returns_error() {
    let (identity, tx, _rx) = setup();
    let res = handle_method(&identity, &tx, "nonexistent.method", &json!({}));
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Auth ───

#[test]
fn test_sign_in_and_out_switch_identity() {
    let (identity, tx, _rx) = setup();
    handle_method(&identity, &tx, "auth.sign_in", &json!({"owner_id": "alice"})).unwrap();
    assert_eq!(identity.current_owner().as_deref(), Some("alice"));

    handle_method(&identity, &tx, "auth.sign_out", &json!({})).unwrap();
    assert_eq!(identity.current_owner(), None);
}

#[test]
fn test_sign_in_requires_owner() {
    let (identity, tx, _rx) = setup();
    assert!(handle_method(&identity, &tx, "auth.sign_in", &json!({})).is_err());
    assert!(handle_method(&identity, &tx, "auth.sign_in", &json!({"owner_id": "  "})).is_err());
    assert_eq!(identity.current_owner(), None);
}

// ─── Session commands ───

#[test]
fn test_commands_are_queued_for_the_session() {
    let (identity, tx, mut rx) = setup();
    let res = handle_method(
        &identity,
        &tx,
        "bookmark.add",
        &json!({"url": "docs.rs", "category": "Rust"}),
    )
    .unwrap();
    assert_eq!(res, json!({"ok": true}));
    assert_eq!(
        rx.try_recv().unwrap(),
        SessionCommand::Add(AddBookmarkRequest {
            url: "docs.rs".into(),
            category: Some("Rust".into()),
        })
    );
}

#[test]
fn test_parse_every_session_method() {
    let cases: Vec<(&str, Value, SessionCommand)> = vec![
        ("bookmark.refresh", json!({}), SessionCommand::Refresh),
        (
            "bookmark.request_delete",
            json!({"id": "b1"}),
            SessionCommand::RequestDelete("b1".into()),
        ),
        ("bookmark.confirm_delete", json!({}), SessionCommand::ConfirmDelete),
        ("bookmark.cancel_delete", json!({}), SessionCommand::CancelDelete),
        (
            "bookmark.recategorize",
            json!({"id": "b1", "category": ""}),
            SessionCommand::Recategorize {
                id: "b1".into(),
                category: String::new(),
            },
        ),
        (
            "bookmark.reorder",
            json!({"dragged_id": "a", "target_id": "b"}),
            SessionCommand::Reorder {
                dragged_id: "a".into(),
                target_id: "b".into(),
            },
        ),
        (
            "view.select_category",
            json!({"category": "Dev"}),
            SessionCommand::SelectCategory("Dev".into()),
        ),
        ("notice.dismiss", json!({}), SessionCommand::DismissNotice),
    ];

    for (method, params, expected) in cases {
        assert_eq!(parse_command(method, &params).unwrap(), expected, "{}", method);
    }
}

#[test]
fn test_missing_params_are_reported() {
    assert_eq!(
        parse_command("bookmark.add", &json!({})).unwrap_err(),
        "missing url"
    );
    assert_eq!(
        parse_command("bookmark.reorder", &json!({"dragged_id": "a"})).unwrap_err(),
        "missing target_id"
    );
}

#[test]
fn test_closed_session_is_an_error() {
    let (identity, tx, rx) = setup();
    drop(rx);
    let err = handle_method(&identity, &tx, "bookmark.refresh", &json!({})).unwrap_err();
    assert!(err.starts_with("session unavailable"));
}

// ─── Envelopes ───

#[test]
fn test_request_envelope() {
    let (identity, tx, _rx) = setup();
    let ok = handle_request(&identity, &tx, r#"{"id": 7, "method": "ping"}"#);
    assert_eq!(ok, json!({"id": 7, "result": {"pong": true}}));

    let err = handle_request(&identity, &tx, r#"{"id": "x", "method": "bookmark.add"}"#);
    assert_eq!(err, json!({"id": "x", "error": "missing url"}));

    let garbage = handle_request(&identity, &tx, "{nope");
    assert_eq!(garbage["id"], Value::Null);
    assert!(garbage["error"].as_str().unwrap().starts_with("parse error"));
}

#[test]
fn test_view_event_shape() {
    let event = view_event(&BookmarkView::default());
    assert_eq!(event["event"], "view");
    assert_eq!(event["view"]["total"], 0);
    assert!(event["view"]["groups"].as_array().unwrap().is_empty());
}

// ─── End to end ───

#[tokio::test]
async fn test_end_to_end_through_app() {
    let tmp = TempDir::new().unwrap();
    let mut settings = ArchiveSettings::default();
    settings.sync.min_refresh_ms = 0;
    settings.sync.signal_file = Some("sync.stamp".to_string());
    let mut app = App::open(tmp.path(), settings).unwrap();
    app.resolver = std::sync::Arc::new(kizuna::services::metadata_resolver::OfflineMetadataResolver);

    let session = app.session();
    let mut views = session.view_updates();
    let (tx, rx) = mpsc::channel(8);
    let task = tokio::spawn(session.run(rx));

    let signed_in = handle_request(
        &app.identity,
        &tx,
        r#"{"id": 1, "method": "auth.sign_in", "params": {"owner_id": "alice"}}"#,
    );
    assert_eq!(signed_in["result"]["ok"], true);
    handle_request(
        &app.identity,
        &tx,
        r#"{"id": 2, "method": "bookmark.add", "params": {"url": "github.com/rust-lang"}}"#,
    );

    let view = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            views.changed().await.unwrap();
            let view = views.borrow_and_update().clone();
            if view.total == 1 && !view.is_adding {
                return view;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(view.owner_id.as_deref(), Some("alice"));
    assert_eq!(view.groups[0].label, "Dev");
    assert_eq!(view.groups[0].bookmarks[0].url, "https://github.com/rust-lang");
    assert!(tmp.path().join("kizuna.db").exists());

    drop(tx);
    task.await.unwrap();
}
