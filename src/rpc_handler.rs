//! RPC method handler for the Kizuna JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested without stdin.
//! Identity methods act on the [`SessionIdentity`] directly; every other
//! method becomes a [`SessionCommand`] queued for the session loop.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::managers::bookmark_session::SessionCommand;
use crate::services::identity::SessionIdentity;
use crate::types::bookmark::AddBookmarkRequest;
use crate::types::view::BookmarkView;

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing {}", name))
}

/// Maps a bookmark/view/notice method to a session command.
pub fn parse_command(method: &str, params: &Value) -> Result<SessionCommand, String> {
    let command = match method {
        "bookmark.refresh" => SessionCommand::Refresh,
        "bookmark.add" => SessionCommand::Add(AddBookmarkRequest {
            url: str_param(params, "url")?.to_string(),
            category: params
                .get("category")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        "bookmark.request_delete" => SessionCommand::RequestDelete(str_param(params, "id")?.to_string()),
        "bookmark.confirm_delete" => SessionCommand::ConfirmDelete,
        "bookmark.cancel_delete" => SessionCommand::CancelDelete,
        "bookmark.recategorize" => SessionCommand::Recategorize {
            id: str_param(params, "id")?.to_string(),
            category: str_param(params, "category")?.to_string(),
        },
        "bookmark.reorder" => SessionCommand::Reorder {
            dragged_id: str_param(params, "dragged_id")?.to_string(),
            target_id: str_param(params, "target_id")?.to_string(),
        },
        "view.select_category" => SessionCommand::SelectCategory(str_param(params, "category")?.to_string()),
        "notice.dismiss" => SessionCommand::DismissNotice,
        other => return Err(format!("unknown method: {}", other)),
    };
    Ok(command)
}

/// Dispatches one method call.
///
/// Returns `Ok(Value)` once the call is accepted. Results of session commands
/// arrive later as view events.
pub fn handle_method(
    identity: &SessionIdentity,
    commands: &mpsc::Sender<SessionCommand>,
    method: &str,
    params: &Value,
) -> Result<Value, String> {
    match method {
        "ping" => return Ok(json!({"pong": true})),
        "auth.sign_in" => {
            let owner_id = str_param(params, "owner_id")?.trim();
            if owner_id.is_empty() {
                return Err("owner_id cannot be empty".to_string());
            }
            identity.sign_in(owner_id);
        }
        "auth.sign_out" => identity.sign_out(),
        _ => {
            let command = parse_command(method, params)?;
            commands
                .try_send(command)
                .map_err(|e| format!("session unavailable: {}", e))?;
        }
    }
    Ok(json!({"ok": true}))
}

/// Handles one request line and returns the response object.
pub fn handle_request(
    identity: &SessionIdentity,
    commands: &mpsc::Sender<SessionCommand>,
    line: &str,
) -> Value {
    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return json!({"id": null, "error": format!("parse error: {}", e)}),
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

    match handle_method(identity, commands, method, &params) {
        Ok(result) => json!({"id": id, "result": result}),
        Err(error) => json!({"id": id, "error": error}),
    }
}

/// Wraps a view snapshot as an unsolicited event.
pub fn view_event(view: &BookmarkView) -> Value {
    json!({"event": "view", "view": view})
}
