//! Realtime change events and the validating parse step for raw payloads.
//!
//! Payloads arrive in the row-change shape used by the store's feed:
//! `{"eventType": "INSERT" | "UPDATE" | "DELETE", "new": {..}, "old": {..}}`.
//! Nothing from a payload is trusted until it has been through [`ChangeEvent::parse`].

use serde_json::{json, Value};

use super::bookmark::Bookmark;
use super::errors::EventError;

/// A typed row change for a single bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Bookmark),
    Update(Bookmark),
    /// Delete payloads may carry only the primary key, so the owner is optional.
    Delete { id: String, user_id: Option<String> },
}

impl ChangeEvent {
    /// Parses and shape-checks a raw feed payload.
    pub fn parse(payload: &Value) -> Result<Self, EventError> {
        let event_type = payload
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or_else(|| EventError::MalformedPayload("missing eventType".to_string()))?;

        match event_type {
            "INSERT" => Ok(ChangeEvent::Insert(parse_row(payload, "new")?)),
            "UPDATE" => Ok(ChangeEvent::Update(parse_row(payload, "new")?)),
            "DELETE" => {
                let old = payload
                    .get("old")
                    .and_then(Value::as_object)
                    .ok_or_else(|| EventError::MalformedPayload("missing 'old' record".to_string()))?;
                let id = old
                    .get("id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| EventError::MalformedPayload("delete without id".to_string()))?;
                let user_id = old.get("user_id").and_then(Value::as_str).map(str::to_string);
                Ok(ChangeEvent::Delete {
                    id: id.to_string(),
                    user_id,
                })
            }
            other => Err(EventError::UnknownEventType(other.to_string())),
        }
    }

    /// Id of the affected row.
    pub fn id(&self) -> &str {
        match self {
            ChangeEvent::Insert(b) | ChangeEvent::Update(b) => &b.id,
            ChangeEvent::Delete { id, .. } => id,
        }
    }

    /// Owner of the affected row, when the payload carries one.
    pub fn owner(&self) -> Option<&str> {
        match self {
            ChangeEvent::Insert(b) | ChangeEvent::Update(b) => Some(&b.user_id),
            ChangeEvent::Delete { user_id, .. } => user_id.as_deref(),
        }
    }

    /// Renders the event back into the feed's wire shape.
    pub fn to_payload(&self) -> Value {
        match self {
            ChangeEvent::Insert(b) => json!({"eventType": "INSERT", "new": b, "old": {}}),
            ChangeEvent::Update(b) => json!({"eventType": "UPDATE", "new": b, "old": {"id": b.id}}),
            ChangeEvent::Delete { id, user_id } => json!({
                "eventType": "DELETE",
                "new": {},
                "old": {"id": id, "user_id": user_id},
            }),
        }
    }
}

fn parse_row(payload: &Value, key: &str) -> Result<Bookmark, EventError> {
    let row = payload
        .get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| EventError::MalformedPayload(format!("missing '{}' record", key)))?;

    let bookmark: Bookmark = serde_json::from_value(row.clone())
        .map_err(|e| EventError::MalformedPayload(e.to_string()))?;

    if bookmark.id.is_empty() {
        return Err(EventError::MalformedPayload("empty id".to_string()));
    }
    Ok(bookmark)
}
