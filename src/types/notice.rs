use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tone of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A short-lived, dismissible user notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self {
            kind,
            message: message.into(),
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub const ADD_OK: &str = "Memory archived.";
pub const ADD_FAILED: &str = "Could not archive this memory.";
pub const DELETE_OK: &str = "Memory pruned from archive.";
pub const DELETE_FAILED: &str = "Could not prune this memory.";
pub const RECATEGORIZE_FAILED: &str = "Could not update category.";
pub const REORDER_FAILED: &str = "Could not save card order.";
