//! Chat domain model.
//!
//! # Responsibility
//! - Define the chat record and the body-only update request.
//! - Keep the wire naming (`created_at`) stable for JSON callers.
//!
//! # Invariants
//! - `id` is assigned by the store and immutable after creation.
//! - After a successful create, `sender != receiver` and all text fields are
//!   non-empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Store-assigned chat identifier.
pub type ChatId = i64;

/// One chat message between two phone-like addresses.
///
/// Create requests deserialize into this shape directly. `id` and
/// `created_at` default when absent and are overwritten by the store and
/// the service respectively. Absent or `null` text fields decode as empty
/// strings so the validator reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(default)]
    pub id: ChatId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sender: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub receiver: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    /// Serialized as RFC3339.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Builds an unsaved chat with default `id` and `created_at`.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            sender: sender.into(),
            receiver: receiver.into(),
            body: body.into(),
            created_at: DateTime::<Utc>::default(),
        }
    }
}

/// Body-only update for one existing chat.
///
/// Only `body` travels on the wire; `id` is taken from the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateChatRequest {
    #[serde(skip)]
    pub id: ChatId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

impl UpdateChatRequest {
    pub fn new(id: ChatId, body: impl Into<String>) -> Self {
        Self {
            id,
            body: body.into(),
        }
    }

    /// Candidate record used for update-mode validation.
    ///
    /// Sender and receiver stay empty; update validation never reads them.
    pub fn to_candidate(&self) -> Chat {
        let mut candidate = Chat::new(String::new(), String::new(), self.body.clone());
        candidate.id = self.id;
        candidate
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}
