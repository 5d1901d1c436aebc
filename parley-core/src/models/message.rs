use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::Metadata;

/// Speaker of a message. Unknown roles round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
            Role::Other(s) => s,
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "tool" => Role::Tool,
            other => Role::Other(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::from(s.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message to append to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInput {
    pub role: Role,
    pub content: String,
    pub metadata: Metadata,
}

impl MessageInput {
    pub fn new(role: impl Into<Role>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets `metadata.timestamp` to `at` in RFC 3339.
    pub fn with_timestamp(self, at: DateTime<Utc>) -> Self {
        self.with_metadata("timestamp", at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub role: &'a str,
    pub role_type: &'a str,
    pub content: &'a str,
    pub metadata: &'a Metadata,
}

impl<'a> From<&'a MessageInput> for WireMessage<'a> {
    fn from(m: &'a MessageInput) -> Self {
        Self {
            role: m.role.as_str(),
            role_type: m.role.as_str(),
            content: &m.content,
            metadata: &m.metadata,
        }
    }
}

/// Body of `POST /sessions/{session_id}/memory`.
#[derive(Debug, Serialize)]
pub(crate) struct MessageBatch<'a> {
    pub messages: Vec<WireMessage<'a>>,
}

/// A stored message as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `None` when the service stored no role.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub role_type: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub token_count: Option<u32>,
}

impl Message {
    /// Role for display: `role`, then `role_type`, then `"unknown"`.
    pub fn speaker(&self) -> &str {
        self.role
            .as_ref()
            .map(Role::as_str)
            .or(self.role_type.as_deref())
            .unwrap_or("unknown")
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("timestamp")?.as_str()
    }
}
