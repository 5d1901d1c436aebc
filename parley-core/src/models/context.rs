use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Message, Metadata};

/// A fact the service derived from conversation history. Opaque to the client;
/// unrecognised fields are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevantFact {
    #[serde(default)]
    pub fact: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(flatten)]
    pub extra: Metadata,
}

/// Point-in-time view of a session returned by `GET /sessions/{id}/memory`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub messages: Vec<Message>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub relevant_facts: Vec<RelevantFact>,
    /// Service-generated context/summary text.
    #[serde(default)]
    pub context: Option<String>,
}

impl ContextSnapshot {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Drops all but the most recent `n` messages.
    pub(crate) fn keep_last(&mut self, n: usize) {
        if self.messages.len() > n {
            let excess = self.messages.len() - n;
            self.messages.drain(..excess);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub session_id: String,
    pub message_count: usize,
    pub relevant_facts: Vec<RelevantFact>,
    pub context_text: String,
    /// Local time of retrieval, not a service value.
    pub retrieved_at: DateTime<Utc>,
}

impl ConversationSummary {
    pub(crate) fn from_snapshot(
        session_id: &str,
        snapshot: ContextSnapshot,
        retrieved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            message_count: snapshot.message_count(),
            relevant_facts: snapshot.relevant_facts,
            context_text: snapshot.context.unwrap_or_default(),
            retrieved_at,
        }
    }
}
