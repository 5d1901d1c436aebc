use serde::{Deserialize, Serialize};

use super::{Message, Metadata, RelevantFact};

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewSession<'a> {
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub metadata: Metadata,
}

/// A session as listed by `GET /users/{user_id}/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
}

impl SessionSummary {
    /// String value of `metadata[key]`, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

/// Body of `POST /sessions/search`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SessionSearchRequest<'a> {
    pub user_id: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionSearchResponse {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub results: Vec<SessionSearchResult>,
}

/// One hit from a service-side session search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSearchResult {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub fact: Option<RelevantFact>,
    #[serde(default)]
    pub message: Option<Message>,
}
