//! HTTP client for a Zep-compatible conversational memory service.
//!
//! `ConversationClient` maps each conversation operation onto one request:
//! - `POST /users`, `GET /users/{user_id}`
//! - `POST /sessions`, `GET /users/{user_id}/sessions`, `POST /sessions/search`
//! - `POST /sessions/{session_id}/memory`, `GET /sessions/{session_id}/memory?lastn=N`
//! - `GET /healthz` on the service origin
//!
//! Every request carries `Authorization: Api-Key <key>` (except the health probe).
//! Non-2xx responses become [`ClientError::Service`]; nothing is retried.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::ids;
use crate::models::message::{MessageBatch, WireMessage};
use crate::models::session::{NewSession, SessionSearchRequest, SessionSearchResponse};
use crate::models::{
    ContextSnapshot, ConversationSummary, MessageInput, Metadata, NewUser, SessionSearchResult,
    SessionSummary, User,
};

/// Messages requested by `get_context` callers that have no preference.
pub const DEFAULT_LAST_N: u32 = 10;

#[derive(Clone)]
pub struct ConversationClient {
    client: Client,
    base_url: Url,
    health_url: Url,
    auth_header: HeaderValue,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ConversationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationClient")
            .field("base_url", &self.base_url.as_str())
            .field("health_url", &self.health_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ConversationClient {
    pub fn new(config: ServiceConfig) -> Result<Self, ClientError> {
        if config.api_key.is_empty() {
            return Err(ClientError::MissingApiKey);
        }
        let mut auth_header = HeaderValue::from_str(&format!("Api-Key {}", config.api_key))
            .map_err(|_| {
                ClientError::InvalidArgument(
                    "api key contains characters not allowed in an HTTP header".to_string(),
                )
            })?;
        auth_header.set_sensitive(true);

        if config.timeout_seconds == 0 {
            return Err(ClientError::InvalidArgument(
                "timeout_seconds must be a positive integer".to_string(),
            ));
        }

        let mut base_url = parse_url(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);

        let health_url = match &config.health_url {
            Some(url) => parse_url(url)?,
            None => {
                let mut url = base_url.clone();
                url.set_path("/healthz");
                url
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            health_url,
            auth_header,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for locally generated timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    pub async fn create_user(&self, user: &NewUser) -> Result<User, ClientError> {
        let url = self.endpoint(&["users"])?;
        let body = self.execute(self.request(Method::POST, url).json(user)).await?;
        decode(&body)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, ClientError> {
        let url = self.endpoint(&["users", user_id])?;
        let body = self.execute(self.request(Method::GET, url)).await?;
        decode(&body)
    }

    /// Like [`get_user`](Self::get_user) but a 404 yields `Ok(None)`.
    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>, ClientError> {
        match self.get_user(user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    /// Create a session and return its id. Without `session_id` a `conv-xxxxxxxx`
    /// id is generated before the request is sent.
    pub async fn create_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<String, ClientError> {
        let session_id = match session_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => ids::session_id(),
        };

        let url = self.endpoint(&["sessions"])?;
        let body = NewSession {
            user_id,
            session_id: &session_id,
            metadata: metadata.unwrap_or_default(),
        };
        self.execute(self.request(Method::POST, url).json(&body))
            .await?;

        tracing::debug!(session_id = %session_id, user_id = %user_id, "Session created");
        Ok(session_id)
    }

    /// Sessions owned by `user_id`, in service order.
    pub async fn get_user_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, ClientError> {
        let url = self.endpoint(&["users", user_id, "sessions"])?;
        let body = self.execute(self.request(Method::GET, url)).await?;
        let sessions: Option<Vec<SessionSummary>> = decode(&body)?;
        Ok(sessions.unwrap_or_default())
    }

    /// Service-side search over a user's conversations. Requires a service that
    /// implements `POST /sessions/search`.
    pub async fn search_sessions(
        &self,
        user_id: &str,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<SessionSearchResult>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::InvalidArgument(
                "search query must not be empty".to_string(),
            ));
        }

        let url = self.endpoint(&["sessions", "search"])?;
        let request = SessionSearchRequest {
            user_id,
            text: query,
            limit,
        };
        let body = self
            .execute(self.request(Method::POST, url).json(&request))
            .await?;
        let response: SessionSearchResponse = decode(&body)?;
        Ok(response.results)
    }

    // ------------------------------------------------------------------------
    // Messages and context
    // ------------------------------------------------------------------------

    pub async fn add_message(
        &self,
        session_id: &str,
        message: MessageInput,
    ) -> Result<(), ClientError> {
        self.add_message_batch(session_id, std::slice::from_ref(&message))
            .await
    }

    /// Append `messages` in order with a single request. The service accepts or
    /// rejects the batch as a whole.
    pub async fn add_message_batch(
        &self,
        session_id: &str,
        messages: &[MessageInput],
    ) -> Result<(), ClientError> {
        if messages.is_empty() {
            return Err(ClientError::InvalidArgument(
                "message batch must not be empty".to_string(),
            ));
        }

        let url = self.endpoint(&["sessions", session_id, "memory"])?;
        let batch = MessageBatch {
            messages: messages.iter().map(WireMessage::from).collect(),
        };
        self.execute(self.request(Method::POST, url).json(&batch))
            .await?;

        tracing::debug!(session_id = %session_id, count = messages.len(), "Messages appended");
        Ok(())
    }

    /// The most recent `last_n` messages plus relevant facts. Never returns more
    /// than `last_n` messages.
    pub async fn get_context(
        &self,
        session_id: &str,
        last_n: u32,
    ) -> Result<ContextSnapshot, ClientError> {
        if last_n == 0 {
            return Err(ClientError::InvalidArgument(
                "lastn must be a positive integer".to_string(),
            ));
        }

        let mut url = self.endpoint(&["sessions", session_id, "memory"])?;
        url.query_pairs_mut()
            .append_pair("lastn", &last_n.to_string());

        let body = self.execute(self.request(Method::GET, url)).await?;
        let mut snapshot: ContextSnapshot = decode(&body)?;

        if snapshot.messages.len() > last_n as usize {
            tracing::warn!(
                session_id = %session_id,
                requested = last_n,
                returned = snapshot.messages.len(),
                "Service returned more messages than requested; truncating"
            );
            snapshot.keep_last(last_n as usize);
        }

        Ok(snapshot)
    }

    pub async fn get_conversation_summary(
        &self,
        session_id: &str,
    ) -> Result<ConversationSummary, ClientError> {
        let snapshot = self.get_context(session_id, DEFAULT_LAST_N).await?;
        Ok(ConversationSummary::from_snapshot(
            session_id,
            snapshot,
            self.clock.now(),
        ))
    }

    // ------------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------------

    /// Probe the service health endpoint. `Ok` means a 2xx response.
    pub async fn health(&self) -> Result<(), ClientError> {
        let request = self.client.get(self.health_url.clone());
        self.execute(request).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, self.auth_header.clone())
    }

    /// Send `request` and return the response body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, ClientError> {
        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        tracing::debug!(method = %method, path = %path, "Memory service request");

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::error!(method = %method, path = %path, error = %e, "Memory service unreachable");
            ClientError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                "Memory service returned an error"
            );
            return Err(ClientError::Service {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

fn parse_url(raw: &str) -> Result<Url, ClientError> {
    Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    Ok(serde_json::from_str(body)?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-api-key";

    fn client_for(server: &MockServer) -> ConversationClient {
        let config = ServiceConfig::new(format!("{}/api/v2", server.uri()), API_KEY);
        ConversationClient::new(config).expect("Failed to create client")
    }

    fn message_json(role: &str, content: &str) -> serde_json::Value {
        serde_json::json!({ "role": role, "role_type": role, "content": content })
    }

    #[test]
    fn test_new_fails_with_missing_api_key() {
        let result = ConversationClient::new(ServiceConfig::new("http://localhost:8000/api/v2", ""));
        match result {
            Err(ClientError::MissingApiKey) => {}
            other => panic!("Expected MissingApiKey, got {:?}", other),
        }
    }

    #[test]
    fn test_new_fails_with_invalid_base_url() {
        let result = ConversationClient::new(ServiceConfig::new("not a url", API_KEY));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));

        let result = ConversationClient::new(ServiceConfig::new("mailto:someone@example.com", API_KEY));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_health_url_defaults_to_origin_root() {
        let client =
            ConversationClient::new(ServiceConfig::new("http://localhost:8000/api/v2", API_KEY))
                .unwrap();
        assert_eq!(client.health_url.as_str(), "http://localhost:8000/healthz");
    }

    #[test]
    fn test_health_url_override() {
        let mut config = ServiceConfig::new("http://localhost:8000/api/v2", API_KEY);
        config.health_url = Some("http://localhost:9000/status".to_string());
        let client = ConversationClient::new(config).unwrap();
        assert_eq!(client.health_url.as_str(), "http://localhost:9000/status");
    }

    #[test]
    fn test_debug_output_hides_api_key() {
        let client =
            ConversationClient::new(ServiceConfig::new("http://localhost:8000/api/v2", API_KEY))
                .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains(API_KEY), "api key leaked: {}", debug);
    }

    #[test]
    fn test_endpoint_handles_trailing_slash_and_encoding() {
        let client =
            ConversationClient::new(ServiceConfig::new("http://localhost:8000/api/v2/", API_KEY))
                .unwrap();
        let url = client.endpoint(&["users", "jane doe/1", "sessions"]).unwrap();
        assert_eq!(url.path(), "/api/v2/users/jane%20doe%2F1/sessions");
    }

    #[test]
    fn test_new_rejects_api_key_unusable_as_header() {
        let result = ConversationClient::new(ServiceConfig::new(
            "http://localhost:8000/api/v2",
            "secret\n",
        ));
        match result {
            Err(ClientError::InvalidArgument(msg)) => assert!(msg.contains("api key")),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_zero_timeout() {
        let mut config = ServiceConfig::new("http://localhost:8000/api/v2", API_KEY);
        config.timeout_seconds = 0;
        let result = ConversationClient::new(config);
        assert!(matches!(result, Err(ClientError::InvalidArgument(_))));
    }

    #[test]
    fn test_endpoint_drops_base_url_query_and_fragment() {
        let client = ConversationClient::new(ServiceConfig::new(
            "http://localhost:8000/api/v2?x=1#frag",
            API_KEY,
        ))
        .unwrap();
        let url = client.endpoint(&["users", "u1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v2/users/u1");
        assert_eq!(client.health_url.as_str(), "http://localhost:8000/healthz");
    }

    #[tokio::test]
    async fn test_get_context_with_queried_base_url_sends_only_lastn() {
        let server = MockServer::start().await;
        let config = ServiceConfig::new(format!("{}/api/v2?x=1", server.uri()), API_KEY);
        let client = ConversationClient::new(config).unwrap();

        Mock::given(method("GET"))
            .and(path("/api/v2/sessions/s1/memory"))
            .and(query_param("lastn", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        client.get_context("s1", 3).await.unwrap();
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("lastn=3"));
    }

    #[tokio::test]
    async fn test_create_user_sends_body_and_auth_header() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/users"))
            .and(header("authorization", "Api-Key test-api-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "user_id": "u1",
                "email": "u1@example.com",
                "first_name": "Test",
                "last_name": "User",
                "metadata": { "department": "Engineering" }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "uuid": "5d6c",
                "user_id": "u1",
                "email": "u1@example.com",
                "first_name": "Test",
                "last_name": "User",
                "metadata": { "department": "Engineering" },
                "created_at": "2026-02-23T10:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut metadata = Metadata::new();
        metadata.insert("department".to_string(), "Engineering".into());
        let new_user = NewUser::new("u1")
            .email("u1@example.com")
            .first_name("Test")
            .last_name("User")
            .metadata(metadata);

        let user = client.create_user(&new_user).await.expect("create_user failed");
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.uuid.as_deref(), Some("5d6c"));
    }

    #[tokio::test]
    async fn test_create_user_conflict_surfaces_service_error() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/users"))
            .respond_with(ResponseTemplate::new(400).set_body_string("user already exists"))
            .mount(&server)
            .await;

        match client.create_user(&NewUser::new("u1")).await {
            Err(ClientError::Service { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "user already exists");
            }
            other => panic!("Expected Service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_find_user_maps_404_to_none() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/users/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let user = client.find_user("ghost").await.expect("404 should not be an error");
        assert!(user.is_none());

        let err = client.get_user("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_user_propagates_other_errors() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/users/u1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client.find_user("u1").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_get_user_rejects_malformed_body() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/users/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = client.get_user("u1").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_create_session_with_explicit_id() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/sessions"))
            .and(body_json(serde_json::json!({
                "user_id": "u1",
                "session_id": "s1",
                "metadata": {}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "session_id": "something-else",
                "user_id": "u1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client.create_session("u1", Some("s1"), None).await.unwrap();
        assert_eq!(id, "s1", "caller-supplied id is returned regardless of payload");
    }

    #[tokio::test]
    async fn test_create_session_generates_id_when_absent() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/sessions"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let mut metadata = Metadata::new();
        metadata.insert("topic".to_string(), "Technical Support".into());
        let id = client.create_session("u1", None, Some(metadata)).await.unwrap();
        assert!(id.starts_with("conv-"));
        assert_eq!(id.len(), "conv-".len() + ids::SHORT_ID_LEN);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["session_id"], id.as_str());
        assert_eq!(sent["metadata"]["topic"], "Technical Support");
    }

    #[tokio::test]
    async fn test_add_message_sends_single_element_batch() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/sessions/s1/memory"))
            .and(body_json(serde_json::json!({
                "messages": [{
                    "role": "user",
                    "role_type": "user",
                    "content": "hello",
                    "metadata": {}
                }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "message": "OK" })))
            .expect(1)
            .mount(&server)
            .await;

        client
            .add_message("s1", MessageInput::user("hello"))
            .await
            .expect("add_message failed");
    }

    #[tokio::test]
    async fn test_add_message_batch_preserves_order() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/sessions/s1/memory"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let batch = vec![
            MessageInput::user("one"),
            MessageInput::assistant("two"),
            MessageInput::new("moderator", "three"),
        ];
        client.add_message_batch("s1", &batch).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let contents: Vec<&str> = sent["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(sent["messages"][2]["role_type"], "moderator");
    }

    #[tokio::test]
    async fn test_add_message_batch_failure_is_whole_batch() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/sessions/missing/memory"))
            .respond_with(ResponseTemplate::new(404).set_body_string("session not found"))
            .mount(&server)
            .await;

        let batch = vec![MessageInput::user("a"), MessageInput::assistant("b")];
        let err = client.add_message_batch("missing", &batch).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected_without_request() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client.add_message_batch("s1", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_get_context_sends_lastn_query() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/sessions/s1/memory"))
            .and(query_param("lastn", "3"))
            .and(header("authorization", "Api-Key test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [message_json("user", "hello"), message_json("assistant", "hi")],
                "relevant_facts": [{ "fact": "User greeted the assistant", "rating": 0.5 }],
                "context": "Greeting exchange."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = client.get_context("s1", 3).await.unwrap();
        assert_eq!(snapshot.message_count(), 2);
        assert_eq!(snapshot.messages[0].content, "hello");
        assert_eq!(snapshot.relevant_facts.len(), 1);
        assert_eq!(snapshot.context.as_deref(), Some("Greeting exchange."));
    }

    #[tokio::test]
    async fn test_get_context_truncates_oversized_response() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/sessions/s1/memory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    message_json("user", "m1"),
                    message_json("assistant", "m2"),
                    message_json("user", "m3"),
                    message_json("assistant", "m4")
                ]
            })))
            .mount(&server)
            .await;

        let snapshot = client.get_context("s1", 2).await.unwrap();
        let contents: Vec<&str> = snapshot.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }

    #[tokio::test]
    async fn test_get_context_tolerates_null_collections() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/sessions/s1/memory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": null,
                "relevant_facts": null,
                "context": null
            })))
            .mount(&server)
            .await;

        let snapshot = client.get_context("s1", DEFAULT_LAST_N).await.unwrap();
        assert_eq!(snapshot.message_count(), 0);
        assert!(snapshot.relevant_facts.is_empty());
    }

    #[tokio::test]
    async fn test_get_context_rejects_zero_lastn() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client.get_context("s1", 0).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_typed_for_every_read() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        assert_eq!(client.get_context("s1", 5).await.unwrap_err().status(), Some(503));
        assert_eq!(client.get_user_sessions("u1").await.unwrap_err().status(), Some(503));
        assert_eq!(client.get_user("u1").await.unwrap_err().status(), Some(503));
        assert_eq!(client.health().await.unwrap_err().status(), Some(503));
    }

    #[tokio::test]
    async fn test_get_user_sessions_keeps_service_order() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/users/u1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "session_id": "conv-b", "user_id": "u1", "metadata": { "topic": "Feature Request" } },
                { "session_id": "conv-a", "user_id": "u1" }
            ])))
            .mount(&server)
            .await;

        let sessions = client.get_user_sessions("u1").await.unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["conv-b", "conv-a"]);
        assert_eq!(sessions[0].metadata_str("topic"), Some("Feature Request"));
    }

    #[tokio::test]
    async fn test_get_user_sessions_null_body_is_empty() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v2/users/u1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        assert!(client.get_user_sessions("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_sessions_posts_query() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/sessions/search"))
            .and(body_json(serde_json::json!({
                "user_id": "u1",
                "text": "api key",
                "limit": 5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    { "session_id": "conv-a", "score": 0.91, "fact": { "fact": "API key expired" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hits = client.search_sessions("u1", "  api key ", Some(5)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session_id.as_deref(), Some("conv-a"));
        assert_eq!(hits[0].fact.as_ref().unwrap().fact, "API key expired");
    }

    #[tokio::test]
    async fn test_search_sessions_rejects_blank_query() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let err = client.search_sessions("u1", "   ", None).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_search_sessions_unsupported_is_service_error() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("POST"))
            .and(path("/api/v2/sessions/search"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client.search_sessions("u1", "api key", None).await.unwrap_err();
        match err {
            ClientError::Service { status: 404, body } => assert_eq!(body, "not found"),
            other => panic!("Expected Service 404, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_summary_uses_injected_clock() {
        let server = MockServer::start().await;
        let at = Utc.with_ymd_and_hms(2026, 2, 23, 10, 0, 0).unwrap();
        let client = client_for(&server).with_clock(Arc::new(FixedClock(at)));

        Mock::given(method("GET"))
            .and(path("/api/v2/sessions/s1/memory"))
            .and(query_param("lastn", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [message_json("user", "hello")],
                "relevant_facts": [],
                "context": "Short chat."
            })))
            .mount(&server)
            .await;

        let summary = client.get_conversation_summary("s1").await.unwrap();
        assert_eq!(summary.session_id, "s1");
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.context_text, "Short chat.");
        assert_eq!(summary.retrieved_at, at);
    }

    #[tokio::test]
    async fn test_health_hits_unversioned_root() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(200).set_body_string("."))
            .expect(1)
            .mount(&server)
            .await;

        client.health().await.expect("health should pass");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Nothing listens on port 1.
        let client =
            ConversationClient::new(ServiceConfig::new("http://127.0.0.1:1/api/v2", API_KEY))
                .unwrap();

        let err = client.get_user("u1").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);
        assert_eq!(err.status(), None);
    }
}
