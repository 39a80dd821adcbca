//! Feedback relay: accepts tool suggestions over HTTP and forwards them to
//! a chat webhook.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pay_core::error::PayError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;

/// First line of every forwarded message.
pub const SUGGESTION_PREFIX: &str = "**New Tool Suggestion:**";

const WEBHOOK_TIMEOUT_SECS: u64 = 10;

// ── Webhook client ────────────────────────────────────────────────────────────

/// Delivers a message body to a webhook URL.
pub trait WebhookClient: Send + Sync {
    fn send(&self, url: &str, content: &str) -> pay_core::Result<()>;
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// [`WebhookClient`] posting `{"content": ...}` with `ureq`.
pub struct HttpWebhookClient {
    agent: ureq::Agent,
}

impl Default for HttpWebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpWebhookClient {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build();
        Self { agent }
    }
}

impl WebhookClient for HttpWebhookClient {
    fn send(&self, url: &str, content: &str) -> pay_core::Result<()> {
        let body = serde_json::to_string(&WebhookMessage { content })?;
        match self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_string(&body)
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                Err(PayError::Webhook(format!("HTTP {}: {}", code, text.trim())))
            }
            Err(e) => Err(PayError::Webhook(e.to_string())),
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Shared handler state.
#[derive(Clone)]
pub struct RelayState {
    pub webhook_url: Option<String>,
    /// Fixed CORS origin; when unset the request's own origin is echoed.
    pub allowed_origin: Option<String>,
    pub client: Arc<dyn WebhookClient>,
}

impl RelayState {
    pub fn new(
        webhook_url: Option<String>,
        allowed_origin: Option<String>,
        client: Arc<dyn WebhookClient>,
    ) -> Self {
        Self {
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            allowed_origin: allowed_origin.filter(|o| !o.trim().is_empty()),
            client,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Suggestion is required")]
    MissingSuggestion,

    #[error("Server configuration error")]
    NotConfigured,

    #[error("Failed to submit suggestion")]
    Delivery(#[source] PayError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::MissingSuggestion => StatusCode::BAD_REQUEST,
            RelayError::NotConfigured => {
                tracing::error!("webhook URL is not configured");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::Delivery(source) => {
                tracing::error!(error = %source, "error sending to webhook");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionRequest {
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl SuggestionRequest {
    /// The suggestion text, or `None` when missing or blank.
    fn text(&self) -> Option<&str> {
        self.suggestion.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Format the webhook message body for a suggestion.
pub fn suggestion_message(suggestion: &str) -> String {
    format!("{}\n{}", SUGGESTION_PREFIX, suggestion)
}

/// `POST /api/suggestions`
///
/// The body is parsed leniently: anything that is not a JSON object with a
/// non-blank `suggestion` string is answered with 400.
pub async fn submit_suggestion(
    State(state): State<RelayState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, RelayError> {
    let request: SuggestionRequest = serde_json::from_slice(&body).unwrap_or_default();
    let suggestion = request.text().ok_or(RelayError::MissingSuggestion)?;
    let url = state.webhook_url.clone().ok_or(RelayError::NotConfigured)?;

    let content = suggestion_message(suggestion);
    let client = Arc::clone(&state.client);
    tokio::task::spawn_blocking(move || client.send(&url, &content))
        .await
        .map_err(|e| RelayError::Delivery(PayError::Other(e.into())))?
        .map_err(RelayError::Delivery)?;

    tracing::info!(chars = suggestion.chars().count(), "suggestion forwarded");
    Ok(Json(json!({ "success": true })))
}

/// `GET /api/health`
pub async fn health() -> &'static str {
    "OK"
}

// ── CORS ──────────────────────────────────────────────────────────────────────

/// Adds CORS headers to every response and answers preflight requests.
pub async fn cors(State(state): State<RelayState>, request: Request<Body>, next: Next) -> Response {
    let origin = match state.allowed_origin.as_deref() {
        Some(configured) => HeaderValue::from_str(configured).ok(),
        None => request.headers().get(header::ORIGIN).cloned(),
    }
    .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    response
}

// ── Server ────────────────────────────────────────────────────────────────────

pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/suggestions", post(submit_suggestion))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: RelayState) -> anyhow::Result<()> {
    if state.webhook_url.is_none() {
        tracing::warn!("no webhook URL configured; suggestions will be rejected");
    }

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "relay listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down relay");
        })
        .await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call; fails when `fail` is set.
    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl WebhookClient for RecordingClient {
        fn send(&self, url: &str, content: &str) -> pay_core::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((url.to_string(), content.to_string()));
            if self.fail {
                return Err(PayError::Webhook("HTTP 500: boom".to_string()));
            }
            Ok(())
        }
    }

    fn state_with(client: Arc<RecordingClient>, url: Option<&str>) -> RelayState {
        RelayState::new(url.map(String::from), None, client)
    }

    async fn status_and_body(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn submit(state: RelayState, body: &str) -> (StatusCode, serde_json::Value) {
        let response = submit_suggestion(State(state), Bytes::from(body.to_string()))
            .await
            .into_response();
        status_and_body(response).await
    }

    // ── submit_suggestion ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_forwards_suggestion() {
        let client = Arc::new(RecordingClient::default());
        let state = state_with(client.clone(), Some("https://hooks.test/abc"));

        let (status, body) = submit(state, r#"{"suggestion":"dark mode"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let sent = client.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://hooks.test/abc");
        assert_eq!(sent[0].1, "**New Tool Suggestion:**\ndark mode");
    }

    #[tokio::test]
    async fn test_missing_suggestion_is_bad_request() {
        let client = Arc::new(RecordingClient::default());
        let state = state_with(client.clone(), Some("https://hooks.test/abc"));

        for body in ["{}", r#"{"suggestion":""}"#, r#"{"suggestion":"   "}"#, "not json", ""] {
            let (status, json_body) = submit(state.clone(), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {:?}", body);
            assert_eq!(json_body["error"], "Suggestion is required");
        }
        assert!(client.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_webhook_is_server_error() {
        let client = Arc::new(RecordingClient::default());
        let state = state_with(client.clone(), None);

        let (status, body) = submit(state, r#"{"suggestion":"x"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server configuration error");
        assert!(client.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blank_webhook_url_counts_as_unconfigured() {
        let client = Arc::new(RecordingClient::default());
        let state = state_with(client, Some("  "));
        assert!(state.webhook_url.is_none());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_server_error() {
        let client = Arc::new(RecordingClient {
            fail: true,
            ..Default::default()
        });
        let state = state_with(client.clone(), Some("https://hooks.test/abc"));

        let (status, body) = submit(state, r#"{"suggestion":"x"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to submit suggestion");
        assert_eq!(client.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_suggestion_message_format() {
        assert_eq!(
            suggestion_message("line one\nline two"),
            "**New Tool Suggestion:**\nline one\nline two"
        );
    }

    #[test]
    fn test_webhook_message_serializes() {
        let body = serde_json::to_value(WebhookMessage { content: "hi" }).unwrap();
        assert_eq!(body, json!({ "content": "hi" }));
    }

    // ── Router ────────────────────────────────────────────────────────────────

    async fn spawn_server(state: RelayState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_router_end_to_end() {
        let client = Arc::new(RecordingClient::default());
        let state = RelayState::new(
            Some("https://hooks.test/abc".to_string()),
            Some("https://pay.example.com".to_string()),
            client.clone(),
        );
        let addr = spawn_server(state).await;

        let (health, status, origin) = tokio::task::spawn_blocking(move || {
            let health = ureq::get(&format!("http://{}/api/health", addr))
                .call()
                .unwrap()
                .into_string()
                .unwrap();
            let resp = ureq::post(&format!("http://{}/api/suggestions", addr))
                .set("Content-Type", "application/json")
                .set("Origin", "https://elsewhere.test")
                .send_string(r#"{"suggestion":"export to PDF"}"#)
                .unwrap();
            let origin = resp
                .header("access-control-allow-origin")
                .map(String::from);
            (health, resp.status(), origin)
        })
        .await
        .unwrap();

        assert_eq!(health, "OK");
        assert_eq!(status, 200);
        assert_eq!(origin.as_deref(), Some("https://pay.example.com"));
        assert_eq!(client.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_router_preflight_echoes_origin() {
        let client = Arc::new(RecordingClient::default());
        let addr = spawn_server(state_with(client, None)).await;

        let (status, origin, methods) = tokio::task::spawn_blocking(move || {
            let resp = ureq::request("OPTIONS", &format!("http://{}/api/suggestions", addr))
                .set("Origin", "https://app.test")
                .call()
                .unwrap();
            (
                resp.status(),
                resp.header("access-control-allow-origin").map(String::from),
                resp.header("access-control-allow-methods").map(String::from),
            )
        })
        .await
        .unwrap();

        assert_eq!(status, 204);
        assert_eq!(origin.as_deref(), Some("https://app.test"));
        assert!(methods.unwrap().contains("POST"));
    }

    #[tokio::test]
    async fn test_router_error_carries_cors_headers() {
        let client = Arc::new(RecordingClient::default());
        let addr = spawn_server(state_with(client, None)).await;

        let (status, origin) = tokio::task::spawn_blocking(move || {
            match ureq::post(&format!("http://{}/api/suggestions", addr))
                .set("Content-Type", "application/json")
                .send_string("{}")
            {
                Err(ureq::Error::Status(code, resp)) => (
                    code,
                    resp.header("access-control-allow-origin").map(String::from),
                ),
                other => panic!("expected an error status, got {:?}", other.map(|r| r.status())),
            }
        })
        .await
        .unwrap();

        assert_eq!(status, 400);
        assert_eq!(origin.as_deref(), Some("*"));
    }
}
