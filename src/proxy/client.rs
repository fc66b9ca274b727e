//! HTTP client for the LiteLLM proxy.

use crate::config::ProxyConfig;
use crate::telemetry::UpstreamMetrics;
use crate::{Error, Result};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Result of a single proxy call.
pub type CallResult<T> = std::result::Result<T, CallError>;

/// Failure of a single proxy call, before it is normalized into [`Error`].
#[derive(Debug, Clone)]
pub struct CallError {
    status: Option<StatusCode>,
    proxy_message: Option<String>,
    detail: String,
}

impl CallError {
    fn transport(error: reqwest::Error) -> Self {
        Self {
            status: error.status(),
            proxy_message: None,
            detail: format!("Request failed: {}", error),
        }
    }

    fn decode(status: StatusCode, error: serde_json::Error) -> Self {
        Self {
            status: Some(status),
            proxy_message: None,
            detail: format!("Failed to parse response: {}", error),
        }
    }

    /// HTTP status returned by the proxy, if a response arrived.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Message the proxy put in its error body.
    pub fn proxy_message(&self) -> Option<&str> {
        self.proxy_message.as_deref()
    }

    /// Normalize into an upstream error, using `fallback` when the proxy gave no message.
    pub fn into_error(self, fallback: &str) -> Error {
        let message = self.proxy_message.unwrap_or_else(|| fallback.to_string());
        Error::Upstream {
            message,
            status: self.status.map(|s| s.as_u16()),
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.proxy_message {
            Some(message) => write!(f, "{} ({})", self.detail, message),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for CallError {}

/// Authenticated client bound to one proxy base URL.
#[derive(Clone)]
pub struct ProxyClient {
    base_url: String,
    client: reqwest::Client,
    metrics: Arc<UpstreamMetrics>,
}

impl ProxyClient {
    /// Create a client that sends `Authorization: Bearer <api_key>` on every call.
    pub fn new(config: &ProxyConfig, metrics: Arc<UpstreamMetrics>) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|_| {
            Error::config_key("proxy API key is not a valid header value", "proxy.api_key")
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("liteclient/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            metrics,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Counters shared with this client.
    pub fn metrics(&self) -> &Arc<UpstreamMetrics> {
        &self.metrics
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Perform a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> CallResult<T> {
        self.execute("GET", path, self.client.get(self.url(path)))
            .await
    }

    /// Perform a GET request with query parameters.
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> CallResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute("GET", path, self.client.get(self.url(path)).query(query))
            .await
    }

    /// Perform a POST request with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> CallResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute("POST", path, self.client.post(self.url(path)).json(body))
            .await
    }

    /// Check whether the proxy's `/health` endpoint answers with success.
    pub async fn health_check(&self) -> bool {
        let start = Instant::now();
        let healthy = match self.client.get(self.url("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "proxy health check failed");
                false
            }
        };
        self.metrics.record_call(start.elapsed(), healthy);
        healthy
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> CallResult<T> {
        let start = Instant::now();
        let outcome = send(request).await;
        let elapsed = start.elapsed();
        self.metrics.record_call(elapsed, outcome.is_ok());

        match &outcome {
            Ok(_) => debug!(method, path, elapsed_ms = elapsed.as_millis() as u64, "proxy call"),
            Err(e) => warn!(
                method,
                path,
                status = e.status().map(|s| s.as_u16()),
                error = %e,
                "proxy call failed"
            ),
        }
        outcome
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> CallResult<T> {
    let response = request.send().await.map_err(CallError::transport)?;
    let status = response.status();
    let body = response.bytes().await.map_err(CallError::transport)?;

    if !status.is_success() {
        return Err(CallError {
            status: Some(status),
            proxy_message: extract_error_message(&body),
            detail: format!("HTTP error: {}", status),
        });
    }

    serde_json::from_slice(&body).map_err(|e| CallError::decode(status, e))
}

/// Pull a human-readable message out of a proxy error body.
///
/// The proxy reports errors as `{"error": {"message": ..}}`; FastAPI-level
/// failures use `{"detail": ..}`.
fn extract_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;

    let candidates = [
        value.pointer("/error/message"),
        value.get("error"),
        value.pointer("/detail/error"),
        value.get("detail"),
        value.get("message"),
    ];

    let message = candidates
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ProxyClient {
        let config = ProxyConfig {
            base_url: format!("{}/", server.uri()),
            api_key: "sk-test".to_string(),
            ..ProxyConfig::default()
        };
        ProxyClient::new(&config, Arc::new(UpstreamMetrics::new())).unwrap()
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(br#"{"error": {"message": "Budget not found"}}"#).as_deref(),
            Some("Budget not found")
        );
        assert_eq!(
            extract_error_message(br#"{"detail": {"error": "Invalid key"}}"#).as_deref(),
            Some("Invalid key")
        );
        assert_eq!(
            extract_error_message(br#"{"detail": "Not authenticated"}"#).as_deref(),
            Some("Not authenticated")
        );
        assert_eq!(extract_error_message(b""), None);
        assert_eq!(extract_error_message(br#"{"error": {"code": 500}}"#), None);
    }

    #[test]
    fn test_call_error_fallback_message() {
        let err = CallError {
            status: Some(StatusCode::BAD_GATEWAY),
            proxy_message: None,
            detail: "HTTP error: 502".to_string(),
        };
        match err.into_error("Failed to list budgets.") {
            Error::Upstream { message, status } => {
                assert_eq!(message, "Failed to list budgets.");
                assert_eq!(status, Some(502));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budget/list"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let budgets: Vec<serde_json::Value> = client.get("/budget/list").await.unwrap();
        assert!(budgets.is_empty());
        assert_eq!(client.metrics().snapshot().upstream_calls, 1);
    }

    #[tokio::test]
    async fn test_get_with_query_and_post() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customer/info"))
            .and(query_param("end_user_id", "u 1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "u 1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/budget/update"))
            .and(body_json(json!({"budget_id": "b1", "max_budget": 5.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let info: serde_json::Value = client
            .get_with_query("/customer/info", &[("end_user_id", "u 1")])
            .await
            .unwrap();
        assert_eq!(info["user_id"], "u 1");

        let updated: serde_json::Value = client
            .post("/budget/update", &json!({"budget_id": "b1", "max_budget": 5.0}))
            .await
            .unwrap();
        assert_eq!(updated["ok"], true);
    }

    #[tokio::test]
    async fn test_error_status_carries_proxy_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customer/list"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": {"message": "database unavailable"}})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get::<serde_json::Value>("/customer/list")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.proxy_message(), Some("database unavailable"));

        let snapshot = client.metrics().snapshot();
        assert_eq!(snapshot.upstream_failures, 1);
    }

    #[tokio::test]
    async fn test_invalid_body_is_a_call_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budget/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get::<Vec<serde_json::Value>>("/budget/list")
            .await
            .unwrap_err();
        assert!(err.proxy_message().is_none());
        assert!(err.to_string().contains("Failed to parse response"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(client_for(&server).health_check().await);

        let config = ProxyConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "sk-test".to_string(),
            timeout_ms: 500,
            ..ProxyConfig::default()
        };
        let unreachable = ProxyClient::new(&config, Arc::new(UpstreamMetrics::new())).unwrap();
        assert!(!unreachable.health_check().await);
    }
}
