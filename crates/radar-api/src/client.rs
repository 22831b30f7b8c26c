//! HTTP plumbing shared by every endpoint group.
//!
//! All verbs funnel through [`ApiClient::execute`], which attaches the
//! bearer token, maps 401 to [`ApiError::SessionExpired`] (dropping the
//! stored token so later calls fail fast), and digs a usable message
//! out of error bodies.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

/// Shared handle to the current bearer token. Cloning shares storage,
/// so a 401 observed by one caller invalidates the token for all.
#[derive(Clone, Default)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_present(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// JSON client for the Hire Radar REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Build a client for `base_url`. The URL is validated up front so
    /// a typo fails here instead of on the first request.
    pub fn new(base_url: &str, timeout: Duration, tokens: TokenStore) -> Result<Self> {
        let trimmed = base_url.trim_end_matches('/');
        reqwest::Url::parse(trimmed)
            .map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: trimmed.to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // -----------------------------------------------------------------
    // Verbs
    // -----------------------------------------------------------------

    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let request = self.http.get(self.url_for(path));
        self.execute(request, path).await
    }

    pub async fn get_json_query<Q>(&self, path: &str, query: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let request = self.http.get(self.url_for(path)).query(query);
        self.execute(request, path).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let request = self.http.post(self.url_for(path)).json(body);
        self.execute(request, path).await
    }

    pub async fn put_json(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut request = self.http.put(self.url_for(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, path).await
    }

    pub async fn delete_json(&self, path: &str) -> Result<Value> {
        let request = self.http.delete(self.url_for(path));
        self.execute(request, path).await
    }

    async fn execute(&self, mut request: reqwest::RequestBuilder, path: &str) -> Result<Value> {
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.clear();
            warn!(path, "Received 401, stored token dropped");
            return Err(ApiError::SessionExpired);
        }

        let body = response.text().await?;
        if !status.is_success() {
            let message = extract_error_message(&body, status);
            debug!(path, status = status.as_u16(), message = %message, "Request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Best-effort extraction of a human-readable message from an error
/// body: JSON `error` key, then `message`, then the raw text unless it
/// looks like an HTML error page.
fn extract_error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    format!("Request failed with status {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
        let tokens = TokenStore::new(token.map(str::to_string));
        ApiClient::new(&server.uri(), Duration::from_secs(5), tokens).unwrap()
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = ApiClient::new("not a url", Duration::from_secs(5), TokenStore::default());
        assert!(matches!(result, Err(ApiError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let client =
            ApiClient::new("http://localhost:8000/", Duration::from_secs(5), TokenStore::default())
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("tok-123"));
        let body = client.get_json("/api/ping").await.unwrap();
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_query_params_serialized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/things"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let query = crate::paging::PageQuery::new(2, 10);
        client.get_json_query("/api/things", &query).await.unwrap();
    }

    #[tokio::test]
    async fn test_401_drops_token_and_reports_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Token expired" })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("stale"));
        let error = client.get_json("/api/ping").await.unwrap_err();
        assert!(matches!(error, ApiError::SessionExpired));
        assert!(!client.tokens().is_present());
    }

    #[tokio::test]
    async fn test_error_body_message_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "Request already accepted" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        match client.get_json("/api/ping").await.unwrap_err() {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Request already accepted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_html_error_page_gets_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .respond_with(
                ResponseTemplate::new(502)
                    .set_body_string("<html><body>Bad Gateway</body></html>"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        match client.get_json("/api/ping").await.unwrap_err() {
            ApiError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Request failed with status 502");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/things/1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let body = client.delete_json("/api/things/1").await.unwrap();
        assert!(body.is_null());
    }
}
