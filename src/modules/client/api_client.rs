use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use std::time::Duration;

use eventsource_client::{self as es, Client};
use futures::stream::{BoxStream, StreamExt};
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::ClientConfig;

/// A slash repeated anywhere except right after the scheme's colon
static DUPLICATE_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^:]/)/+").expect("duplicate slash pattern is valid"));

/// Called after a 401 has cleared the stored token
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request timed out")]
    Timeout,

    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        data: Value,
    },

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl ClientError {
    /// HTTP status of the failed call, `None` when no response arrived
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(err)
        }
    }
}

/// JSON client for the location API
///
/// Holds the bearer token in memory and attaches it to every call unless the
/// caller supplies its own `Authorization` header.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    token: Arc<RwLock<Option<String>>>,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
            token: Arc::new(RwLock::new(config.token.clone())),
            on_unauthorized: None,
        })
    }

    pub fn with_unauthorized_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    /// Bound applied to plain requests and to opening a stream
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join the base URL and an endpoint, collapsing accidental double slashes
    pub fn create_url(&self, endpoint: &str) -> String {
        let base = self.base_url.strip_suffix('/').unwrap_or(&self.base_url);
        let endpoint = endpoint.trim_start_matches('/');
        let joined = format!("{}/{}", base, endpoint);
        DUPLICATE_SLASHES.replace_all(&joined, "$1").into_owned()
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.request(Method::GET, endpoint, None::<&()>, HeaderMap::new())
            .await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, endpoint, Some(body), HeaderMap::new())
            .await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, endpoint, Some(body), HeaderMap::new())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.request(Method::DELETE, endpoint, None::<&()>, HeaderMap::new())
            .await
    }

    /// Send a request and decode the JSON response
    ///
    /// Non-JSON bodies are kept as a JSON string; an empty success body decodes as `{}`.
    pub async fn request<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        headers: HeaderMap,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.create_url(endpoint);
        let mut builder = self
            .http
            .request(method.clone(), &url)
            .headers(self.with_auth(headers));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ClientError::from_reqwest)?;
        let status = response.status();
        let raw = response.text().await.map_err(ClientError::from_reqwest)?;
        let data = parse_body(&raw);

        if !status.is_success() {
            tracing::debug!(%method, %url, status = status.as_u16(), "API call failed");
            return Err(self.http_error(status, data));
        }

        let data = if data.is_null() {
            Value::Object(Default::default())
        } else {
            data
        };
        Ok(serde_json::from_value(data)?)
    }

    /// Open a server-sent event stream with the bearer token attached
    ///
    /// Connecting is lazy: nothing is sent until the stream is first polled.
    /// Reconnecting is left to the caller.
    pub fn open_stream(
        &self,
        endpoint: &str,
    ) -> Result<BoxStream<'static, Result<es::SSE, ClientError>>, ClientError> {
        let url = self.create_url(endpoint);
        let mut builder = es::ClientBuilder::for_url(&url).map_err(stream_error)?;
        if let Some(token) = self.token() {
            builder = builder
                .header("Authorization", &format!("Bearer {}", token))
                .map_err(stream_error)?;
        }
        let client = builder
            .reconnect(es::ReconnectOptions::reconnect(false).build())
            .build();

        Ok(client
            .stream()
            .map(|item| item.map_err(stream_error))
            .boxed())
    }

    fn with_auth(&self, mut headers: HeaderMap) -> HeaderMap {
        if headers.contains_key(header::AUTHORIZATION) {
            return headers;
        }
        if let Some(token) = self.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Stored API token is not a valid header value"),
            }
        }
        headers
    }

    fn http_error(&self, status: StatusCode, data: Value) -> ClientError {
        if status == StatusCode::UNAUTHORIZED {
            self.clear_token();
            if let Some(hook) = &self.on_unauthorized {
                hook();
            }
        }

        let message = ["message", "error"]
            .iter()
            .filter_map(|key| data.get(*key).and_then(Value::as_str))
            .find(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        ClientError::Http {
            status: status.as_u16(),
            message,
            data,
        }
    }
}

fn stream_error(err: es::Error) -> ClientError {
    ClientError::Stream(err.to_string())
}

fn parse_body(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::spawn_server;
    use axum::http::HeaderMap as AxumHeaders;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn client_for(base_url: &str) -> ApiClient {
        ApiClient::new(&ClientConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(500),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    async fn test_server() -> String {
        async fn echo_auth(headers: AxumHeaders) -> Json<Value> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Json(json!({ "authorization": auth }))
        }

        let app = Router::new()
            .route("/api/echo", get(echo_auth).post(echo_auth))
            .route(
                "/api/unauthorized",
                get(|| async {
                    (
                        axum::http::StatusCode::UNAUTHORIZED,
                        Json(json!({ "success": false, "error": "Invalid token" })),
                    )
                }),
            )
            .route(
                "/api/broken",
                get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/api/empty",
                get(|| async { axum::http::StatusCode::NO_CONTENT }),
            )
            .route(
                "/api/stream",
                get(|headers: AxumHeaders| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    (
                        [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
                        format!(": hello\n\nevent: whoami\ndata: {}\n\n", auth),
                    )
                }),
            )
            .route(
                "/api/cr-stream",
                get(|| async {
                    (
                        [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
                        "event: locations:update\rdata: {}\r\r",
                    )
                }),
            )
            .route(
                "/api/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );
        spawn_server(app).await
    }

    #[test]
    fn test_create_url_normalizes_slashes() {
        let client = client_for("http://localhost:3000/api/");
        assert_eq!(
            client.create_url("/locations"),
            "http://localhost:3000/api/locations"
        );
        assert_eq!(
            client.create_url("//admin//locations"),
            "http://localhost:3000/api/admin/locations"
        );

        let client = client_for("https://example.com//api");
        assert_eq!(
            client.create_url("locations/stream"),
            "https://example.com/api/locations/stream"
        );
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let base = test_server().await;
        let client = client_for(&format!("{}/api", base));

        let body: Value = client.get("/echo").await.unwrap();
        assert_eq!(body["authorization"], Value::Null);

        client.set_token("abc");
        let body: Value = client.post("/echo", &json!({})).await.unwrap();
        assert_eq!(body["authorization"], "Bearer abc");
    }

    #[tokio::test]
    async fn test_caller_authorization_header_wins() {
        let base = test_server().await;
        let client = client_for(&format!("{}/api", base));
        client.set_token("stored");

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer mine"));
        let body: Value = client
            .request(Method::GET, "/echo", None::<&()>, headers)
            .await
            .unwrap();
        assert_eq!(body["authorization"], "Bearer mine");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token_and_calls_hook() {
        let base = test_server().await;
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let client = client_for(&format!("{}/api", base))
            .with_unauthorized_hook(move || flag.store(true, Ordering::SeqCst));
        client.set_token("expired");

        let err = client.get::<Value>("/unauthorized").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Invalid token");
        assert_eq!(client.token(), None);
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let base = test_server().await;
        let client = client_for(&format!("{}/api", base));
        client.set_token("kept");

        match client.get::<Value>("/broken").await {
            Err(ClientError::Http {
                status,
                message,
                data,
            }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "HTTP 500");
                assert_eq!(data, json!("boom"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(client.token().as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_object() {
        let base = test_server().await;
        let client = client_for(&format!("{}/api", base));

        let body: Value = client.get("/empty").await.unwrap();
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_timeout() {
        let base = test_server().await;
        let client = client_for(&format!("{}/api", base));

        let err = client.get::<Value>("/slow").await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout), "got {err:?}");
        assert_eq!(err.to_string(), "Request timed out");
    }

    #[tokio::test]
    async fn test_stream_sends_bearer_and_yields_frames() {
        let base = test_server().await;
        let client = client_for(&format!("{}/api", base));
        client.set_token("streamer");

        let mut stream = client.open_stream("/stream").unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, es::SSE::Comment(_)));
        match stream.next().await.unwrap().unwrap() {
            es::SSE::Event(event) => {
                assert_eq!(event.event_type, "whoami");
                assert_eq!(event.data, "Bearer streamer");
            }
            es::SSE::Comment(_) => panic!("expected the whoami event"),
        }
    }

    #[tokio::test]
    async fn test_stream_accepts_cr_line_endings() {
        let base = test_server().await;
        let client = client_for(&format!("{}/api", base));

        let mut stream = client.open_stream("/cr-stream").unwrap();
        match stream.next().await.unwrap().unwrap() {
            es::SSE::Event(event) => {
                assert_eq!(event.event_type, "locations:update");
                assert_eq!(event.data, "{}");
            }
            es::SSE::Comment(_) => panic!("expected an event"),
        }
    }

    #[tokio::test]
    async fn test_stream_to_closed_port_errors() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}/api", addr));
        let mut stream = client.open_stream("/locations/stream").unwrap();
        let item = stream.next().await.unwrap();
        assert!(matches!(item, Err(ClientError::Stream(_))));
    }
}
