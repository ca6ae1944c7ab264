//! In-process mock backend for dispatcher and resource tests.
//!
//! An axum router bound to an ephemeral port records every request and
//! answers with whatever the test's responder returns.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::Url;
use serde_json::{Value, json};

use crate::config::ConsoleConfig;
use crate::context::ContextStore;
use crate::dispatcher::ApiClient;

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Decoded values for `key`, in wire order.
    pub fn query_values(&self, key: &str) -> Vec<String> {
        let Some(query) = &self.query else {
            return Vec::new();
        };
        let Ok(url) = Url::parse(&format!("http://mock/?{}", query)) else {
            return Vec::new();
        };
        url.query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    pub fn query_value(&self, key: &str) -> Option<String> {
        self.query_values(key).into_iter().next()
    }
}

/// Programmed reply.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: Option<Value>,
    pub delay: Option<Duration>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
            delay: None,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Responder = Arc<dyn Fn(&CapturedRequest) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responder: Responder,
}

pub struct MockBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockBackend {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&CapturedRequest) -> MockReply + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            requests: requests.clone(),
            responder: Arc::new(responder),
        };
        let app = Router::new().fallback(handle).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> CapturedRequest {
        self.requests()
            .pop()
            .expect("mock backend received no request")
    }

    pub fn client(&self, context: Arc<dyn ContextStore>) -> ApiClient {
        ApiClient::new(&ConsoleConfig::new(self.base_url.clone()), context).unwrap()
    }

    pub fn client_with_timeout(&self, context: Arc<dyn ContextStore>, timeout_ms: u64) -> ApiClient {
        let mut config = ConsoleConfig::new(self.base_url.clone());
        config.timeout_ms = timeout_ms;
        ApiClient::new(&config, context).unwrap()
    }
}

async fn handle(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let body = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };
    let headers = parts
        .headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    let captured = CapturedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers,
        body,
    };
    state.requests.lock().unwrap().push(captured.clone());

    let reply = (state.responder)(&captured);
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match reply.body {
        Some(value) => (status, Json(value)).into_response(),
        None => status.into_response(),
    }
}

/// Slice `items` the way the backend does for `limit`/`offset`.
pub fn paginate(items: &[Value], request: &CapturedRequest) -> Value {
    let offset = request
        .query_value("offset")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let limit = request
        .query_value("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(100);
    let window: Vec<Value> = items.iter().skip(offset).take(limit).cloned().collect();
    json!({ "items": window, "total": items.len() })
}
