//! Request dispatcher — the single HTTP client every resource call goes through.
//!
//! Before a request leaves the process, [`tenant_headers`] reads the injected
//! [`ContextStore`] and attaches `Authorization`, `X-ORG-ID` and
//! `X-PROJECT-ID`. Query parameters are an ordered pair list so array values
//! go out as repeated keys. A client-wide deadline applies to every call.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ConsoleConfig;
use crate::context::ContextStore;
use crate::error::ConsoleError;

/// Header carrying the active organization id.
pub const HEADER_ORG_ID: &str = "x-org-id";

/// Header carrying the active project id within the active organization.
pub const HEADER_PROJECT_ID: &str = "x-project-id";

/// API version segment prepended to every path.
pub const API_PREFIX: &str = "v1";

/// Pass as the body argument of a verb that sends no body.
pub const NO_BODY: Option<&'static ()> = None;

/// Ordered query parameters. Repeated keys are preserved in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Append only when a value is present.
    pub fn push_opt<V: ToString>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.push(key, v);
        }
        self
    }

    /// Append one `key=value` pair per element, in order (`q=a&q=b`).
    pub fn push_all<I>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        for v in values {
            self.push(key, v);
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All values for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Build the auth and tenant headers for one request.
///
/// The project header is only emitted inside an organization scope: with no
/// active org, stored project ids are ignored. The store is only read.
pub fn tenant_headers(store: &dyn ContextStore) -> crate::Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = store.access_token() {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ConsoleError::InvalidHeader(AUTHORIZATION.to_string()))?;
        headers.insert(AUTHORIZATION, value);
    }

    if let Some(org_id) = store.active_org_id() {
        let value = HeaderValue::from_str(&org_id)
            .map_err(|_| ConsoleError::InvalidHeader(HEADER_ORG_ID.to_string()))?;
        headers.insert(HeaderName::from_static(HEADER_ORG_ID), value);

        if let Some(project_id) = store.active_project_id(&org_id) {
            let value = HeaderValue::from_str(&project_id)
                .map_err(|_| ConsoleError::InvalidHeader(HEADER_PROJECT_ID.to_string()))?;
            headers.insert(HeaderName::from_static(HEADER_PROJECT_ID), value);
        }
    }

    Ok(headers)
}

/// Tenant-scoped HTTP client.
///
/// Cheap to clone; clones share the connection pool and the context store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    context: Arc<dyn ContextStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client from validated config and an injected context store.
    pub fn new(config: &ConsoleConfig, context: Arc<dyn ContextStore>) -> crate::Result<Self> {
        config.validate()?;
        let base_url = config.parsed_base_url()?;

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("tenant-console/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConsoleError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            context,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn context(&self) -> &Arc<dyn ContextStore> {
        &self.context
    }

    /// Resolve path segments under `/v1`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> crate::Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ConsoleError::InvalidConfig(format!("base_url '{}' cannot carry a path", self.base_url))
            })?;
            path.pop_if_empty().push(API_PREFIX).extend(segments);
        }
        Ok(url)
    }

    /// Build a fully decorated request without sending it.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &QueryParams,
        body: Option<&B>,
    ) -> crate::Result<reqwest::Request> {
        let url = self.endpoint(segments)?;
        let headers = tenant_headers(self.context.as_ref())?;

        let mut builder = self.http.request(method, url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(query.pairs());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.build().map_err(ConsoleError::Transport)
    }

    /// Send a request and decode the JSON response into `T`.
    ///
    /// Empty 2xx bodies decode as JSON `null`, so `()` and `Option<_>`
    /// targets accept 204 responses.
    pub async fn send<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        query: &QueryParams,
        body: Option<&B>,
    ) -> crate::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build_request(method.clone(), segments, query, body)?;
        let path = request.url().path().to_string();
        let timed_out = || ConsoleError::Timeout {
            method: method.to_string(),
            path: path.clone(),
        };

        let response = self.http.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                timed_out()
            } else {
                ConsoleError::Transport(e)
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                timed_out()
            } else {
                ConsoleError::Transport(e)
            }
        })?;

        tracing::debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            bytes = bytes.len(),
            "console request completed"
        );

        if !status.is_success() {
            return Err(ConsoleError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        decode(&bytes, &path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &QueryParams,
    ) -> crate::Result<T> {
        self.send(Method::GET, segments, query, NO_BODY).await
    }

    pub async fn post<B, T>(
        &self,
        segments: &[&str],
        query: &QueryParams,
        body: Option<&B>,
    ) -> crate::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, segments, query, body).await
    }

    pub async fn put<B, T>(
        &self,
        segments: &[&str],
        query: &QueryParams,
        body: Option<&B>,
    ) -> crate::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, segments, query, body).await
    }

    pub async fn patch<B, T>(
        &self,
        segments: &[&str],
        query: &QueryParams,
        body: Option<&B>,
    ) -> crate::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, segments, query, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> crate::Result<T> {
        self.send(Method::DELETE, segments, &QueryParams::new(), NO_BODY)
            .await
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8], path: &str) -> crate::Result<T> {
    let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        bytes
    };
    serde_json::from_slice(payload)
        .map_err(|e| ConsoleError::ResponseShape(format!("{}: {}", path, e)))
}
