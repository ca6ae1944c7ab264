//! Error types for console API access.

use thiserror::Error;

/// Main error type for console client operations
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Network-level failure (connection refused, DNS, TLS, body read)
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("backend returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Backend reported a user-facing message in its `error` field
    #[error("{0}")]
    Domain(String),

    /// 2xx response whose payload is missing required data
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    /// Request exceeded the configured deadline
    #[error("{method} {path} timed out")]
    Timeout { method: String, path: String },

    /// Invalid client configuration
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Config file could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Session value cannot be carried in an HTTP header
    #[error("invalid header value for {0}")]
    InvalidHeader(String),

    /// Caller-supplied input rejected before sending
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`ConsoleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Domain,
    ResponseShape,
    Timeout,
    Config,
    Input,
    Storage,
}

impl ConsoleError {
    /// Classify this error.
    ///
    /// Non-2xx responses without a normalized message count as transport
    /// errors; their original status and body stay available on the variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::Transport(_) | ConsoleError::Http { .. } => ErrorKind::Transport,
            ConsoleError::Domain(_) => ErrorKind::Domain,
            ConsoleError::ResponseShape(_) => ErrorKind::ResponseShape,
            ConsoleError::Timeout { .. } => ErrorKind::Timeout,
            ConsoleError::InvalidConfig(_) | ConsoleError::ConfigParse(_) => ErrorKind::Config,
            ConsoleError::InvalidHeader(_) | ConsoleError::InvalidInput(_) => ErrorKind::Input,
            ConsoleError::Io(_) | ConsoleError::Json(_) => ErrorKind::Storage,
        }
    }

    /// True for failures callers usually treat alike: network, HTTP status, timeout.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Timeout)
    }

    /// HTTP status code, when the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Http { status, .. } => Some(*status),
            ConsoleError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Best human-readable message for an HTTP error.
    ///
    /// Prefers a string `error` field, then a string `detail` field, then the
    /// raw body. Other variants fall back to their display text.
    pub fn message(&self) -> String {
        match self {
            ConsoleError::Http { body, .. } => {
                let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
                parsed
                    .as_ref()
                    .and_then(|v| {
                        v.get("error")
                            .and_then(|e| e.as_str())
                            .or_else(|| v.get("detail").and_then(|d| d.as_str()))
                    })
                    .map(str::to_string)
                    .unwrap_or_else(|| body.clone())
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for console client operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_display() {
        let err = ConsoleError::Http {
            status: 404,
            body: r#"{"detail":"not found"}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"backend returned 404: {"detail":"not found"}"#);
    }

    #[test]
    fn test_domain_display_is_bare_message() {
        let err = ConsoleError::Domain("already linked".to_string());
        assert_eq!(err.to_string(), "already linked");
    }

    #[test]
    fn test_timeout_display() {
        let err = ConsoleError::Timeout {
            method: "GET".to_string(),
            path: "/v1/apps/search".to_string(),
        };
        assert_eq!(err.to_string(), "GET /v1/apps/search timed out");
    }

    #[test]
    fn test_kind_classification() {
        let http = ConsoleError::Http {
            status: 500,
            body: "{}".to_string(),
        };
        assert_eq!(http.kind(), ErrorKind::Transport);
        assert!(http.is_transport());

        let timeout = ConsoleError::Timeout {
            method: "GET".to_string(),
            path: "/".to_string(),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert!(timeout.is_transport());

        let domain = ConsoleError::Domain("nope".to_string());
        assert!(!domain.is_transport());

        let shape = ConsoleError::ResponseShape("missing url".to_string());
        assert_eq!(shape.kind(), ErrorKind::ResponseShape);
    }

    #[test]
    fn test_message_prefers_error_then_detail() {
        let err = ConsoleError::Http {
            status: 409,
            body: r#"{"error":"already linked","detail":"ignored"}"#.to_string(),
        };
        assert_eq!(err.message(), "already linked");

        let err = ConsoleError::Http {
            status: 404,
            body: r#"{"detail":"MCP server with ID x not found"}"#.to_string(),
        };
        assert_eq!(err.message(), "MCP server with ID x not found");

        let err = ConsoleError::Http {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(err.message(), "Bad Gateway");
        assert_eq!(err.status(), Some(502));
    }
}
