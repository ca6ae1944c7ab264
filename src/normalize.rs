//! Error normalization and response checks shared by every resource family.
//!
//! One policy function decides whether a backend failure reaches the caller
//! as a clean [`ConsoleError::Domain`] message or unchanged.

use serde_json::Value;

use crate::error::ConsoleError;

/// How a family treats non-2xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Every error propagates unchanged.
    Passthrough,
    /// A structured `error` message becomes a `Domain` error.
    SurfaceDomain,
}

/// Backend resource families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFamily {
    Apps,
    Functions,
    ApiKeys,
    LinkedAccounts,
    ExecutionLogs,
    McpServers,
    Organizations,
    Billing,
    Projects,
    AppConfigurations,
    Analytics,
}

impl ResourceFamily {
    pub fn error_policy(self) -> ErrorPolicy {
        match self {
            ResourceFamily::LinkedAccounts => ErrorPolicy::SurfaceDomain,
            _ => ErrorPolicy::Passthrough,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceFamily::Apps => "apps",
            ResourceFamily::Functions => "functions",
            ResourceFamily::ApiKeys => "api-keys",
            ResourceFamily::LinkedAccounts => "linked-accounts",
            ResourceFamily::ExecutionLogs => "execution-logs",
            ResourceFamily::McpServers => "mcp-servers",
            ResourceFamily::Organizations => "organizations",
            ResourceFamily::Billing => "billing",
            ResourceFamily::Projects => "projects",
            ResourceFamily::AppConfigurations => "app-configurations",
            ResourceFamily::Analytics => "analytics",
        }
    }
}

/// The string `error` field of an HTTP error body, if any.
pub fn domain_message(err: &ConsoleError) -> Option<String> {
    let ConsoleError::Http { body, .. } = err else {
        return None;
    };
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

/// Apply `policy` to an error.
pub fn normalize_error(err: ConsoleError, policy: ErrorPolicy) -> ConsoleError {
    match policy {
        ErrorPolicy::Passthrough => err,
        ErrorPolicy::SurfaceDomain => match domain_message(&err) {
            Some(message) => {
                tracing::debug!(status = ?err.status(), message = %message, "surfacing backend error message");
                ConsoleError::Domain(message)
            }
            None => err,
        },
    }
}

/// Extract a required non-empty string `url` from a 2xx payload.
pub fn require_url(payload: &Value, what: &str) -> crate::Result<String> {
    match payload.get("url").and_then(Value::as_str) {
        Some(url) if !url.trim().is_empty() => Ok(url.to_string()),
        _ => Err(ConsoleError::ResponseShape(format!(
            "{} response has no 'url' field",
            what
        ))),
    }
}
