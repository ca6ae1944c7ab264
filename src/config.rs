//! Console client configuration — deserialization and validation.

use crate::error::ConsoleError;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is not a
/// valid env-var reference.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve a `${VAR}` reference to the variable's value.
///
/// Unset or empty variables resolve to `None`.
pub fn resolve_env_ref(value: &str) -> Option<String> {
    let var_name = parse_env_ref(value)?;
    std::env::var(var_name).ok().filter(|v| !v.is_empty())
}

/// Top-level client configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Backend base URL, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Per-request deadline in milliseconds, default 10s.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Optional session seed. Secrets are only ever read from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// `${VAR}` reference holding a bearer token.
    pub access_token: Option<String>,
    pub org_id: Option<String>,
    pub project_id: Option<String>,
}

/// Organization bootstrap polling parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Identity provider endpoint listing the caller's org memberships.
    pub memberships_url: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            memberships_url: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    1_000
}

impl ConsoleConfig {
    /// Config pointing at `base_url` with every other field defaulted.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: default_timeout_ms(),
            user_agent: None,
            session: SessionConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: ConsoleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the config, failing fast before any client is built.
    pub fn validate(&self) -> crate::Result<()> {
        self.parsed_base_url()?;

        if self.timeout_ms == 0 {
            return Err(ConsoleError::InvalidConfig(
                "timeout_ms must be > 0".to_string(),
            ));
        }

        if self.bootstrap.max_attempts == 0 {
            return Err(ConsoleError::InvalidConfig(
                "bootstrap.max_attempts must be >= 1".to_string(),
            ));
        }

        if let Some(url) = &self.bootstrap.memberships_url {
            let parsed = Url::parse(url).map_err(|e| {
                ConsoleError::InvalidConfig(format!("bootstrap.memberships_url '{}': {}", url, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConsoleError::InvalidConfig(
                    "bootstrap.memberships_url must be http or https".to_string(),
                ));
            }
        }

        if let Some(token) = &self.session.access_token {
            if parse_env_ref(token).is_none() {
                return Err(ConsoleError::InvalidConfig(
                    "session.access_token must be a ${VAR} reference, not a literal token"
                        .to_string(),
                ));
            }
        }

        if self.session.project_id.is_some() && self.session.org_id.is_none() {
            return Err(ConsoleError::InvalidConfig(
                "session.project_id requires session.org_id".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL as a parsed `Url`; only http and https are accepted.
    pub fn parsed_base_url(&self) -> crate::Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ConsoleError::InvalidConfig(format!("base_url '{}': {}", self.base_url, e))
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConsoleError::InvalidConfig(format!(
                    "base_url scheme must be http or https, got '{}'",
                    other
                )));
            }
        }
        if url.cannot_be_a_base() {
            return Err(ConsoleError::InvalidConfig(format!(
                "base_url '{}' cannot carry a path",
                self.base_url
            )));
        }
        Ok(url)
    }
}
