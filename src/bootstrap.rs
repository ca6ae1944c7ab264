//! Organization bootstrap — waits out the backend's asynchronous provisioning
//! of a new account's default organization.
//!
//! The resolver reads the identity provider's known memberships; while the
//! list is empty it asks the provider to refresh, pausing between attempts,
//! up to a fixed attempt cap. Running out of attempts is a normal outcome
//! (`GaveUp` with an empty list), not an error.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::{BootstrapConfig, ConsoleConfig};
use crate::error::ConsoleError;

/// Maximum refresh attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Pause between refresh attempts.
pub const ATTEMPT_DELAY: Duration = Duration::from_secs(1);

/// One organization the signed-in user belongs to, as reported by the
/// identity provider. Fields this crate does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgMembership {
    pub org_id: String,
    #[serde(default)]
    pub org_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The identity provider, as far as bootstrap is concerned.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Currently known memberships (in-memory, no I/O).
    fn organizations(&self) -> Vec<OrgMembership>;

    /// Re-fetch memberships from the provider.
    async fn refresh(&self) -> crate::Result<()>;
}

/// Injectable pause between attempts.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock delay backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Membership source backed by an identity-provider HTTP endpoint.
///
/// `refresh` GETs the endpoint with the bearer token and caches the result;
/// `organizations` returns the cache. The endpoint may answer with a bare
/// list or with `{ "orgs": [...] }`.
pub struct HttpMembershipSource {
    http: reqwest::Client,
    url: Url,
    access_token: String,
    cached: Mutex<Vec<OrgMembership>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MembershipPayload {
    List(Vec<OrgMembership>),
    Wrapped { orgs: Vec<OrgMembership> },
}

impl HttpMembershipSource {
    pub fn new(
        config: &ConsoleConfig,
        url: &str,
        access_token: impl Into<String>,
    ) -> crate::Result<Self> {
        let url = Url::parse(url).map_err(|e| {
            ConsoleError::InvalidConfig(format!("memberships url '{}': {}", url, e))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConsoleError::InvalidConfig(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            url,
            access_token: access_token.into(),
            cached: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MembershipSource for HttpMembershipSource {
    fn organizations(&self) -> Vec<OrgMembership> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh(&self) -> crate::Result<()> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                ConsoleError::Timeout {
                    method: "GET".to_string(),
                    path: self.url.path().to_string(),
                }
            } else {
                ConsoleError::Transport(e)
            }
        };
        let response = self
            .http
            .get(self.url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        if !status.is_success() {
            return Err(ConsoleError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let orgs = match serde_json::from_str(&body) {
            Ok(MembershipPayload::List(orgs)) | Ok(MembershipPayload::Wrapped { orgs }) => orgs,
            Err(e) => {
                return Err(ConsoleError::ResponseShape(format!(
                    "membership payload: {}",
                    e
                )));
            }
        };
        tracing::debug!(count = orgs.len(), "memberships refreshed");
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = orgs;
        Ok(())
    }
}

/// Three-state bootstrap model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    /// Memberships still empty, attempts remain
    Polling,
    /// At least one membership found
    Resolved,
    /// Attempt cap reached with no membership
    GaveUp,
}

/// Result of one `resolve` run.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapOutcome {
    pub state: BootstrapState,
    pub organizations: Vec<OrgMembership>,
    /// Number of `refresh` invocations made.
    pub refreshes: u32,
}

/// Bounded-retry membership poller.
///
/// Not de-duplicated: callers must not run two resolves concurrently for
/// the same identity.
#[derive(Debug, Clone)]
pub struct BootstrapResolver<D: Delay = TokioDelay> {
    max_attempts: u32,
    delay: Duration,
    sleeper: D,
}

impl Default for BootstrapResolver<TokioDelay> {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapResolver<TokioDelay> {
    /// Five attempts, one second apart, real time.
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: ATTEMPT_DELAY,
            sleeper: TokioDelay,
        }
    }

    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
            sleeper: TokioDelay,
        }
    }
}

impl<D: Delay> BootstrapResolver<D> {
    /// Swap the delay implementation (e.g. a fake clock in tests).
    pub fn with_delay<E: Delay>(self, sleeper: E) -> BootstrapResolver<E> {
        BootstrapResolver {
            max_attempts: self.max_attempts,
            delay: self.delay,
            sleeper,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Poll `source` until it reports at least one membership or the attempt
    /// cap is reached.
    ///
    /// A failed refresh is logged and still counts as an attempt.
    pub async fn resolve<S: MembershipSource + ?Sized>(&self, source: &S) -> BootstrapOutcome {
        let mut state = BootstrapState::Polling;
        let mut refreshes: u32 = 0;
        let mut organizations = source.organizations();

        while state == BootstrapState::Polling {
            if !organizations.is_empty() {
                state = BootstrapState::Resolved;
                continue;
            }
            if refreshes >= self.max_attempts {
                state = BootstrapState::GaveUp;
                continue;
            }
            if refreshes > 0 {
                tracing::debug!(
                    attempt = refreshes,
                    delay_ms = self.delay.as_millis() as u64,
                    "no organization yet, waiting before next refresh"
                );
                self.sleeper.sleep(self.delay).await;
            }

            refreshes += 1;
            if let Err(e) = source.refresh().await {
                tracing::warn!(attempt = refreshes, error = %e, "membership refresh failed");
            }
            organizations = source.organizations();
        }

        match state {
            BootstrapState::Resolved => tracing::info!(
                refreshes,
                org_count = organizations.len(),
                "organization bootstrap resolved"
            ),
            _ => tracing::warn!(
                refreshes,
                "organization bootstrap gave up, no organization provisioned yet"
            ),
        }

        BootstrapOutcome {
            state,
            organizations,
            refreshes,
        }
    }

    /// Like [`resolve`](Self::resolve) but returns only the membership list.
    pub async fn resolve_organizations<S: MembershipSource + ?Sized>(
        &self,
        source: &S,
    ) -> Vec<OrgMembership> {
        self.resolve(source).await.organizations
    }
}
