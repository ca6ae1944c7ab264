//! Tenant console — tenant-scoped API access layer for the integration
//! platform backend.
//!
//! Every request goes through one [`ApiClient`] that reads the injected
//! [`ContextStore`] and attaches the bearer token plus `X-ORG-ID` /
//! `X-PROJECT-ID` routing headers. Resource families (apps, functions, API
//! keys, linked accounts, execution logs, MCP servers, organizations,
//! billing, projects, app configurations, analytics) are thin typed façades
//! over that client. [`BootstrapResolver`] waits for a new account's default
//! organization to be provisioned.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod pagination;
pub mod resources;

#[cfg(test)]
mod test_support;

pub use bootstrap::{
    BootstrapOutcome, BootstrapResolver, BootstrapState, Delay, HttpMembershipSource,
    MembershipSource, OrgMembership, TokioDelay,
};
pub use config::{BootstrapConfig, ConsoleConfig, SessionConfig, parse_env_ref, resolve_env_ref};
pub use context::{ContextStore, Detached, SessionContext, SessionSnapshot};
pub use dispatcher::{ApiClient, QueryParams, tenant_headers};
pub use error::{ConsoleError, ErrorKind, Result};
pub use normalize::{ErrorPolicy, ResourceFamily, normalize_error};
pub use pagination::{Page, PageRequest, SearchFilter};
