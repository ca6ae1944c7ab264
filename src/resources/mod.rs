//! Resource access modules, one thin typed façade per backend family.
//!
//! Every façade talks through a [`Scoped`] client tagged with its
//! [`ResourceFamily`], so the family's error policy is applied to every call
//! the same way.

pub mod analytics;
pub mod api_keys;
pub mod app_configurations;
pub mod apps;
pub mod billing;
pub mod execution_logs;
pub mod functions;
pub mod linked_accounts;
pub mod mcp_servers;
pub mod organizations;
pub mod projects;

use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::dispatcher::{ApiClient, QueryParams};
use crate::normalize::{ResourceFamily, normalize_error};
use crate::pagination::{Page, SearchFilter};

pub use analytics::Analytics;
pub use api_keys::ApiKeys;
pub use app_configurations::AppConfigurations;
pub use apps::Apps;
pub use billing::Billing;
pub use execution_logs::ExecutionLogs;
pub use functions::Functions;
pub use linked_accounts::LinkedAccounts;
pub use mcp_servers::McpServers;
pub use organizations::Organizations;
pub use projects::Projects;

/// Dispatcher view bound to one resource family.
#[derive(Debug, Clone, Copy)]
pub struct Scoped<'a> {
    client: &'a ApiClient,
    family: ResourceFamily,
}

impl<'a> Scoped<'a> {
    pub fn new(client: &'a ApiClient, family: ResourceFamily) -> Self {
        Self { client, family }
    }

    pub fn family(&self) -> ResourceFamily {
        self.family
    }

    fn normalize<T>(&self, result: crate::Result<T>) -> crate::Result<T> {
        result.map_err(|e| normalize_error(e, self.family.error_policy()))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &QueryParams,
    ) -> crate::Result<T> {
        self.normalize(self.client.get(segments, query).await)
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
        self.normalize(self.client.post(segments, query, body).await)
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
        self.normalize(self.client.put(segments, query, body).await)
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
        self.normalize(self.client.patch(segments, query, body).await)
    }

    /// Any 2xx body is accepted and discarded.
    pub async fn delete(&self, segments: &[&str]) -> crate::Result<()> {
        let _: IgnoredAny = self.normalize(self.client.delete(segments).await)?;
        Ok(())
    }

    pub async fn search<T, F>(&self, segments: &[&str], filter: &F) -> crate::Result<Page<T>>
    where
        T: DeserializeOwned,
        F: SearchFilter,
    {
        self.normalize(self.client.search(segments, filter).await)
    }

    pub async fn search_listing<T, F>(&self, segments: &[&str], filter: &F) -> crate::Result<Page<T>>
    where
        T: DeserializeOwned,
        F: SearchFilter,
    {
        self.normalize(self.client.search_listing(segments, filter).await)
    }

    pub async fn fetch_all<T, F>(
        &self,
        segments: &[&str],
        filter: &F,
        page_size: u32,
    ) -> crate::Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: SearchFilter,
    {
        self.normalize(self.client.fetch_all(segments, filter, page_size).await)
    }
}

impl ApiClient {
    pub fn apps(&self) -> Apps<'_> {
        Apps::new(Scoped::new(self, ResourceFamily::Apps))
    }

    pub fn functions(&self) -> Functions<'_> {
        Functions::new(Scoped::new(self, ResourceFamily::Functions))
    }

    pub fn api_keys(&self) -> ApiKeys<'_> {
        ApiKeys::new(Scoped::new(self, ResourceFamily::ApiKeys))
    }

    pub fn linked_accounts(&self) -> LinkedAccounts<'_> {
        LinkedAccounts::new(Scoped::new(self, ResourceFamily::LinkedAccounts))
    }

    pub fn execution_logs(&self) -> ExecutionLogs<'_> {
        ExecutionLogs::new(Scoped::new(self, ResourceFamily::ExecutionLogs))
    }

    pub fn mcp_servers(&self) -> McpServers<'_> {
        McpServers::new(Scoped::new(self, ResourceFamily::McpServers))
    }

    pub fn organizations(&self) -> Organizations<'_> {
        Organizations::new(Scoped::new(self, ResourceFamily::Organizations))
    }

    pub fn billing(&self) -> Billing<'_> {
        Billing::new(Scoped::new(self, ResourceFamily::Billing))
    }

    pub fn projects(&self) -> Projects<'_> {
        Projects::new(Scoped::new(self, ResourceFamily::Projects))
    }

    pub fn app_configurations(&self) -> AppConfigurations<'_> {
        AppConfigurations::new(Scoped::new(self, ResourceFamily::AppConfigurations))
    }

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics::new(Scoped::new(self, ResourceFamily::Analytics))
    }
}
