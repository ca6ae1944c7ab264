//! Per-project app configurations, addressed by app name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dispatcher::QueryParams;
use crate::pagination::{PageRequest, SearchFilter};
use crate::resources::Scoped;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfiguration {
    pub id: Uuid,
    pub project_id: Uuid,
    pub app_name: String,
    pub security_scheme: String,
    #[serde(default)]
    pub security_scheme_overrides: Value,
    pub enabled: bool,
    pub all_functions_enabled: bool,
    #[serde(default)]
    pub enabled_functions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfigurationCreate {
    pub app_name: String,
    pub security_scheme: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub security_scheme_overrides: Value,
    pub all_functions_enabled: bool,
    pub enabled_functions: Vec<String>,
}

/// Partial update; unset fields are left unchanged by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppConfigurationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_functions_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_functions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfigurationSearch {
    pub app_names: Vec<String>,
    pub page: PageRequest,
}

impl SearchFilter for AppConfigurationSearch {
    fn page(&self) -> PageRequest {
        self.page
    }

    fn with_page(&self, page: PageRequest) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    fn append_filters(&self, query: &mut QueryParams) {
        query.push_all("app_names", &self.app_names);
    }
}

pub struct AppConfigurations<'a> {
    scoped: Scoped<'a>,
}

impl<'a> AppConfigurations<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn create(&self, config: &AppConfigurationCreate) -> crate::Result<AppConfiguration> {
        self.scoped
            .post(&["app-configurations"], &QueryParams::new(), Some(config))
            .await
    }

    /// The backend returns a plain list here, windowed by `limit`/`offset`.
    pub async fn list(
        &self,
        filter: &AppConfigurationSearch,
    ) -> crate::Result<Vec<AppConfiguration>> {
        self.scoped
            .get(&["app-configurations"], &filter.to_query())
            .await
    }

    pub async fn get(&self, app_name: &str) -> crate::Result<AppConfiguration> {
        self.scoped
            .get(&["app-configurations", app_name], &QueryParams::new())
            .await
    }

    pub async fn update(
        &self,
        app_name: &str,
        update: &AppConfigurationUpdate,
    ) -> crate::Result<AppConfiguration> {
        self.scoped
            .patch(&["app-configurations", app_name], &QueryParams::new(), Some(update))
            .await
    }

    /// Also removes the configuration's linked accounts and MCP servers.
    pub async fn delete(&self, app_name: &str) -> crate::Result<()> {
        self.scoped.delete(&["app-configurations", app_name]).await
    }
}
