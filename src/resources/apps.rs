//! Apps — the integration catalogue plus an organization's own user apps.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatcher::QueryParams;
use crate::error::ConsoleError;
use crate::pagination::{Page, PageRequest, SearchFilter};
use crate::resources::Scoped;
use crate::resources::functions::{BasicFunctionDefinition, FunctionDetails};

static APP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9_]+$").expect("valid app name regex"));

/// Check an app name before it is sent: uppercase letters, digits and
/// single underscores only.
pub fn validate_app_name(name: &str) -> crate::Result<()> {
    if !APP_NAME.is_match(name) || name.contains("__") {
        return Err(ConsoleError::InvalidInput(format!(
            "app name '{}' must be uppercase letters, digits and single underscores",
            name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// App as returned by detail and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub logo: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub visibility: Visibility,
    pub active: bool,
    /// Security scheme names, or their public configs for user apps.
    #[serde(default)]
    pub security_schemes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    /// Owning organization, set on user apps only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_security_schemes: Option<serde_json::Value>,
}

/// Body for creating or replacing a user app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUpsert {
    pub name: String,
    pub display_name: String,
    pub provider: String,
    pub version: String,
    pub description: String,
    pub logo: String,
    pub categories: Vec<String>,
    pub visibility: Visibility,
    pub active: bool,
    pub security_schemes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub default_security_credentials_by_scheme: HashMap<String, serde_json::Value>,
}

/// Filters for `GET /v1/apps/search` and the user-app listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSearch {
    pub search: Option<String>,
    pub categories: Vec<String>,
    pub page: PageRequest,
}

impl SearchFilter for AppSearch {
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
        let search = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        query.push_opt("search", search).push_all(
            "categories",
            self.categories.iter().filter(|c| !c.trim().is_empty()),
        );
    }
}

/// Flags for `POST /v1/user-apps/{name}/functions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertFunctionsOptions {
    pub override_existing: bool,
    pub remove_previous: bool,
}

pub struct Apps<'a> {
    scoped: Scoped<'a>,
}

impl<'a> Apps<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn search(&self, filter: &AppSearch) -> crate::Result<Page<App>> {
        self.scoped.search(&["apps", "search"], filter).await
    }

    pub async fn search_all(&self, filter: &AppSearch, page_size: u32) -> crate::Result<Vec<App>> {
        self.scoped.fetch_all(&["apps", "search"], filter, page_size).await
    }

    pub async fn get(&self, app_name: &str) -> crate::Result<App> {
        self.scoped.get(&["apps", app_name], &QueryParams::new()).await
    }

    /// All category tags in use.
    pub async fn categories(&self) -> crate::Result<Vec<String>> {
        self.scoped.get(&["apps", "categories"], &QueryParams::new()).await
    }

    /// Functions of a catalogue app, in the basic definition format.
    pub async fn functions(&self, app_name: &str) -> crate::Result<Vec<BasicFunctionDefinition>> {
        self.scoped
            .get(&["apps", app_name, "functions"], &QueryParams::new())
            .await
    }

    /// Active user apps of the organization, windowed but not paged.
    pub async fn list_user_apps(&self, filter: &AppSearch) -> crate::Result<Vec<App>> {
        self.scoped.get(&["user-apps"], &filter.to_query()).await
    }

    /// User apps including inactive ones, as a page.
    pub async fn search_user_apps(&self, filter: &AppSearch) -> crate::Result<Page<App>> {
        self.scoped.search(&["user-apps", "search"], filter).await
    }

    pub async fn get_user_app(&self, app_name: &str) -> crate::Result<App> {
        self.scoped
            .get(&["user-apps", app_name], &QueryParams::new())
            .await
    }

    pub async fn user_functions(
        &self,
        app_name: &str,
    ) -> crate::Result<Vec<BasicFunctionDefinition>> {
        self.scoped
            .get(&["user-apps", app_name, "functions"], &QueryParams::new())
            .await
    }

    /// Stored definitions of a user app's functions, unformatted.
    pub async fn user_functions_raw(&self, app_name: &str) -> crate::Result<Vec<FunctionDetails>> {
        let mut query = QueryParams::new();
        query.push("raw", true);
        self.scoped
            .get(&["user-apps", app_name, "functions"], &query)
            .await
    }

    pub async fn create(&self, app: &AppUpsert) -> crate::Result<App> {
        validate_app_name(&app.name)?;
        self.scoped
            .post(&["user-apps"], &QueryParams::new(), Some(app))
            .await
    }

    pub async fn update(&self, app_name: &str, app: &AppUpsert) -> crate::Result<App> {
        self.scoped
            .put(&["user-apps", app_name], &QueryParams::new(), Some(app))
            .await
    }

    pub async fn delete(&self, app_name: &str) -> crate::Result<()> {
        self.scoped.delete(&["user-apps", app_name]).await
    }

    /// Upsert function definitions under a user app.
    pub async fn upsert_functions(
        &self,
        app_name: &str,
        functions: &[serde_json::Value],
        options: UpsertFunctionsOptions,
    ) -> crate::Result<Vec<BasicFunctionDefinition>> {
        let mut query = QueryParams::new();
        query
            .push("override_existing", options.override_existing)
            .push("remove_previous", options.remove_previous);
        self.scoped
            .post(&["user-apps", app_name, "functions"], &query, Some(functions))
            .await
    }

    /// `false` on 404, any other failure propagates.
    pub async fn exists(&self, app_name: &str) -> crate::Result<bool> {
        match self.get(app_name).await {
            Ok(_) => Ok(true),
            Err(ConsoleError::Http { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
