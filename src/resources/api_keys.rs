//! API keys of the active project, addressed by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatcher::QueryParams;
use crate::pagination::{Page, PageRequest};
use crate::resources::Scoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStatus {
    Active,
    Disabled,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub name: String,
    pub key: String,
    pub project_id: Uuid,
    pub status: ApiKeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ApiKeyCreate<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiKeyUpdate {
    status: ApiKeyStatus,
}

pub struct ApiKeys<'a> {
    scoped: Scoped<'a>,
}

impl<'a> ApiKeys<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn create(&self, name: &str) -> crate::Result<ApiKey> {
        self.scoped
            .post(&["api-keys"], &QueryParams::new(), Some(&ApiKeyCreate { name }))
            .await
    }

    pub async fn list(&self, page: PageRequest) -> crate::Result<Page<ApiKey>> {
        self.scoped.search(&["api-keys"], &page).await
    }

    pub async fn list_all(&self, page_size: u32) -> crate::Result<Vec<ApiKey>> {
        self.scoped
            .fetch_all(&["api-keys"], &PageRequest::default(), page_size)
            .await
    }

    pub async fn get(&self, name: &str) -> crate::Result<ApiKey> {
        self.scoped.get(&["api-keys", name], &QueryParams::new()).await
    }

    pub async fn update(&self, name: &str, status: ApiKeyStatus) -> crate::Result<ApiKey> {
        self.scoped
            .patch(
                &["api-keys", name],
                &QueryParams::new(),
                Some(&ApiKeyUpdate { status }),
            )
            .await
    }

    pub async fn delete(&self, name: &str) -> crate::Result<()> {
        self.scoped.delete(&["api-keys", name]).await
    }
}
