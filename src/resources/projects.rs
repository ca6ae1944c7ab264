//! Projects of an organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatcher::QueryParams;
use crate::error::ConsoleError;
use crate::resources::Scoped;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub visibility_access: Option<String>,
    #[serde(default)]
    pub daily_quota_used: u64,
    #[serde(default)]
    pub api_quota_monthly_used: u64,
    #[serde(default)]
    pub total_quota_used: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ProjectCreate<'a> {
    name: &'a str,
    org_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ProjectUpdate<'a> {
    name: &'a str,
}

fn check_name(name: &str) -> crate::Result<()> {
    if name.trim().is_empty() {
        return Err(ConsoleError::InvalidInput(
            "project name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

pub struct Projects<'a> {
    scoped: Scoped<'a>,
}

impl<'a> Projects<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    /// Projects of the organization in the `X-ORG-ID` header.
    pub async fn list(&self) -> crate::Result<Vec<Project>> {
        self.scoped.get(&["projects"], &QueryParams::new()).await
    }

    pub async fn create(&self, org_id: Uuid, name: &str) -> crate::Result<Project> {
        check_name(name)?;
        self.scoped
            .post(
                &["projects"],
                &QueryParams::new(),
                Some(&ProjectCreate { name, org_id }),
            )
            .await
    }

    pub async fn update(&self, project_id: Uuid, name: &str) -> crate::Result<Project> {
        check_name(name)?;
        self.scoped
            .patch(
                &["projects", &project_id.to_string()],
                &QueryParams::new(),
                Some(&ProjectUpdate { name }),
            )
            .await
    }

    pub async fn delete(&self, project_id: Uuid) -> crate::Result<()> {
        self.scoped
            .delete(&["projects", &project_id.to_string()])
            .await
    }
}
