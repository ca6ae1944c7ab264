//! Function execution logs of the active project.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dispatcher::QueryParams;
use crate::pagination::{Page, PageRequest, SearchFilter};
use crate::resources::Scoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: Uuid,
    pub function_name: String,
    pub app_name: String,
    pub linked_account_owner_id: Option<String>,
    pub app_configuration_id: Option<Uuid>,
    pub status: ExecutionStatus,
    /// Milliseconds.
    pub execution_time: u64,
    pub created_at: DateTime<Utc>,
    pub project_id: Uuid,
}

/// Log entry with the recorded request and response payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogDetail {
    #[serde(flatten)]
    pub log: ExecutionLog,
    #[serde(default)]
    pub request: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionLogSearch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub app_name: Option<String>,
    pub function_name: Option<String>,
    pub app_configuration_id: Option<Uuid>,
    pub linked_account_owner_id: Option<String>,
    pub page: PageRequest,
}

impl SearchFilter for ExecutionLogSearch {
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
        let timestamp = |t: &DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);
        query
            .push_opt("start_time", self.start_time.as_ref().map(timestamp))
            .push_opt("end_time", self.end_time.as_ref().map(timestamp))
            .push_opt("app_name", self.app_name.as_deref())
            .push_opt("function_name", self.function_name.as_deref())
            .push_opt("app_configuration_id", self.app_configuration_id)
            .push_opt(
                "linked_account_owner_id",
                self.linked_account_owner_id.as_deref(),
            );
    }
}

pub struct ExecutionLogs<'a> {
    scoped: Scoped<'a>,
}

impl<'a> ExecutionLogs<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn search(&self, filter: &ExecutionLogSearch) -> crate::Result<Page<ExecutionLog>> {
        self.scoped.search(&["execution-logs"], filter).await
    }

    pub async fn get(&self, id: Uuid) -> crate::Result<ExecutionLogDetail> {
        self.scoped
            .get(&["execution-logs", &id.to_string()], &QueryParams::new())
            .await
    }
}
