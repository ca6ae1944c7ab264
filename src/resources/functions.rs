//! Functions — search, definitions, execution and user-function removal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dispatcher::QueryParams;
use crate::pagination::{PageRequest, SearchFilter};
use crate::resources::Scoped;
use crate::resources::apps::Visibility;

/// Name and description only, the `basic` definition format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicFunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Full stored function, returned when raw definitions are requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDetails {
    pub id: Uuid,
    pub app_name: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub active: bool,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub protocol_data: Value,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub response: Value,
}

/// Shape of a returned function definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefinitionFormat {
    #[default]
    Basic,
    OpenAi,
    OpenAiResponses,
    Anthropic,
}

impl DefinitionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionFormat::Basic => "basic",
            DefinitionFormat::OpenAi => "openai",
            DefinitionFormat::OpenAiResponses => "openai_responses",
            DefinitionFormat::Anthropic => "anthropic",
        }
    }
}

impl std::str::FromStr for DefinitionFormat {
    type Err = crate::ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(DefinitionFormat::Basic),
            "openai" => Ok(DefinitionFormat::OpenAi),
            "openai_responses" => Ok(DefinitionFormat::OpenAiResponses),
            "anthropic" => Ok(DefinitionFormat::Anthropic),
            other => Err(crate::ConsoleError::InvalidInput(format!(
                "unknown definition format '{}'",
                other
            ))),
        }
    }
}

/// Filters for `GET /v1/functions/search`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionSearch {
    pub app_names: Vec<String>,
    /// Natural-language description of the wanted capability.
    pub intent: Option<String>,
    /// Restrict results to apps the calling agent is allowed to use.
    pub allowed_apps_only: bool,
    pub format: Option<DefinitionFormat>,
    pub page: PageRequest,
}

impl SearchFilter for FunctionSearch {
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
        let intent = self.intent.as_deref().map(str::trim).filter(|i| !i.is_empty());
        query
            .push_all("app_names", &self.app_names)
            .push_opt("intent", intent)
            .push_opt("allowed_apps_only", self.allowed_apps_only.then_some(true))
            .push_opt("format", self.format.map(DefinitionFormat::as_str));
    }
}

/// Result of `POST /v1/functions/{name}/execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExecute {
    pub function_input: Value,
    pub linked_account_owner_id: String,
}

pub struct Functions<'a> {
    scoped: Scoped<'a>,
}

impl<'a> Functions<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    /// Search returns a plain list of definitions in the requested format.
    pub async fn search(&self, filter: &FunctionSearch) -> crate::Result<Vec<Value>> {
        self.scoped
            .get(&["functions", "search"], &filter.to_query())
            .await
    }

    pub async fn definition(
        &self,
        function_name: &str,
        format: DefinitionFormat,
    ) -> crate::Result<Value> {
        let mut query = QueryParams::new();
        query.push("format", format.as_str());
        self.scoped
            .get(&["functions", function_name, "definition"], &query)
            .await
    }

    pub async fn execute(
        &self,
        function_name: &str,
        request: &FunctionExecute,
    ) -> crate::Result<ExecutionResult> {
        self.scoped
            .post(
                &["functions", function_name, "execute"],
                &QueryParams::new(),
                Some(request),
            )
            .await
    }

    /// A user-defined function of the active organization, in `format`.
    pub async fn get_user_function(
        &self,
        function_name: &str,
        format: DefinitionFormat,
    ) -> crate::Result<Value> {
        let mut query = QueryParams::new();
        query.push("format", format.as_str());
        self.scoped
            .get(&["user-functions", function_name], &query)
            .await
    }

    /// Remove a user-defined function.
    pub async fn delete(&self, function_name: &str) -> crate::Result<()> {
        self.scoped.delete(&["user-functions", function_name]).await
    }
}
