//! MCP servers exposed on top of an app configuration.

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatcher::{NO_BODY, QueryParams};
use crate::pagination::{Page, PageRequest, SearchFilter};
use crate::resources::Scoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpAuthType {
    ApiKey,
    Oauth2,
    NoAuth,
}

impl McpAuthType {
    pub fn as_str(self) -> &'static str {
        match self {
            McpAuthType::ApiKey => "api_key",
            McpAuthType::Oauth2 => "oauth2",
            McpAuthType::NoAuth => "no_auth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServer {
    /// Opaque server id.
    pub id: String,
    pub name: String,
    pub app_config_id: Uuid,
    pub app_name: String,
    pub auth_type: McpAuthType,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    pub mcp_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McpServerCreate {
    pub name: String,
    pub app_config_id: Uuid,
    pub auth_type: McpAuthType,
    pub allowed_tools: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McpServerSearch {
    pub app_config_id: Option<Uuid>,
    pub auth_type: Option<McpAuthType>,
    pub page: PageRequest,
}

impl SearchFilter for McpServerSearch {
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
        query
            .push_opt("app_config_id", self.app_config_id)
            .push_opt("auth_type", self.auth_type.map(McpAuthType::as_str));
    }
}

pub struct McpServers<'a> {
    scoped: Scoped<'a>,
}

impl<'a> McpServers<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn create(&self, server: &McpServerCreate) -> crate::Result<McpServer> {
        self.scoped
            .post(&["mcp-servers"], &QueryParams::new(), Some(server))
            .await
    }

    /// The backend may answer with a bare array; its `total` is then the
    /// size of the returned window.
    pub async fn search(&self, filter: &McpServerSearch) -> crate::Result<Page<McpServer>> {
        self.scoped.search_listing(&["mcp-servers"], filter).await
    }

    pub async fn get(&self, id: &str) -> crate::Result<McpServer> {
        self.scoped.get(&["mcp-servers", id], &QueryParams::new()).await
    }

    pub async fn delete(&self, id: &str) -> crate::Result<()> {
        self.scoped.delete(&["mcp-servers", id]).await
    }

    /// Invalidate the current link and issue a new one.
    pub async fn regenerate_link(&self, id: &str) -> crate::Result<McpServer> {
        self.scoped
            .put(&["mcp-servers", id, "regenerate-link"], &QueryParams::new(), NO_BODY)
            .await
    }

    /// Allow `function_name` on the server. The backend replies with `null`.
    pub async fn add_tool(&self, id: &str, function_name: &str) -> crate::Result<()> {
        let _: IgnoredAny = self
            .scoped
            .post(
                &["mcp-servers", id, "tools", function_name],
                &QueryParams::new(),
                NO_BODY,
            )
            .await?;
        Ok(())
    }

    pub async fn remove_tool(&self, id: &str, function_name: &str) -> crate::Result<()> {
        self.scoped
            .delete(&["mcp-servers", id, "tools", function_name])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionContext;
    use crate::test_support::{MockBackend, MockReply, paginate};
    use serde_json::{Value, json};
    use std::sync::Arc;

    const CONFIG_ID: &str = "c2d4e6f8-0a1b-4c3d-8e5f-7a9b1c3d5e7f";

    fn server_json(id: &str, tools: &[&str]) -> Value {
        json!({
            "id": id,
            "name": "github tools",
            "app_config_id": CONFIG_ID,
            "app_name": "GITHUB",
            "auth_type": "oauth2",
            "allowed_tools": tools,
            "mcp_link": format!("https://mcp.example.com/{}/mcp", id),
            "created_at": "2025-05-01T00:00:00Z",
            "updated_at": "2025-05-01T00:00:00Z",
            "last_used_at": null
        })
    }

    fn session() -> Arc<SessionContext> {
        let ctx = SessionContext::new();
        ctx.set_access_token(Some("tok".to_string()));
        ctx.set_active_org(Some("org-1".to_string()));
        Arc::new(ctx)
    }

    #[tokio::test]
    async fn test_search_filters() {
        let servers = vec![server_json("srv_1", &[]), server_json("srv_2", &[])];
        let backend = MockBackend::start(move |req| MockReply::ok(paginate(&servers, req))).await;
        let client = backend.client(session());

        let filter = McpServerSearch {
            app_config_id: Some(Uuid::parse_str(CONFIG_ID).unwrap()),
            auth_type: Some(McpAuthType::Oauth2),
            page: PageRequest::first(50),
        };
        let page = client.mcp_servers().search(&filter).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].auth_type, McpAuthType::Oauth2);

        let req = backend.last_request();
        assert_eq!(req.path, "/v1/mcp-servers");
        assert_eq!(req.query_value("app_config_id").as_deref(), Some(CONFIG_ID));
        assert_eq!(req.query_value("auth_type").as_deref(), Some("oauth2"));
    }

    #[tokio::test]
    async fn test_search_accepts_bare_list() {
        let servers = vec![
            server_json("srv_1", &[]),
            server_json("srv_2", &[]),
            server_json("srv_3", &[]),
        ];
        let backend = MockBackend::start(move |req| {
            let offset = req
                .query_value("offset")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            let limit = req
                .query_value("limit")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(100);
            let window: Vec<Value> = servers.iter().skip(offset).take(limit).cloned().collect();
            MockReply::ok(Value::Array(window))
        })
        .await;
        let client = backend.client(session());

        let filter = McpServerSearch {
            page: PageRequest::new(2, 1),
            ..Default::default()
        };
        let page = client.mcp_servers().search(&filter).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, "srv_2");
    }

    #[tokio::test]
    async fn test_search_bare_list_over_limit_rejected() {
        let backend = MockBackend::start(|_| {
            MockReply::ok(json!([server_json("srv_1", &[]), server_json("srv_2", &[])]))
        })
        .await;
        let client = backend.client(session());
        let filter = McpServerSearch {
            page: PageRequest::first(1),
            ..Default::default()
        };
        let err = client.mcp_servers().search(&filter).await.unwrap_err();
        assert!(matches!(err, crate::ConsoleError::ResponseShape(_)));
    }

    #[tokio::test]
    async fn test_regenerate_link_uses_put() {
        let backend = MockBackend::start(|_| MockReply::ok(server_json("srv_1", &[]))).await;
        let client = backend.client(session());
        let server = client.mcp_servers().regenerate_link("srv_1").await.unwrap();
        assert!(server.mcp_link.unwrap().contains("srv_1"));
        let req = backend.last_request();
        assert_eq!(req.method, "PUT");
        assert_eq!(req.path, "/v1/mcp-servers/srv_1/regenerate-link");
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn test_add_and_remove_tool() {
        let backend = MockBackend::start(|req| {
            if req.method == "POST" {
                MockReply::ok(Value::Null)
            } else {
                MockReply::ok(json!({"message": "removed"}))
            }
        })
        .await;
        let client = backend.client(session());

        client
            .mcp_servers()
            .add_tool("srv_1", "GITHUB__STAR_REPO")
            .await
            .unwrap();

        client
            .mcp_servers()
            .remove_tool("srv_1", "GITHUB__STAR_REPO")
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/v1/mcp-servers/srv_1/tools/GITHUB__STAR_REPO");
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].path, "/v1/mcp-servers/srv_1/tools/GITHUB__STAR_REPO");
    }

    #[tokio::test]
    async fn test_create_body() {
        let backend = MockBackend::start(|_| MockReply::ok(server_json("srv_9", &[]))).await;
        let client = backend.client(session());
        client
            .mcp_servers()
            .create(&McpServerCreate {
                name: "github tools".to_string(),
                app_config_id: Uuid::parse_str(CONFIG_ID).unwrap(),
                auth_type: McpAuthType::ApiKey,
                allowed_tools: vec![],
            })
            .await
            .unwrap();
        let body = backend.last_request().body.unwrap();
        assert_eq!(body["auth_type"], "api_key");
        assert_eq!(body["app_config_id"], CONFIG_ID);
    }
}
