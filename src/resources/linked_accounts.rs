//! Linked accounts — end-user credentials bound to an app configuration.
//!
//! This family surfaces backend `error` messages as [`ConsoleError::Domain`]
//! so callers can show them verbatim. The OAuth2 link call also insists on a
//! non-empty `url`; a 2xx without one is a [`ConsoleError::ResponseShape`].
//!
//! [`ConsoleError::Domain`]: crate::ConsoleError::Domain
//! [`ConsoleError::ResponseShape`]: crate::ConsoleError::ResponseShape

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dispatcher::QueryParams;
use crate::normalize::require_url;
use crate::pagination::{Page, PageRequest, SearchFilter};
use crate::resources::Scoped;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub id: Uuid,
    pub project_id: Uuid,
    pub app_name: String,
    pub linked_account_owner_id: String,
    pub security_scheme: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedAccountSearch {
    pub app_name: Option<String>,
    pub linked_account_owner_id: Option<String>,
    pub page: PageRequest,
}

impl SearchFilter for LinkedAccountSearch {
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
            .push_opt("app_name", self.app_name.as_deref())
            .push_opt(
                "linked_account_owner_id",
                self.linked_account_owner_id.as_deref(),
            );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiKeyLink {
    pub app_name: String,
    pub linked_account_owner_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoAuthLink {
    pub app_name: String,
    pub linked_account_owner_id: String,
}

/// Parameters of the OAuth2 authorization-link request.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuth2LinkRequest {
    pub app_name: String,
    pub linked_account_owner_id: String,
    pub after_oauth2_link_redirect_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct LinkedAccountUpdate {
    enabled: bool,
}

pub struct LinkedAccounts<'a> {
    scoped: Scoped<'a>,
}

impl<'a> LinkedAccounts<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn list(&self, filter: &LinkedAccountSearch) -> crate::Result<Page<LinkedAccount>> {
        self.scoped.search(&["linked-accounts"], filter).await
    }

    pub async fn get(&self, id: Uuid) -> crate::Result<LinkedAccount> {
        self.scoped
            .get(&["linked-accounts", &id.to_string()], &QueryParams::new())
            .await
    }

    pub async fn update(&self, id: Uuid, enabled: bool) -> crate::Result<LinkedAccount> {
        self.scoped
            .patch(
                &["linked-accounts", &id.to_string()],
                &QueryParams::new(),
                Some(&LinkedAccountUpdate { enabled }),
            )
            .await
    }

    pub async fn delete(&self, id: Uuid) -> crate::Result<()> {
        self.scoped
            .delete(&["linked-accounts", &id.to_string()])
            .await
    }

    pub async fn create_api_key(&self, link: &ApiKeyLink) -> crate::Result<LinkedAccount> {
        self.scoped
            .post(&["linked-accounts", "api-key"], &QueryParams::new(), Some(link))
            .await
    }

    pub async fn create_no_auth(&self, link: &NoAuthLink) -> crate::Result<LinkedAccount> {
        self.scoped
            .post(&["linked-accounts", "no-auth"], &QueryParams::new(), Some(link))
            .await
    }

    /// Authorization URL the user must visit to finish an OAuth2 link.
    pub async fn oauth2_link_url(&self, request: &OAuth2LinkRequest) -> crate::Result<String> {
        let mut query = QueryParams::new();
        query
            .push("app_name", &request.app_name)
            .push("linked_account_owner_id", &request.linked_account_owner_id)
            .push_opt(
                "after_oauth2_link_redirect_url",
                request.after_oauth2_link_redirect_url.as_deref(),
            );
        let payload: Value = self
            .scoped
            .get(&["linked-accounts", "oauth2"], &query)
            .await?;
        require_url(&payload, "oauth2 link")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionContext;
    use crate::error::{ConsoleError, ErrorKind};
    use crate::test_support::{MockBackend, MockReply, paginate};
    use serde_json::json;
    use std::sync::Arc;

    fn session() -> Arc<SessionContext> {
        let ctx = SessionContext::new();
        ctx.set_access_token(Some("tok".to_string()));
        ctx.set_active_org(Some("org-1".to_string()));
        ctx.set_active_project("org-1", "proj-1".to_string());
        Arc::new(ctx)
    }

    fn account_json(owner: &str) -> Value {
        json!({
            "id": "0d3c5a4e-1111-4a2b-9c3d-5e6f7a8b9c0d",
            "project_id": "9a7e2c61-0c0e-4f6f-9b8a-71d5f6f0c111",
            "app_name": "GITHUB",
            "linked_account_owner_id": owner,
            "security_scheme": "oauth2",
            "enabled": true,
            "created_at": "2025-02-01T00:00:00Z",
            "updated_at": "2025-02-01T00:00:00Z",
            "last_used_at": null
        })
    }

    fn no_auth() -> NoAuthLink {
        NoAuthLink {
            app_name: "GITHUB".to_string(),
            linked_account_owner_id: "user-1".to_string(),
        }
    }

    fn oauth2_request() -> OAuth2LinkRequest {
        OAuth2LinkRequest {
            app_name: "GITHUB".to_string(),
            linked_account_owner_id: "user-1".to_string(),
            after_oauth2_link_redirect_url: Some("https://app.example.com/done?x=1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_conflict_surfaces_domain_message() {
        let backend =
            MockBackend::start(|_| MockReply::json(409, json!({"error": "already linked"}))).await;
        let client = backend.client(session());
        let err = client.linked_accounts().create_no_auth(&no_auth()).await.unwrap_err();
        assert!(matches!(&err, ConsoleError::Domain(msg) if msg == "already linked"));
        assert_eq!(err.to_string(), "already linked");
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[tokio::test]
    async fn test_create_without_error_field_propagates_raw() {
        let backend = MockBackend::start(|_| MockReply::json(500, json!({}))).await;
        let client = backend.client(session());
        let err = client.linked_accounts().create_no_auth(&no_auth()).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Http { status: 500, ref body } if body == "{}"));
    }

    #[tokio::test]
    async fn test_create_api_key_path_and_body() {
        let backend = MockBackend::start(|_| MockReply::ok(account_json("user-1"))).await;
        let client = backend.client(session());
        let account = client
            .linked_accounts()
            .create_api_key(&ApiKeyLink {
                app_name: "GITHUB".to_string(),
                linked_account_owner_id: "user-1".to_string(),
                api_key: "ghp_x".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(account.linked_account_owner_id, "user-1");

        let req = backend.last_request();
        assert_eq!(req.path, "/v1/linked-accounts/api-key");
        assert_eq!(req.body.unwrap()["api_key"], "ghp_x");
    }

    #[tokio::test]
    async fn test_oauth2_url_returned() {
        let backend = MockBackend::start(|_| {
            MockReply::ok(json!({"url": "https://github.com/login/oauth/authorize?state=s"}))
        })
        .await;
        let client = backend.client(session());
        let url = client
            .linked_accounts()
            .oauth2_link_url(&oauth2_request())
            .await
            .unwrap();
        assert_eq!(url, "https://github.com/login/oauth/authorize?state=s");

        let req = backend.last_request();
        assert_eq!(req.path, "/v1/linked-accounts/oauth2");
        assert_eq!(
            req.query_value("after_oauth2_link_redirect_url").as_deref(),
            Some("https://app.example.com/done?x=1")
        );
    }

    #[tokio::test]
    async fn test_oauth2_missing_url_is_response_shape() {
        let backend = MockBackend::start(|_| MockReply::ok(json!({}))).await;
        let client = backend.client(session());
        let err = client
            .linked_accounts()
            .oauth2_link_url(&oauth2_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::ResponseShape(_)));
        assert_eq!(err.kind(), ErrorKind::ResponseShape);
    }

    #[tokio::test]
    async fn test_oauth2_backend_error_is_domain() {
        let backend = MockBackend::start(|_| {
            MockReply::json(400, json!({"error": "app configuration disabled"}))
        })
        .await;
        let client = backend.client(session());
        let err = client
            .linked_accounts()
            .oauth2_link_url(&oauth2_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Domain(msg) if msg == "app configuration disabled"));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let accounts = vec![account_json("user-1")];
        let backend = MockBackend::start(move |req| MockReply::ok(paginate(&accounts, req))).await;
        let client = backend.client(session());
        let filter = LinkedAccountSearch {
            app_name: Some("GITHUB".to_string()),
            linked_account_owner_id: Some("user-1".to_string()),
            page: PageRequest::first(10),
        };
        let page = client.linked_accounts().list(&filter).await.unwrap();
        assert_eq!(page.total, 1);

        let req = backend.last_request();
        assert_eq!(req.query_value("app_name").as_deref(), Some("GITHUB"));
        assert_eq!(req.query_value("linked_account_owner_id").as_deref(), Some("user-1"));
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_update_enabled() {
        let backend = MockBackend::start(|_| MockReply::ok(account_json("user-1"))).await;
        let client = backend.client(session());
        let id = Uuid::parse_str("0d3c5a4e-1111-4a2b-9c3d-5e6f7a8b9c0d").unwrap();
        client.linked_accounts().update(id, false).await.unwrap();
        let req = backend.last_request();
        assert_eq!(req.method, "PATCH");
        assert_eq!(req.path, format!("/v1/linked-accounts/{}", id));
        assert_eq!(req.body.unwrap(), json!({"enabled": false}));
    }
}
