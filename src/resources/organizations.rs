//! Members of the active organization.

use serde::{Deserialize, Serialize};

use crate::dispatcher::QueryParams;
use crate::error::ConsoleError;
use crate::resources::Scoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationUser {
    pub user_id: String,
    pub email: String,
    pub role: Option<OrganizationRole>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct InviteMember<'a> {
    email: &'a str,
    role: OrganizationRole,
}

pub struct Organizations<'a> {
    scoped: Scoped<'a>,
}

impl<'a> Organizations<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn list_users(&self) -> crate::Result<Vec<OrganizationUser>> {
        self.scoped
            .get(&["organizations", "users"], &QueryParams::new())
            .await
    }

    /// Invite `email` with `role`. Owners cannot be invited; that is refused
    /// before any request is made.
    pub async fn invite_user(&self, email: &str, role: OrganizationRole) -> crate::Result<()> {
        if role == OrganizationRole::Owner {
            return Err(ConsoleError::InvalidInput(
                "cannot invite users with the Owner role".to_string(),
            ));
        }
        if email.trim().is_empty() {
            return Err(ConsoleError::InvalidInput("email must not be empty".to_string()));
        }
        self.scoped
            .post(
                &["organizations", "invite-user"],
                &QueryParams::new(),
                Some(&InviteMember { email, role }),
            )
            .await
    }

    pub async fn remove_user(&self, user_id: &str) -> crate::Result<()> {
        self.scoped
            .delete(&["organizations", "users", user_id])
            .await
    }
}
