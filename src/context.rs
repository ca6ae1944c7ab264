//! Session context store — access token, active organization and the
//! active project per organization.
//!
//! Reads are synchronous and never touch the network. The dispatcher reads
//! the store once per request; writes come from login, org/project switch
//! and logout flows.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::bootstrap::OrgMembership;

/// Read access to the ambient tenant context.
pub trait ContextStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn active_org_id(&self) -> Option<String>;
    fn active_project_id(&self, org_id: &str) -> Option<String>;
}

/// A store with no session at all. Every read returns `None`.
///
/// Used when running outside an authenticated session; requests go out
/// without auth or tenant headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl ContextStore for Detached {
    fn access_token(&self) -> Option<String> {
        None
    }

    fn active_org_id(&self) -> Option<String> {
        None
    }

    fn active_project_id(&self, _org_id: &str) -> Option<String> {
        None
    }
}

/// Serializable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_org_id: Option<String>,
    #[serde(default)]
    pub active_project_by_org: HashMap<String, String>,
}

/// Shared, cloneable session context. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<SessionSnapshot>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(|s| s.clone())
    }

    pub fn set_access_token(&self, token: Option<String>) {
        self.write(|s| s.access_token = token);
    }

    /// Switch the active organization. Stored project choices are kept per org.
    pub fn set_active_org(&self, org_id: Option<String>) {
        self.write(|s| s.active_org_id = org_id);
    }

    pub fn set_active_project(&self, org_id: &str, project_id: String) {
        self.write(|s| {
            s.active_project_by_org.insert(org_id.to_string(), project_id);
        });
    }

    pub fn clear_active_project(&self, org_id: &str) {
        self.write(|s| {
            s.active_project_by_org.remove(org_id);
        });
    }

    /// Drop everything (logout).
    pub fn clear(&self) {
        self.write(|s| *s = SessionSnapshot::default());
    }

    /// Select the first membership as active org when none is selected yet.
    ///
    /// Returns the org id that is active afterwards.
    pub fn adopt_first_org(&self, memberships: &[OrgMembership]) -> Option<String> {
        self.write(|s| {
            if s.active_org_id.is_none() {
                s.active_org_id = memberships.first().map(|m| m.org_id.clone());
            }
            s.active_org_id.clone()
        })
    }

    /// Load a session file. A missing or blank file yields an empty session.
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::new());
        }
        let snapshot: SessionSnapshot = serde_json::from_str(&contents)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Persist the session atomically with owner-only permissions.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = create_owner_only(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        // A leftover tmp file keeps its old mode through `open`
        set_file_permissions_0600(&tmp_path);
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&SessionSnapshot) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut SessionSnapshot) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl ContextStore for SessionContext {
    fn access_token(&self) -> Option<String> {
        self.read(|s| s.access_token.clone())
    }

    fn active_org_id(&self) -> Option<String> {
        self.read(|s| s.active_org_id.clone())
    }

    fn active_project_id(&self, org_id: &str) -> Option<String> {
        self.read(|s| s.active_project_by_org.get(org_id).cloned())
    }
}

#[cfg(unix)]
fn create_owner_only(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_owner_only(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(unix)]
fn set_file_permissions_0600(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o600);
    if let Err(e) = fs::set_permissions(path, perms) {
        tracing::warn!(path = %path.display(), error = %e, "could not restrict session file permissions");
    }
}

#[cfg(not(unix))]
fn set_file_permissions_0600(_path: &Path) {}
