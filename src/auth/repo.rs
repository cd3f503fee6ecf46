use crate::store::{KvStore, KvStoreExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Agent,
    Admin,
    Superadmin,
}

impl Role {
    /// Admins and the super admin handle approvals and rosters.
    pub fn can_approve(self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

/// User record, stored under `user:<id>`. `assigned_to` points at the
/// admin/superadmin who owns this user's requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

impl User {
    pub fn key(id: Uuid) -> String {
        format!("user:{id}")
    }

    pub async fn find_by_id(store: &dyn KvStore, id: Uuid) -> anyhow::Result<Option<User>> {
        store.get_as(&Self::key(id)).await
    }

    /// Emails are stored lowercase; the whole roster fits in one scan.
    pub async fn find_by_email(store: &dyn KvStore, email: &str) -> anyhow::Result<Option<User>> {
        let users: Vec<User> = store.scan_as("user:").await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    pub async fn list_all(store: &dyn KvStore) -> anyhow::Result<Vec<User>> {
        store.scan_as("user:").await
    }

    pub async fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.put_as(&Self::key(self.id), self).await
    }
}

/// Session record, stored under `session:<token>`. The token itself is the
/// bearer credential; no TTL, sessions live until deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub is_impersonating: bool,
    #[serde(default)]
    pub original_session_id: Option<String>,
    #[serde(default)]
    pub original_user_id: Option<Uuid>,
}

impl Session {
    pub fn key(id: &str) -> String {
        format!("session:{id}")
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            name: user.name.clone(),
            assigned_to: user.assigned_to,
            team: user.team.clone(),
            is_impersonating: false,
            original_session_id: None,
            original_user_id: None,
        }
    }

    pub async fn load(store: &dyn KvStore, id: &str) -> anyhow::Result<Option<Session>> {
        store.get_as(&Self::key(id)).await
    }

    pub async fn save(&self, store: &dyn KvStore, id: &str) -> anyhow::Result<()> {
        store.put_as(&Self::key(id), self).await
    }

    pub async fn delete(store: &dyn KvStore, id: &str) -> anyhow::Result<()> {
        store.delete(&Self::key(id)).await
    }
}
