use crate::store::{KvStore, KvStoreExt};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// `pending` is the only non-terminal state; `approved` and `rejected`
/// never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Which timestamp a time-change request corrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeChangeKind {
    Login,
    Logout,
    BreakStart,
    BreakEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeChangeRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: TimeChangeKind,
    pub date: String,
    #[serde(with = "time::serde::rfc3339")]
    pub original_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_time: OffsetDateTime,
    pub reason: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub approved_by: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
}

impl TimeChangeRequest {
    pub fn key(id: Uuid) -> String {
        format!("request:time:{id}")
    }

    pub async fn find(store: &dyn KvStore, id: Uuid) -> anyhow::Result<Option<Self>> {
        store.get_as(&Self::key(id)).await
    }

    pub async fn list_all(store: &dyn KvStore) -> anyhow::Result<Vec<Self>> {
        store.scan_as("request:time:").await
    }

    pub async fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.put_as(&Self::key(self.id), self).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub approved_by: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
}

impl LeaveRequest {
    pub fn key(id: Uuid) -> String {
        format!("request:leave:{id}")
    }

    pub async fn find(store: &dyn KvStore, id: Uuid) -> anyhow::Result<Option<Self>> {
        store.get_as(&Self::key(id)).await
    }

    pub async fn list_all(store: &dyn KvStore) -> anyhow::Result<Vec<Self>> {
        store.scan_as("request:leave:").await
    }

    pub async fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.put_as(&Self::key(self.id), self).await
    }
}
