use crate::store::{KvStore, KvStoreExt};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const BREAK_TYPES_KEY: &str = "settings:breakTypes";
pub const ACTIVITIES_KEY: &str = "settings:activities";

pub const DEFAULT_BREAK_TYPES: &[&str] = &[
    "Coffee Break",
    "Lunch Break",
    "Rest Break",
    "Personal",
    "Bio Break",
];

pub const DEFAULT_ACTIVITIES: &[&str] = &[
    "Available",
    "On Call",
    "Email Support",
    "Chat Support",
    "Documentation",
    "Training",
    "Meeting",
];

/// Globally shared vocabularies; whole-list replacement on write.
pub async fn load_list(store: &dyn KvStore, key: &str) -> anyhow::Result<Vec<String>> {
    Ok(store.get_as(key).await?.unwrap_or_default())
}

pub async fn store_list(store: &dyn KvStore, key: &str, list: &[String]) -> anyhow::Result<()> {
    store.put_as(key, &list).await
}

/// Named work schedule, stored under `schedule:<id>`. Field names keep the
/// snake_case wire shape of the settings UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "start_time")]
    pub start_time: String,
    #[serde(rename = "end_time")]
    pub end_time: String,
    #[serde(rename = "break_types", default)]
    pub break_types: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Schedule {
    pub fn key(id: Uuid) -> String {
        format!("schedule:{id}")
    }

    pub async fn find(store: &dyn KvStore, id: Uuid) -> anyhow::Result<Option<Self>> {
        store.get_as(&Self::key(id)).await
    }

    pub async fn list_all(store: &dyn KvStore) -> anyhow::Result<Vec<Self>> {
        store.scan_as("schedule:").await
    }

    pub async fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.put_as(&Self::key(self.id), self).await
    }

    pub async fn delete(store: &dyn KvStore, id: Uuid) -> anyhow::Result<()> {
        store.delete(&Self::key(id)).await
    }
}

/// Expense category with owner-scoped visibility, stored `category:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub owner: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Category {
    pub fn key(id: Uuid) -> String {
        format!("category:{id}")
    }

    pub async fn find(store: &dyn KvStore, id: Uuid) -> anyhow::Result<Option<Self>> {
        store.get_as(&Self::key(id)).await
    }

    pub async fn list_all(store: &dyn KvStore) -> anyhow::Result<Vec<Self>> {
        store.scan_as("category:").await
    }

    pub async fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.put_as(&Self::key(self.id), self).await
    }

    pub async fn delete(store: &dyn KvStore, id: Uuid) -> anyhow::Result<()> {
        store.delete(&Self::key(id)).await
    }
}
