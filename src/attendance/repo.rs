use crate::store::{KvStore, KvStoreExt};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Shared lifecycle status for attendance and break records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Completed,
}

/// `YYYY-MM-DD` key component for a calendar day.
pub fn date_key(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// `YYYY-MM` prefix for month filtering.
pub fn month_key(date: Date) -> String {
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}

pub fn parse_date_key(s: &str) -> anyhow::Result<Date> {
    let fmt = format_description!("[year]-[month]-[day]");
    Ok(Date::parse(s, &fmt)?)
}

/// One record per (user, calendar day), keyed `attendance:<user>:<date>`.
/// Clocking in again on the same day overwrites the existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub login_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logout_time: Option<OffsetDateTime>,
    pub activity: String,
    pub status: RecordStatus,
    pub device_name: String,
    pub device_type: String,
    #[serde(rename = "deviceOS")]
    pub device_os: String,
    pub ip_address: String,
}

impl AttendanceRecord {
    pub fn key(user_id: Uuid, date: &str) -> String {
        format!("attendance:{user_id}:{date}")
    }

    pub fn user_prefix(user_id: Uuid) -> String {
        format!("attendance:{user_id}:")
    }

    pub async fn for_day(
        store: &dyn KvStore,
        user_id: Uuid,
        date: &str,
    ) -> anyhow::Result<Option<AttendanceRecord>> {
        store.get_as(&Self::key(user_id, date)).await
    }

    pub async fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.put_as(&Self::key(self.user_id, &self.date), self).await
    }

    /// Worked hours so far: `(logout ?? now) - login`.
    pub fn hours(&self, now: OffsetDateTime) -> Option<f64> {
        self.login_time.map(|login| {
            let logout = self.logout_time.unwrap_or(now);
            (logout - login).as_seconds_f64() / 3600.0
        })
    }
}

/// Break entries are append-only under `break:<user>:<id>`. The ledger does
/// not reject a second active break for the same user; the client is the
/// only guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub break_type: String,
    pub activity: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_activity: Option<String>,
}

impl BreakRecord {
    pub fn key(user_id: Uuid, break_id: Uuid) -> String {
        format!("break:{user_id}:{break_id}")
    }

    pub fn user_prefix(user_id: Uuid) -> String {
        format!("break:{user_id}:")
    }

    pub async fn find(
        store: &dyn KvStore,
        user_id: Uuid,
        break_id: Uuid,
    ) -> anyhow::Result<Option<BreakRecord>> {
        store.get_as(&Self::key(user_id, break_id)).await
    }

    pub async fn list_for(store: &dyn KvStore, user_id: Uuid) -> anyhow::Result<Vec<BreakRecord>> {
        store.scan_as(&Self::user_prefix(user_id)).await
    }

    pub async fn active_for(
        store: &dyn KvStore,
        user_id: Uuid,
    ) -> anyhow::Result<Option<BreakRecord>> {
        let breaks = Self::list_for(store, user_id).await?;
        Ok(breaks.into_iter().find(|b| b.status == RecordStatus::Active))
    }

    /// All of the user's currently active breaks; the ledger allows more
    /// than one.
    pub async fn all_active_for(
        store: &dyn KvStore,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<BreakRecord>> {
        let breaks = Self::list_for(store, user_id).await?;
        Ok(breaks
            .into_iter()
            .filter(|b| b.status == RecordStatus::Active)
            .collect())
    }

    pub async fn save(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        store.put_as(&Self::key(self.user_id, self.id), self).await
    }
}
