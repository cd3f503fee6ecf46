use serde::Serialize;
use std::collections::BTreeSet;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::attendance::repo::{AttendanceRecord, BreakRecord};

/// Everything the dashboards need to know about one agent right now.
pub struct AgentSnapshot {
    pub user_id: Uuid,
    pub name: String,
    pub team: Option<String>,
    pub today: Option<AttendanceRecord>,
    pub active_breaks: Vec<BreakRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presence {
    OnBreak,
    LoggedIn,
    Offline,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySummary {
    pub total_agents: usize,
    pub logged_in: usize,
    pub on_break: usize,
    pub avg_hours: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub total_days: usize,
    pub avg_attendance: i64,
    pub total_hours: i64,
    pub avg_hours_per_day: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLiveStatus {
    pub user_id: Uuid,
    pub name: String,
    pub team: Option<String>,
    pub status: Presence,
    pub activity: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub login_time: Option<OffsetDateTime>,
    pub hours_today: f64,
}

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn today_summary(snapshots: &[AgentSnapshot], now: OffsetDateTime) -> TodaySummary {
    let logged_in = snapshots
        .iter()
        .filter(|s| {
            s.today
                .as_ref()
                .is_some_and(|r| r.login_time.is_some() && r.logout_time.is_none())
        })
        .count();
    // counts break records, not agents; one agent can hold several
    let on_break = snapshots.iter().map(|s| s.active_breaks.len()).sum::<usize>();

    // clock-in always stamps loginTime, so every record contributes an
    // hours value and the divisor equals today's record count
    let hours: Vec<f64> = snapshots
        .iter()
        .filter_map(|s| s.today.as_ref().and_then(|r| r.hours(now)))
        .collect();
    let avg_hours = if hours.is_empty() {
        0.0
    } else {
        round1(hours.iter().sum::<f64>() / hours.len() as f64)
    };

    TodaySummary {
        total_agents: snapshots.len(),
        logged_in,
        on_break,
        avg_hours,
    }
}

/// Month rollup over every agent's records for the current month.
///
/// `avgAttendance` keeps the historical approximation: the denominator is
/// `agents x distinct-dates`, so a roster change mid-month can push it past
/// 100%. It is reported as computed, never clamped.
pub fn month_summary(records: &[AttendanceRecord], agent_count: usize) -> MonthSummary {
    let days: BTreeSet<&str> = records.iter().map(|r| r.date.as_str()).collect();
    let total_days = days.len();

    let completed_hours: f64 = records
        .iter()
        .filter(|r| r.logout_time.is_some())
        .filter_map(|r| r.hours(OffsetDateTime::UNIX_EPOCH))
        .sum();

    let record_count = records.len();
    let avg_hours_per_day = if record_count == 0 {
        0.0
    } else {
        round1(completed_hours / record_count as f64)
    };

    let denominator = agent_count * total_days;
    let avg_attendance = if denominator == 0 {
        0
    } else {
        (record_count as f64 / denominator as f64 * 100.0).round() as i64
    };

    MonthSummary {
        total_days,
        avg_attendance,
        total_hours: completed_hours.round() as i64,
        avg_hours_per_day,
    }
}

/// Any active break wins over an open attendance record.
pub fn live_row(snapshot: &AgentSnapshot, now: OffsetDateTime) -> AgentLiveStatus {
    let today = snapshot.today.as_ref();
    let status = if !snapshot.active_breaks.is_empty() {
        Presence::OnBreak
    } else if today.is_some_and(|r| r.login_time.is_some() && r.logout_time.is_none()) {
        Presence::LoggedIn
    } else {
        Presence::Offline
    };

    AgentLiveStatus {
        user_id: snapshot.user_id,
        name: snapshot.name.clone(),
        team: snapshot.team.clone(),
        status,
        activity: today.map(|r| r.activity.clone()),
        login_time: today.and_then(|r| r.login_time),
        hours_today: today
            .and_then(|r| r.hours(now))
            .map(round1)
            .unwrap_or(0.0),
    }
}
