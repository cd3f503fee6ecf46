use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::collections::BTreeSet;
use time::OffsetDateTime;
use tracing::instrument;

use crate::attendance::repo::{date_key, month_key, AttendanceRecord, BreakRecord};
use crate::auth::extractors::CurrentSession;
use crate::auth::repo::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::KvStoreExt;

use super::services::{self, AgentLiveStatus, AgentSnapshot, MonthSummary, TodaySummary};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/live-status", get(live_status))
        .route("/admin-live-status", get(admin_live_status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusResponse {
    pub today_summary: TodaySummary,
    pub month_summary: MonthSummary,
    pub live_status: Vec<AgentLiveStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

async fn build_dashboard(
    state: &AppState,
    agents: Vec<User>,
    include_teams: bool,
) -> Result<LiveStatusResponse, ApiError> {
    let now = OffsetDateTime::now_utc();
    let today = date_key(now.date());
    let month = month_key(now.date());

    let mut snapshots = Vec::with_capacity(agents.len());
    let mut month_records = Vec::new();
    for agent in &agents {
        let records: Vec<AttendanceRecord> = state
            .store
            .scan_as(&AttendanceRecord::user_prefix(agent.id))
            .await?;

        let today_record = records.iter().find(|r| r.date == today).cloned();
        month_records.extend(records.into_iter().filter(|r| r.date.starts_with(&month)));

        snapshots.push(AgentSnapshot {
            user_id: agent.id,
            name: agent.name.clone(),
            team: agent.team.clone(),
            today: today_record,
            active_breaks: BreakRecord::all_active_for(state.store.as_ref(), agent.id).await?,
        });
    }

    let teams = include_teams.then(|| {
        let set: BTreeSet<String> = agents.iter().filter_map(|u| u.team.clone()).collect();
        set.into_iter().collect()
    });

    Ok(LiveStatusResponse {
        today_summary: services::today_summary(&snapshots, now),
        month_summary: services::month_summary(&month_records, agents.len()),
        live_status: snapshots.iter().map(|s| services::live_row(s, now)).collect(),
        teams,
    })
}

#[instrument(skip(state, actor))]
pub async fn live_status(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<LiveStatusResponse>, ApiError> {
    if actor.session.role != Role::Superadmin {
        return Err(ApiError::unauthorized());
    }
    let agents: Vec<User> = User::list_all(state.store.as_ref())
        .await?
        .into_iter()
        .filter(|u| u.role == Role::Agent)
        .collect();
    Ok(Json(build_dashboard(&state, agents, true).await?))
}

#[instrument(skip(state, actor))]
pub async fn admin_live_status(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<LiveStatusResponse>, ApiError> {
    let me = actor.session.user_id;
    let agents: Vec<User> = match actor.session.role {
        Role::Superadmin => User::list_all(state.store.as_ref())
            .await?
            .into_iter()
            .filter(|u| u.role == Role::Agent)
            .collect(),
        Role::Admin => User::list_all(state.store.as_ref())
            .await?
            .into_iter()
            .filter(|u| u.role == Role::Agent && u.assigned_to == Some(me))
            .collect(),
        Role::Agent => return Err(ApiError::unauthorized()),
    };
    Ok(Json(build_dashboard(&state, agents, false).await?))
}
