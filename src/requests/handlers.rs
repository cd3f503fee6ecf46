use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::attendance::repo::{parse_date_key, AttendanceRecord};
use crate::auth::extractors::CurrentSession;
use crate::auth::repo::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{
    ApproveForm, LeaveForm, PendingRequestsResponse, SubmittedResponse, SuccessResponse,
    TimeChangeForm,
};
use super::repo::{LeaveRequest, RequestStatus, TimeChangeKind, TimeChangeRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/request-time-change", post(request_time_change))
        .route("/approve-time-change", post(approve_time_change))
        .route("/request-leave", post(request_leave))
        .route("/approve-leave", post(approve_leave))
        .route("/pending-requests", get(pending_requests))
}

/// Approval routing target: the requester's owning admin/superadmin.
async fn assigned_admin(state: &AppState, user_id: Uuid) -> Result<Option<Uuid>, ApiError> {
    let user = User::find_by_id(state.store.as_ref(), user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(user.assigned_to)
}

#[instrument(skip(state, actor, payload))]
pub async fn request_time_change(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<TimeChangeForm>,
) -> Result<Json<SubmittedResponse>, ApiError> {
    parse_date_key(&payload.date)
        .map_err(|_| ApiError::BadRequest("Invalid date".into()))?;
    if payload.reason.trim().is_empty() {
        return Err(ApiError::BadRequest("Reason is required".into()));
    }

    let request = TimeChangeRequest {
        id: Uuid::new_v4(),
        user_id: actor.session.user_id,
        user_name: actor.session.name.clone(),
        kind: payload.kind,
        date: payload.date,
        original_time: payload.original_time,
        requested_time: payload.requested_time,
        reason: payload.reason,
        status: RequestStatus::Pending,
        assigned_to: assigned_admin(&state, actor.session.user_id).await?,
        created_at: OffsetDateTime::now_utc(),
        approved_by: None,
        approved_at: None,
    };
    request.save(state.store.as_ref()).await?;

    info!(request_id = %request.id, user_id = %request.user_id, kind = ?request.kind, "time change requested");
    Ok(Json(SubmittedResponse {
        success: true,
        request_id: request.id,
    }))
}

#[instrument(skip(state, actor, payload))]
pub async fn approve_time_change(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<ApproveForm>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !actor.session.role.can_approve() {
        return Err(ApiError::unauthorized());
    }

    let mut request = TimeChangeRequest::find(state.store.as_ref(), payload.request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Request not found".into()))?;
    if request.status != RequestStatus::Pending {
        return Err(ApiError::BadRequest("Request already resolved".into()));
    }

    request.status = if payload.approved {
        RequestStatus::Approved
    } else {
        RequestStatus::Rejected
    };
    request.approved_by = Some(actor.session.user_id);
    request.approved_at = Some(OffsetDateTime::now_utc());
    request.save(state.store.as_ref()).await?;

    // Approved login/logout corrections are written back to the ledger.
    // Break-time corrections are recorded on the request only; the break
    // records themselves are left untouched (see DESIGN.md).
    if payload.approved
        && matches!(request.kind, TimeChangeKind::Login | TimeChangeKind::Logout)
    {
        if let Some(mut attendance) =
            AttendanceRecord::for_day(state.store.as_ref(), request.user_id, &request.date).await?
        {
            match request.kind {
                TimeChangeKind::Login => attendance.login_time = Some(request.requested_time),
                TimeChangeKind::Logout => attendance.logout_time = Some(request.requested_time),
                _ => unreachable!(),
            }
            attendance.save(state.store.as_ref()).await?;
        }
    }

    info!(
        request_id = %request.id,
        approved = payload.approved,
        by = %actor.session.user_id,
        "time change resolved"
    );
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor, payload))]
pub async fn request_leave(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<LeaveForm>,
) -> Result<Json<SubmittedResponse>, ApiError> {
    let start = parse_date_key(&payload.start_date)
        .map_err(|_| ApiError::BadRequest("Invalid startDate".into()))?;
    let end = parse_date_key(&payload.end_date)
        .map_err(|_| ApiError::BadRequest("Invalid endDate".into()))?;
    if start > end {
        return Err(ApiError::BadRequest(
            "startDate must not be after endDate".into(),
        ));
    }
    if payload.reason.trim().is_empty() {
        return Err(ApiError::BadRequest("Reason is required".into()));
    }

    let request = LeaveRequest {
        id: Uuid::new_v4(),
        user_id: actor.session.user_id,
        user_name: actor.session.name.clone(),
        start_date: payload.start_date,
        end_date: payload.end_date,
        reason: payload.reason,
        status: RequestStatus::Pending,
        assigned_to: assigned_admin(&state, actor.session.user_id).await?,
        created_at: OffsetDateTime::now_utc(),
        approved_by: None,
        approved_at: None,
    };
    request.save(state.store.as_ref()).await?;

    info!(request_id = %request.id, user_id = %request.user_id, "leave requested");
    Ok(Json(SubmittedResponse {
        success: true,
        request_id: request.id,
    }))
}

#[instrument(skip(state, actor, payload))]
pub async fn approve_leave(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<ApproveForm>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !actor.session.role.can_approve() {
        return Err(ApiError::unauthorized());
    }

    let mut request = LeaveRequest::find(state.store.as_ref(), payload.request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Request not found".into()))?;
    if request.status != RequestStatus::Pending {
        return Err(ApiError::BadRequest("Request already resolved".into()));
    }

    request.status = if payload.approved {
        RequestStatus::Approved
    } else {
        RequestStatus::Rejected
    };
    request.approved_by = Some(actor.session.user_id);
    request.approved_at = Some(OffsetDateTime::now_utc());
    request.save(state.store.as_ref()).await?;

    info!(
        request_id = %request.id,
        approved = payload.approved,
        by = %actor.session.user_id,
        "leave resolved"
    );
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor))]
pub async fn pending_requests(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<PendingRequestsResponse>, ApiError> {
    let mut time_requests: Vec<TimeChangeRequest> =
        TimeChangeRequest::list_all(state.store.as_ref())
            .await?
            .into_iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .collect();
    let mut leave_requests: Vec<LeaveRequest> = LeaveRequest::list_all(state.store.as_ref())
        .await?
        .into_iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .collect();

    match actor.session.role {
        Role::Superadmin => {}
        Role::Admin => {
            let me = actor.session.user_id;
            time_requests.retain(|r| r.assigned_to == Some(me));
            leave_requests.retain(|r| r.assigned_to == Some(me));
        }
        Role::Agent => {
            let me = actor.session.user_id;
            time_requests.retain(|r| r.user_id == me);
            leave_requests.retain(|r| r.user_id == me);
        }
    }

    Ok(Json(PendingRequestsResponse {
        time_requests,
        leave_requests,
    }))
}
