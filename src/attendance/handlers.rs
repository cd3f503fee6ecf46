use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::requests::repo::{LeaveRequest, RequestStatus};
use crate::state::AppState;
use crate::store::KvStoreExt;

use super::dto::{
    ClockInRequest, ClockInResponse, CurrentAttendanceResponse, CurrentBreakResponse,
    EndBreakRequest, MonthAttendanceResponse, StartBreakRequest, StartBreakResponse,
    SuccessResponse, UpdateActivityRequest,
};
use super::repo::{date_key, AttendanceRecord, BreakRecord, RecordStatus};
use crate::auth::extractors::CurrentSession;
use crate::auth::repo::Role;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clock-in", post(clock_in))
        .route("/clock-out", post(clock_out))
        .route("/start-break", post(start_break))
        .route("/end-break", post(end_break))
        .route("/update-activity", post(update_activity))
        .route("/current-attendance/:user_id", get(current_attendance))
        .route("/current-break/:user_id", get(current_break))
        .route("/attendance/:user_id/:year/:month", get(month_attendance))
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "Unknown".into())
}

/// Keyed by (user, day): a second clock-in on the same day replaces the
/// first record, including its login time and activity.
#[instrument(skip(state, actor, headers, payload))]
pub async fn clock_in(
    State(state): State<AppState>,
    actor: CurrentSession,
    headers: HeaderMap,
    Json(payload): Json<ClockInRequest>,
) -> Result<Json<ClockInResponse>, ApiError> {
    let now = OffsetDateTime::now_utc();
    let record = AttendanceRecord {
        id: Uuid::new_v4(),
        user_id: actor.session.user_id,
        date: date_key(now.date()),
        login_time: Some(now),
        logout_time: None,
        activity: payload.activity,
        status: RecordStatus::Active,
        device_name: payload.device_name.unwrap_or_else(|| "Unknown Device".into()),
        device_type: payload.device_type.unwrap_or_else(|| "Unknown".into()),
        device_os: payload.device_os.unwrap_or_else(|| "Unknown".into()),
        ip_address: client_ip(&headers),
    };
    record.save(state.store.as_ref()).await?;

    info!(user_id = %record.user_id, date = %record.date, "clocked in");
    Ok(Json(ClockInResponse {
        success: true,
        attendance_id: record.id,
    }))
}

#[instrument(skip(state, actor))]
pub async fn clock_out(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<SuccessResponse>, ApiError> {
    let now = OffsetDateTime::now_utc();
    let today = date_key(now.date());

    let mut record = AttendanceRecord::for_day(state.store.as_ref(), actor.session.user_id, &today)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active attendance found".into()))?;

    record.logout_time = Some(now);
    record.status = RecordStatus::Completed;
    record.save(state.store.as_ref()).await?;

    info!(user_id = %actor.session.user_id, date = %today, "clocked out");
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_activity(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<UpdateActivityRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let today = date_key(OffsetDateTime::now_utc().date());

    let mut record = AttendanceRecord::for_day(state.store.as_ref(), actor.session.user_id, &today)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No active attendance found. Please clock in first.".into())
        })?;

    record.activity = payload.activity;
    record.save(state.store.as_ref()).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Always appends a new break record; an already active break is not
/// rejected here.
#[instrument(skip(state, actor, payload))]
pub async fn start_break(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<StartBreakRequest>,
) -> Result<Json<StartBreakResponse>, ApiError> {
    let record = BreakRecord {
        id: Uuid::new_v4(),
        user_id: actor.session.user_id,
        break_type: payload.break_type,
        activity: payload.activity,
        start_time: OffsetDateTime::now_utc(),
        end_time: None,
        status: RecordStatus::Active,
        resume_activity: None,
    };
    record.save(state.store.as_ref()).await?;

    info!(user_id = %record.user_id, break_type = %record.break_type, "break started");
    Ok(Json(StartBreakResponse {
        success: true,
        break_id: record.id,
    }))
}

#[instrument(skip(state, actor, payload))]
pub async fn end_break(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<EndBreakRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut record = BreakRecord::find(state.store.as_ref(), actor.session.user_id, payload.break_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Break not found".into()))?;

    record.end_time = Some(OffsetDateTime::now_utc());
    record.status = RecordStatus::Completed;
    record.resume_activity = payload.activity;
    record.save(state.store.as_ref()).await?;

    info!(user_id = %actor.session.user_id, break_id = %payload.break_id, "break ended");
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, _actor))]
pub async fn current_attendance(
    State(state): State<AppState>,
    _actor: CurrentSession,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CurrentAttendanceResponse>, ApiError> {
    let today = date_key(OffsetDateTime::now_utc().date());
    let attendance = AttendanceRecord::for_day(state.store.as_ref(), user_id, &today).await?;
    Ok(Json(CurrentAttendanceResponse { attendance }))
}

#[instrument(skip(state, _actor))]
pub async fn current_break(
    State(state): State<AppState>,
    _actor: CurrentSession,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CurrentBreakResponse>, ApiError> {
    let active_break = BreakRecord::active_for(state.store.as_ref(), user_id).await?;
    Ok(Json(CurrentBreakResponse { active_break }))
}

#[instrument(skip(state, actor))]
pub async fn month_attendance(
    State(state): State<AppState>,
    actor: CurrentSession,
    Path((user_id, year, month)): Path<(Uuid, i32, u8)>,
) -> Result<Json<MonthAttendanceResponse>, ApiError> {
    // Agents may only read their own ledger.
    if actor.session.role == Role::Agent && actor.session.user_id != user_id {
        return Err(ApiError::Forbidden("Unauthorized".into()));
    }
    if !(1..=12).contains(&month) {
        return Err(ApiError::BadRequest("Invalid month".into()));
    }

    let month_prefix = format!("{year:04}-{month:02}");
    let all: Vec<AttendanceRecord> = state
        .store
        .scan_as(&AttendanceRecord::user_prefix(user_id))
        .await?;
    let attendance = all
        .into_iter()
        .filter(|a| a.date.starts_with(&month_prefix))
        .collect();

    let breaks = BreakRecord::list_for(state.store.as_ref(), user_id).await?;

    let leaves = LeaveRequest::list_all(state.store.as_ref())
        .await?
        .into_iter()
        .filter(|l| l.user_id == user_id && l.status == RequestStatus::Approved)
        .collect();

    Ok(Json(MonthAttendanceResponse {
        attendance,
        breaks,
        leaves,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn no_device() -> ClockInRequest {
        ClockInRequest {
            activity: "Available".into(),
            device_name: None,
            device_type: None,
            device_os: None,
        }
    }

    #[tokio::test]
    async fn clock_in_twice_replaces_the_day_record() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;

        let sess = testutil::open_session(&state, &agent).await;
        let first = clock_in(State(state.clone()), sess, HeaderMap::new(), Json(no_device()))
            .await
            .unwrap();

        let today = date_key(OffsetDateTime::now_utc().date());
        let first_record = AttendanceRecord::for_day(state.store.as_ref(), agent.id, &today)
            .await
            .unwrap()
            .unwrap();
        let first_login = first_record.login_time.unwrap();

        let sess = testutil::open_session(&state, &agent).await;
        let second = clock_in(
            State(state.clone()),
            sess,
            HeaderMap::new(),
            Json(ClockInRequest {
                activity: "On Call".into(),
                device_name: None,
                device_type: None,
                device_os: None,
            }),
        )
        .await
        .unwrap();
        assert_ne!(first.0.attendance_id, second.0.attendance_id);

        // second clock-in wins wholesale: activity replaced, first login lost
        let record = AttendanceRecord::for_day(state.store.as_ref(), agent.id, &today)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.id, second.0.attendance_id);
        assert_eq!(record.activity, "On Call");
        assert!(record.login_time.unwrap() >= first_login);
        assert_eq!(record.status, RecordStatus::Active);
    }

    #[tokio::test]
    async fn clock_out_without_clock_in_is_not_found() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;
        let sess = testutil::open_session(&state, &agent).await;

        let err = clock_out(State(state.clone()), sess).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn full_day_lifecycle_completes_records() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;

        let sess = testutil::open_session(&state, &agent).await;
        clock_in(State(state.clone()), sess, HeaderMap::new(), Json(no_device()))
            .await
            .unwrap();

        let sess = testutil::open_session(&state, &agent).await;
        let started = start_break(
            State(state.clone()),
            sess,
            Json(StartBreakRequest {
                break_type: "Coffee Break".into(),
                activity: "Available".into(),
            }),
        )
        .await
        .unwrap();

        let sess = testutil::open_session(&state, &agent).await;
        end_break(
            State(state.clone()),
            sess,
            Json(EndBreakRequest {
                break_id: started.0.break_id,
                activity: Some("Email Support".into()),
            }),
        )
        .await
        .unwrap();

        let sess = testutil::open_session(&state, &agent).await;
        clock_out(State(state.clone()), sess).await.unwrap();

        let today = date_key(OffsetDateTime::now_utc().date());
        let record = AttendanceRecord::for_day(state.store.as_ref(), agent.id, &today)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, RecordStatus::Completed);
        assert!(record.logout_time.is_some());

        let breaks = BreakRecord::list_for(state.store.as_ref(), agent.id)
            .await
            .unwrap();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].status, RecordStatus::Completed);
        assert!(breaks[0].end_time.is_some());
        assert_eq!(breaks[0].break_type, "Coffee Break");
        assert_eq!(breaks[0].resume_activity.as_deref(), Some("Email Support"));
    }

    #[tokio::test]
    async fn ledger_allows_two_active_breaks() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;

        for break_type in ["Coffee Break", "Lunch Break"] {
            let sess = testutil::open_session(&state, &agent).await;
            start_break(
                State(state.clone()),
                sess,
                Json(StartBreakRequest {
                    break_type: break_type.into(),
                    activity: "Available".into(),
                }),
            )
            .await
            .unwrap();
        }

        // the ledger does not enforce "one active break"; both persist
        let breaks = BreakRecord::list_for(state.store.as_ref(), agent.id)
            .await
            .unwrap();
        let active = breaks
            .iter()
            .filter(|b| b.status == RecordStatus::Active)
            .count();
        assert_eq!(active, 2);
    }

    #[tokio::test]
    async fn end_break_rejects_unknown_id() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;
        let sess = testutil::open_session(&state, &agent).await;

        let err = end_break(
            State(state.clone()),
            sess,
            Json(EndBreakRequest {
                break_id: Uuid::new_v4(),
                activity: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_activity_requires_todays_record() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;

        let sess = testutil::open_session(&state, &agent).await;
        let err = update_activity(
            State(state.clone()),
            sess,
            Json(UpdateActivityRequest {
                activity: "Training".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let sess = testutil::open_session(&state, &agent).await;
        clock_in(State(state.clone()), sess, HeaderMap::new(), Json(no_device()))
            .await
            .unwrap();

        let sess = testutil::open_session(&state, &agent).await;
        update_activity(
            State(state.clone()),
            sess,
            Json(UpdateActivityRequest {
                activity: "Training".into(),
            }),
        )
        .await
        .unwrap();

        let today = date_key(OffsetDateTime::now_utc().date());
        let record = AttendanceRecord::for_day(state.store.as_ref(), agent.id, &today)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.activity, "Training");
    }

    #[tokio::test]
    async fn current_views_hydrate_ui_state() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;

        let sess = testutil::open_session(&state, &agent).await;
        let empty = current_attendance(State(state.clone()), sess, Path(agent.id))
            .await
            .unwrap();
        assert!(empty.0.attendance.is_none());

        let sess = testutil::open_session(&state, &agent).await;
        clock_in(State(state.clone()), sess, HeaderMap::new(), Json(no_device()))
            .await
            .unwrap();
        let sess = testutil::open_session(&state, &agent).await;
        let started = start_break(
            State(state.clone()),
            sess,
            Json(StartBreakRequest {
                break_type: "Coffee Break".into(),
                activity: "Available".into(),
            }),
        )
        .await
        .unwrap();

        let sess = testutil::open_session(&state, &agent).await;
        let att = current_attendance(State(state.clone()), sess, Path(agent.id))
            .await
            .unwrap();
        assert!(att.0.attendance.is_some());

        let sess = testutil::open_session(&state, &agent).await;
        let brk = current_break(State(state.clone()), sess, Path(agent.id))
            .await
            .unwrap();
        assert_eq!(brk.0.active_break.map(|b| b.id), Some(started.0.break_id));
    }

    #[tokio::test]
    async fn agents_cannot_read_another_users_month() {
        let state = testutil::state();
        let admin = testutil::insert_user(&state, "admin@example.com", Role::Admin, None).await;
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, Some(admin.id)).await;
        let other = testutil::insert_user(&state, "other@example.com", Role::Agent, Some(admin.id)).await;

        let sess = testutil::open_session(&state, &agent).await;
        let err = month_attendance(State(state.clone()), sess, Path((other.id, 2026, 8)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // admins may read any agent's month
        let sess = testutil::open_session(&state, &admin).await;
        month_attendance(State(state.clone()), sess, Path((other.id, 2026, 8)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn month_view_filters_by_month() {
        let state = testutil::state();
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, None).await;

        for date in ["2026-07-31", "2026-08-01", "2026-08-15"] {
            let record = AttendanceRecord {
                id: Uuid::new_v4(),
                user_id: agent.id,
                date: date.into(),
                login_time: None,
                logout_time: None,
                activity: "Available".into(),
                status: RecordStatus::Completed,
                device_name: "d".into(),
                device_type: "t".into(),
                device_os: "o".into(),
                ip_address: "ip".into(),
            };
            record.save(state.store.as_ref()).await.unwrap();
        }

        let sess = testutil::open_session(&state, &agent).await;
        let res = month_attendance(State(state.clone()), sess, Path((agent.id, 2026, 8)))
            .await
            .unwrap();
        let dates: Vec<_> = res.0.attendance.iter().map(|a| a.date.clone()).collect();
        assert_eq!(dates, vec!["2026-08-01", "2026-08-15"]);
    }
}
