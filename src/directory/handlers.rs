use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use std::collections::BTreeSet;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::extractors::CurrentSession;
use crate::auth::repo::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{
    CategoriesResponse, CreateCategoryRequest, CreateCategoryResponse, SaveScheduleRequest,
    ScheduleResponse, SchedulesResponse, SettingsResponse, SuccessResponse, TeamsResponse,
    UpdateActivitiesRequest, UpdateBreakTypesRequest, UpdateCategoryRequest, UsersResponse,
};
use super::repo::{self, Category, Schedule};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/teams", get(list_teams))
        .route("/settings", get(get_settings))
        .route("/settings/break-types", post(update_break_types))
        .route("/settings/activities", post(update_activities))
        .route(
            "/settings/schedules",
            get(list_schedules).post(create_schedule),
        )
        .route(
            "/settings/schedules/:id",
            put(update_schedule).delete(delete_schedule),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            put(update_category).delete(delete_category),
        )
}

#[instrument(skip(state, actor))]
pub async fn list_users(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<UsersResponse>, ApiError> {
    let all = User::list_all(state.store.as_ref()).await?;
    let me = actor.session.user_id;

    let visible: Vec<PublicUser> = match actor.session.role {
        Role::Superadmin => all.iter().map(PublicUser::from).collect(),
        Role::Admin => all
            .iter()
            .filter(|u| u.id == me || u.assigned_to == Some(me))
            .map(PublicUser::from)
            .collect(),
        // agents see only themselves
        Role::Agent => all
            .iter()
            .filter(|u| u.id == me)
            .map(PublicUser::from)
            .collect(),
    };

    Ok(Json(UsersResponse { users: visible }))
}

#[instrument(skip(state, _actor))]
pub async fn list_teams(
    State(state): State<AppState>,
    _actor: CurrentSession,
) -> Result<Json<TeamsResponse>, ApiError> {
    let users = User::list_all(state.store.as_ref()).await?;
    let teams: BTreeSet<String> = users.into_iter().filter_map(|u| u.team).collect();
    Ok(Json(TeamsResponse {
        teams: teams.into_iter().collect(),
    }))
}

#[instrument(skip(state, _actor))]
pub async fn get_settings(
    State(state): State<AppState>,
    _actor: CurrentSession,
) -> Result<Json<SettingsResponse>, ApiError> {
    let break_types = repo::load_list(state.store.as_ref(), repo::BREAK_TYPES_KEY).await?;
    let activities = repo::load_list(state.store.as_ref(), repo::ACTIVITIES_KEY).await?;
    Ok(Json(SettingsResponse {
        break_types,
        activities,
    }))
}

fn require_superadmin(actor: &CurrentSession) -> Result<(), ApiError> {
    if actor.session.role != Role::Superadmin {
        return Err(ApiError::unauthorized());
    }
    Ok(())
}

#[instrument(skip(state, actor, payload))]
pub async fn update_break_types(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<UpdateBreakTypesRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_superadmin(&actor)?;
    repo::store_list(state.store.as_ref(), repo::BREAK_TYPES_KEY, &payload.break_types).await?;
    info!(count = payload.break_types.len(), "break types replaced");
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_activities(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<UpdateActivitiesRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_superadmin(&actor)?;
    repo::store_list(state.store.as_ref(), repo::ACTIVITIES_KEY, &payload.activities).await?;
    info!(count = payload.activities.len(), "activities replaced");
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor))]
pub async fn list_schedules(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<SchedulesResponse>, ApiError> {
    if !actor.session.role.can_approve() {
        return Err(ApiError::unauthorized());
    }
    let schedules = Schedule::list_all(state.store.as_ref()).await?;
    Ok(Json(SchedulesResponse { schedules }))
}

#[instrument(skip(state, actor, payload))]
pub async fn create_schedule(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<SaveScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    require_superadmin(&actor)?;

    let input = payload.schedule;
    let schedule = Schedule {
        id: Uuid::new_v4(),
        name: input.name,
        start_time: input.start_time,
        end_time: input.end_time,
        break_types: input.break_types,
        activities: input.activities,
        created_at: OffsetDateTime::now_utc(),
        updated_at: None,
    };
    schedule.save(state.store.as_ref()).await?;

    info!(schedule_id = %schedule.id, name = %schedule.name, "schedule created");
    Ok(Json(ScheduleResponse { schedule }))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_schedule(
    State(state): State<AppState>,
    actor: CurrentSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaveScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    require_superadmin(&actor)?;

    let existing = Schedule::find(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule not found".into()))?;

    let input = payload.schedule;
    let schedule = Schedule {
        id,
        name: input.name,
        start_time: input.start_time,
        end_time: input.end_time,
        break_types: input.break_types,
        activities: input.activities,
        created_at: existing.created_at,
        updated_at: Some(OffsetDateTime::now_utc()),
    };
    schedule.save(state.store.as_ref()).await?;

    Ok(Json(ScheduleResponse { schedule }))
}

#[instrument(skip(state, actor))]
pub async fn delete_schedule(
    State(state): State<AppState>,
    actor: CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_superadmin(&actor)?;
    Schedule::delete(state.store.as_ref(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn superadmin_id(state: &AppState) -> Result<Option<Uuid>, ApiError> {
    let users = User::list_all(state.store.as_ref()).await?;
    Ok(users
        .into_iter()
        .find(|u| u.role == Role::Superadmin)
        .map(|u| u.id))
}

#[instrument(skip(state, actor))]
pub async fn list_categories(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let all = Category::list_all(state.store.as_ref()).await?;
    let me = actor.session.user_id;

    let categories = match actor.session.role {
        Role::Superadmin => all,
        Role::Admin => {
            let root = superadmin_id(&state).await?;
            all.into_iter()
                .filter(|c| Some(c.owner) == root || c.owner == me)
                .collect()
        }
        Role::Agent => {
            // agents see the superadmin's categories plus their admin's
            let root = superadmin_id(&state).await?;
            let assigned = User::find_by_id(state.store.as_ref(), me)
                .await?
                .and_then(|u| u.assigned_to);
            all.into_iter()
                .filter(|c| Some(c.owner) == root || Some(c.owner) == assigned)
                .collect()
        }
    };

    Ok(Json(CategoriesResponse { categories }))
}

#[instrument(skip(state, actor, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<CreateCategoryResponse>, ApiError> {
    if !actor.session.role.can_approve() {
        return Err(ApiError::Unauthorized(
            "Unauthorized - Only admins can create categories".into(),
        ));
    }

    let me = actor.session.user_id;
    let all = Category::list_all(state.store.as_ref()).await?;
    if all.iter().any(|c| c.name == payload.name && c.owner == me) {
        return Err(ApiError::Conflict("Category already exists".into()));
    }

    let category = Category {
        id: Uuid::new_v4(),
        name: payload.name,
        subcategories: payload.subcategories.unwrap_or_default(),
        owner: me,
        created_at: OffsetDateTime::now_utc(),
    };
    category.save(state.store.as_ref()).await?;

    info!(category_id = %category.id, owner = %me, "category created");
    Ok(Json(CreateCategoryResponse {
        success: true,
        category_id: category.id,
    }))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    actor: CurrentSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut category = Category::find(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;

    if category.owner != actor.session.user_id {
        return Err(ApiError::Forbidden(
            "Only the owner can update this category".into(),
        ));
    }

    if let Some(name) = payload.name {
        category.name = name;
    }
    if let Some(subcategories) = payload.subcategories {
        category.subcategories = subcategories;
    }
    category.save(state.store.as_ref()).await?;

    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor))]
pub async fn delete_category(
    State(state): State<AppState>,
    actor: CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let category = Category::find(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;

    if category.owner != actor.session.user_id {
        return Err(ApiError::Forbidden(
            "Only the owner can delete this category".into(),
        ));
    }

    Category::delete(state.store.as_ref(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}
