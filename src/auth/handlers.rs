use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{
    CreateUserRequest, CreateUserResponse, ImpersonateRequest, LoginRequest, LogoutRequest,
    PublicUser, RegisterRequest, RegisterResponse, ResetPasswordRequest, SessionResponse,
    SuccessResponse,
};
use super::extractors::CurrentSession;
use super::repo::{Role, Session, User};
use super::services::{hash_password, is_valid_email, new_session_id, verify_password};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout-session", post(logout_session))
        .route("/create-user", post(create_user))
        .route("/reset-password", post(reset_password))
        .route("/impersonate", post(impersonate))
        .route("/exit-impersonation", post(exit_impersonation))
}

const MIN_PASSWORD_LEN: usize = 8;

// Unknown email and wrong password must be indistinguishable to the caller.
fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".into())
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(state.store.as_ref(), &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            invalid_credentials()
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let session_id = new_session_id();
    Session::for_user(&user)
        .save(state.store.as_ref(), &session_id)
        .await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(SessionResponse {
        session_id,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }

    if User::find_by_email(state.store.as_ref(), &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    // Self-registration is always an unassigned agent.
    let user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        password_hash: hash_password(&payload.password)?,
        role: Role::Agent,
        name: payload.name.trim().to_string(),
        team: None,
        assigned_to: None,
    };
    user.save(state.store.as_ref()).await?;

    let session_id = new_session_id();
    Session::for_user(&user)
        .save(state.store.as_ref(), &session_id)
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(RegisterResponse {
        success: true,
        session_id,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn logout_session(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    Session::delete(state.store.as_ref(), &payload.session_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    match actor.session.role {
        Role::Agent => {
            return Err(ApiError::Forbidden("Agents cannot create users".into()));
        }
        Role::Admin if payload.role != Role::Agent => {
            return Err(ApiError::Forbidden("Admins can only create agents".into()));
        }
        Role::Superadmin if payload.role == Role::Superadmin => {
            return Err(ApiError::Forbidden(
                "Cannot create another super admin".into(),
            ));
        }
        _ => {}
    }

    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    if User::find_by_email(state.store.as_ref(), &payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    // Agents route their requests through the owning admin.
    let assigned_to = match payload.role {
        Role::Agent => Some(payload.assigned_to.ok_or_else(|| {
            ApiError::BadRequest("assignedTo is required for agents".into())
        })?),
        _ => None,
    };

    let user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        password_hash: hash_password(&payload.password)?,
        role: payload.role,
        name: payload.name,
        team: payload.team,
        assigned_to,
    };
    user.save(state.store.as_ref()).await?;

    info!(
        user_id = %user.id,
        role = ?user.role,
        created_by = %actor.session.user_id,
        "user created"
    );
    Ok(Json(CreateUserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, actor, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if actor.session.role != Role::Superadmin {
        return Err(ApiError::unauthorized());
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let mut user = User::find_by_id(state.store.as_ref(), payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    user.password_hash = hash_password(&payload.new_password)?;
    user.save(state.store.as_ref()).await?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, actor, payload))]
pub async fn impersonate(
    State(state): State<AppState>,
    actor: CurrentSession,
    Json(payload): Json<ImpersonateRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if actor.session.role != Role::Superadmin {
        return Err(ApiError::Unauthorized(
            "Unauthorized - Only super admin can impersonate".into(),
        ));
    }

    let target = User::find_by_id(state.store.as_ref(), payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // A fresh session for the target; the superadmin's own session is untouched.
    let session_id = new_session_id();
    let session = Session {
        is_impersonating: true,
        original_session_id: Some(actor.id.clone()),
        original_user_id: Some(actor.session.user_id),
        ..Session::for_user(&target)
    };
    session.save(state.store.as_ref(), &session_id).await?;

    info!(target = %target.id, by = %actor.session.user_id, "impersonation started");
    let mut user = PublicUser::from(&target);
    user.is_impersonating = true;
    Ok(Json(SessionResponse { session_id, user }))
}

#[instrument(skip(state, actor))]
pub async fn exit_impersonation(
    State(state): State<AppState>,
    actor: CurrentSession,
) -> Result<Json<SessionResponse>, ApiError> {
    if !actor.session.is_impersonating {
        return Err(ApiError::BadRequest("Not impersonating".into()));
    }
    let original_session_id = actor
        .session
        .original_session_id
        .clone()
        .ok_or_else(|| ApiError::BadRequest("Not impersonating".into()))?;

    let original_session = Session::load(state.store.as_ref(), &original_session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Original session not found".into()))?;

    let original_user = User::find_by_id(state.store.as_ref(), original_session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // Delete last: a failed lookup above must leave the caller's session usable.
    Session::delete(state.store.as_ref(), &actor.id).await?;

    info!(user_id = %original_user.id, "impersonation ended");
    Ok(Json(SessionResponse {
        session_id: original_session_id,
        user: PublicUser::from(&original_user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvStore;
    use crate::testutil;

    #[tokio::test]
    async fn register_then_login_succeeds_with_agent_role() {
        let state = testutil::state();

        let res = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "New.Agent@Example.com".into(),
                password: "longenough".into(),
                name: "New Agent".into(),
            }),
        )
        .await
        .unwrap();
        assert!(res.0.success);
        assert_eq!(res.0.user.role, Role::Agent);
        assert_eq!(res.0.user.email, "new.agent@example.com");

        let login_res = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "new.agent@example.com".into(),
                password: "longenough".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(login_res.0.user.role, Role::Agent);

        let session = Session::load(state.store.as_ref(), &login_res.0.session_id)
            .await
            .unwrap()
            .expect("session persisted");
        assert_eq!(session.email, "new.agent@example.com");
    }

    #[tokio::test]
    async fn login_errors_do_not_leak_which_part_was_wrong() {
        let state = testutil::state();
        testutil::insert_user(&state, "known@example.com", Role::Agent, None).await;

        let unknown = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "nobody@example.com".into(),
                password: "password123".into(),
            }),
        )
        .await
        .unwrap_err();
        let wrong_password = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "known@example.com".into(),
                password: "not-the-password".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(unknown.status(), wrong_password.status());
        assert_eq!(unknown.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_weak_input() {
        let state = testutil::state();
        testutil::insert_user(&state, "taken@example.com", Role::Agent, None).await;

        let dup = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "taken@example.com".into(),
                password: "longenough".into(),
                name: "Dup".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(dup, ApiError::Conflict(_)));

        let short = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "ok@example.com".into(),
                password: "short".into(),
                name: "Ok".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(short, ApiError::BadRequest(_)));

        let bad_email = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "not-an-email".into(),
                password: "longenough".into(),
                name: "Bad".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(bad_email, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn create_user_role_matrix() {
        let state = testutil::state();
        let superadmin = testutil::insert_user(&state, "root@example.com", Role::Superadmin, None).await;
        let admin = testutil::insert_user(&state, "admin@example.com", Role::Admin, None).await;
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, Some(admin.id)).await;

        let root_sess = testutil::open_session(&state, &superadmin).await;
        let admin_sess = testutil::open_session(&state, &admin).await;
        let agent_sess = testutil::open_session(&state, &agent).await;

        let payload = |email: &str, role: Role, assigned_to: Option<Uuid>| CreateUserRequest {
            email: email.into(),
            password: "longenough".into(),
            role,
            name: "X".into(),
            assigned_to,
            team: None,
        };

        // agent: always forbidden
        let err = create_user(
            State(state.clone()),
            agent_sess,
            Json(payload("a1@example.com", Role::Agent, Some(admin.id))),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // admin creating an admin: forbidden
        let admin_sess2 = testutil::open_session(&state, &admin).await;
        let err = create_user(
            State(state.clone()),
            admin_sess,
            Json(payload("a2@example.com", Role::Admin, None)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // admin creating an agent: allowed
        let res = create_user(
            State(state.clone()),
            admin_sess2,
            Json(payload("a3@example.com", Role::Agent, Some(admin.id))),
        )
        .await
        .unwrap();
        assert_eq!(res.0.user.assigned_to, Some(admin.id));

        // superadmin creating an admin: allowed, assignedTo stays null
        let res = create_user(
            State(state.clone()),
            root_sess,
            Json(payload("a4@example.com", Role::Admin, Some(admin.id))),
        )
        .await
        .unwrap();
        assert_eq!(res.0.user.assigned_to, None);

        // superadmin creating a superadmin: forbidden
        let root_sess2 = testutil::open_session(&state, &superadmin).await;
        let err = create_user(
            State(state.clone()),
            root_sess2,
            Json(payload("a5@example.com", Role::Superadmin, None)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // duplicate email: conflict
        let root_sess3 = testutil::open_session(&state, &superadmin).await;
        let err = create_user(
            State(state.clone()),
            root_sess3,
            Json(payload("agent@example.com", Role::Agent, Some(admin.id))),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // agent without assignedTo: rejected
        let root_sess4 = testutil::open_session(&state, &superadmin).await;
        let err = create_user(
            State(state.clone()),
            root_sess4,
            Json(payload("a6@example.com", Role::Agent, None)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn reset_password_is_superadmin_only() {
        let state = testutil::state();
        let superadmin = testutil::insert_user(&state, "root@example.com", Role::Superadmin, None).await;
        let admin = testutil::insert_user(&state, "admin@example.com", Role::Admin, None).await;
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, Some(admin.id)).await;

        let admin_sess = testutil::open_session(&state, &admin).await;
        let err = reset_password(
            State(state.clone()),
            admin_sess,
            Json(ResetPasswordRequest {
                user_id: agent.id,
                new_password: "newpassword".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let root_sess = testutil::open_session(&state, &superadmin).await;
        reset_password(
            State(state.clone()),
            root_sess,
            Json(ResetPasswordRequest {
                user_id: agent.id,
                new_password: "newpassword".into(),
            }),
        )
        .await
        .unwrap();

        // old password no longer works, new one does
        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "agent@example.com".into(),
                password: "password123".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        login(
            State(state.clone()),
            Json(LoginRequest {
                email: "agent@example.com".into(),
                password: "newpassword".into(),
            }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn impersonation_round_trip_keeps_original_session_valid() {
        let state = testutil::state();
        let superadmin = testutil::insert_user(&state, "root@example.com", Role::Superadmin, None).await;
        let admin = testutil::insert_user(&state, "admin@example.com", Role::Admin, None).await;
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, Some(admin.id)).await;

        let root_sess = testutil::open_session(&state, &superadmin).await;
        let root_sid = root_sess.id.clone();

        let res = impersonate(
            State(state.clone()),
            root_sess,
            Json(ImpersonateRequest { user_id: agent.id }),
        )
        .await
        .unwrap();
        assert!(res.0.user.is_impersonating);
        assert_eq!(res.0.user.id, agent.id);

        let imp_session = Session::load(state.store.as_ref(), &res.0.session_id)
            .await
            .unwrap()
            .expect("impersonation session stored");
        assert!(imp_session.is_impersonating);
        assert_eq!(imp_session.original_session_id.as_deref(), Some(root_sid.as_str()));
        assert_eq!(imp_session.original_user_id, Some(superadmin.id));

        // original session still resolves
        assert!(Session::load(state.store.as_ref(), &root_sid)
            .await
            .unwrap()
            .is_some());

        let exit = exit_impersonation(
            State(state.clone()),
            CurrentSession {
                id: res.0.session_id.clone(),
                session: imp_session,
            },
        )
        .await
        .unwrap();
        assert_eq!(exit.0.session_id, root_sid);
        assert_eq!(exit.0.user.id, superadmin.id);

        // impersonation session is gone, original survives
        assert!(Session::load(state.store.as_ref(), &res.0.session_id)
            .await
            .unwrap()
            .is_none());
        assert!(Session::load(state.store.as_ref(), &root_sid)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn exit_impersonation_requires_an_impersonation_session() {
        let state = testutil::state();
        let superadmin = testutil::insert_user(&state, "root@example.com", Role::Superadmin, None).await;
        let sess = testutil::open_session(&state, &superadmin).await;

        let err = exit_impersonation(State(state.clone()), sess).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn exit_impersonation_reports_missing_original_session() {
        let state = testutil::state();
        let superadmin = testutil::insert_user(&state, "root@example.com", Role::Superadmin, None).await;
        let admin = testutil::insert_user(&state, "admin@example.com", Role::Admin, None).await;
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, Some(admin.id)).await;

        let root_sess = testutil::open_session(&state, &superadmin).await;
        let root_sid = root_sess.id.clone();
        let res = impersonate(
            State(state.clone()),
            root_sess,
            Json(ImpersonateRequest { user_id: agent.id }),
        )
        .await
        .unwrap();

        // original session logged out behind our back
        Session::delete(state.store.as_ref(), &root_sid).await.unwrap();

        let imp_session = Session::load(state.store.as_ref(), &res.0.session_id)
            .await
            .unwrap()
            .unwrap();
        let err = exit_impersonation(
            State(state.clone()),
            CurrentSession {
                id: res.0.session_id,
                session: imp_session,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_exit_impersonation_keeps_the_session_usable() {
        let state = testutil::state();
        let superadmin = testutil::insert_user(&state, "root@example.com", Role::Superadmin, None).await;
        let admin = testutil::insert_user(&state, "admin@example.com", Role::Admin, None).await;
        let agent = testutil::insert_user(&state, "agent@example.com", Role::Agent, Some(admin.id)).await;

        let root_sess = testutil::open_session(&state, &superadmin).await;
        let res = impersonate(
            State(state.clone()),
            root_sess,
            Json(ImpersonateRequest { user_id: agent.id }),
        )
        .await
        .unwrap();

        // the superadmin's user record vanishes while impersonating
        state
            .store
            .delete(&User::key(superadmin.id))
            .await
            .unwrap();

        let imp_session = Session::load(state.store.as_ref(), &res.0.session_id)
            .await
            .unwrap()
            .unwrap();
        let err = exit_impersonation(
            State(state.clone()),
            CurrentSession {
                id: res.0.session_id.clone(),
                session: imp_session,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // the failed exit must not strand the caller without any session
        assert!(Session::load(state.store.as_ref(), &res.0.session_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn logout_deletes_the_session() {
        let state = testutil::state();
        let admin = testutil::insert_user(&state, "admin@example.com", Role::Admin, None).await;
        let sess = testutil::open_session(&state, &admin).await;
        let sid = sess.id.clone();

        logout_session(
            State(state.clone()),
            Json(LogoutRequest { session_id: sid.clone() }),
        )
        .await
        .unwrap();
        assert!(Session::load(state.store.as_ref(), &sid)
            .await
            .unwrap()
            .is_none());
    }
}
