//! Shared helpers for handler tests: an in-memory state plus quick user and
//! session fixtures.

use uuid::Uuid;

use crate::auth::extractors::CurrentSession;
use crate::auth::repo::{Role, Session, User};
use crate::auth::services::{hash_password, new_session_id};
use crate::state::AppState;

pub fn state() -> AppState {
    AppState::fake()
}

/// Inserts a user whose password is always `password123`.
pub async fn insert_user(
    state: &AppState,
    email: &str,
    role: Role,
    assigned_to: Option<Uuid>,
) -> User {
    let name = email
        .split('@')
        .next()
        .unwrap_or("user")
        .to_string();
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_lowercase(),
        password_hash: hash_password("password123").expect("hash"),
        role,
        name,
        team: None,
        assigned_to,
    };
    user.save(state.store.as_ref()).await.expect("save user");
    user
}

pub async fn open_session(state: &AppState, user: &User) -> CurrentSession {
    let id = new_session_id();
    let session = Session::for_user(user);
    session
        .save(state.store.as_ref(), &id)
        .await
        .expect("save session");
    CurrentSession { id, session }
}
