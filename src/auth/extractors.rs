use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use super::repo::Session;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves `Authorization: Bearer <sessionId>` into the stored session.
/// Every protected endpoint goes through this; a missing or unknown token
/// is a 401 before the handler runs.
pub struct CurrentSession {
    pub id: String,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("invalid auth scheme".into()))?;

        let session = Session::load(state.store.as_ref(), token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(CurrentSession {
            id: token.to_string(),
            session,
        })
    }
}
