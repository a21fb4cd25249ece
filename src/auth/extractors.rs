use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    error::AppError,
    session::SessionContext,
    state::AppState,
    users::{repo_types::User, services::UsersService},
};

/// The user bound to the caller's session. Rejects with 401 when there is none.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionContext::from_request_parts(parts, state).await?;
        let user_id = session.require_user_id()?;

        match UsersService::from_ref(state).find_one(user_id).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                warn!(user_id, "session refers to a missing user");
                Err(AppError::Unauthenticated)
            }
        }
    }
}
