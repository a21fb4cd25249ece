use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        password::hash_password,
        services::{normalize_email, validate_password},
    },
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
    users::{
        dto::{FindUsersQuery, PublicUser, UpdateUserRequest},
        repo_types::UserChanges,
        services::UsersService,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", get(find_all_users))
        .route(
            "/auth/:id",
            get(find_user).patch(update_user).delete(remove_user),
        )
}

#[instrument(skip(users))]
pub async fn find_user(
    State(users): State<UsersService>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<PublicUser>, AppError> {
    let user = users
        .find_one(id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(users))]
pub async fn find_all_users(
    State(users): State<UsersService>,
    AppQuery(q): AppQuery<FindUsersQuery>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let email = q.email.trim().to_lowercase();
    let found = users.find(&email).await?;
    Ok(Json(found.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(users, payload))]
pub async fn update_user(
    State(users): State<UsersService>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let changes = into_changes(payload)?;
    let user = users.update(id, changes).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(users))]
pub async fn remove_user(
    State(users): State<UsersService>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<PublicUser>, AppError> {
    let user = users.remove(id).await?;
    Ok(Json(user.into()))
}

/// Validate the request and hash a new password so stored values stay in `salt.hash` form.
fn into_changes(payload: UpdateUserRequest) -> Result<UserChanges, AppError> {
    let email = payload.email.as_deref().map(normalize_email).transpose()?;
    let password = match payload.password {
        Some(plain) => {
            validate_password(&plain)?;
            Some(hash_password(&plain)?)
        }
        None => None,
    };
    let changes = UserChanges { email, password };
    if changes.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }
    Ok(changes)
}
