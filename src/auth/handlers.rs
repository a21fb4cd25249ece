use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::CredentialsRequest,
        extractors::CurrentUser,
        services::{normalize_email, validate_password, AuthService},
    },
    error::AppError,
    extract::AppJson,
    session::{SessionContext, SessionCookie},
    state::AppState,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/whoami", get(whoami))
}

#[instrument(skip(auth, session, payload))]
pub async fn signup(
    State(auth): State<AuthService>,
    mut session: SessionContext,
    AppJson(payload): AppJson<CredentialsRequest>,
) -> Result<(SessionCookie, Json<PublicUser>), AppError> {
    let email = normalize_email(&payload.email)?;
    validate_password(&payload.password)?;

    let user = auth.signup(&email, &payload.password).await?;
    let cookie = session.persist_user(user.id).await?;
    Ok((cookie, Json(user.into())))
}

#[instrument(skip(auth, session, payload))]
pub async fn signin(
    State(auth): State<AuthService>,
    mut session: SessionContext,
    AppJson(payload): AppJson<CredentialsRequest>,
) -> Result<(SessionCookie, Json<PublicUser>), AppError> {
    let email = normalize_email(&payload.email)?;

    let user = auth.signin(&email, &payload.password).await?;
    let cookie = session.persist_user(user.id).await?;
    Ok((cookie, Json(user.into())))
}

#[instrument(skip(session))]
pub async fn signout(mut session: SessionContext) -> Result<(SessionCookie, StatusCode), AppError> {
    let user_id = session.user_id();
    let cookie = session.clear().await?;
    if let Some(user_id) = user_id {
        info!(user_id, "user signed out");
    }
    Ok((cookie, StatusCode::OK))
}

#[instrument(skip_all)]
pub async fn whoami(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}
