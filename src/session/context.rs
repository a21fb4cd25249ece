use std::{convert::Infallible, sync::Arc};

use anyhow::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    response::{IntoResponseParts, ResponseParts},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::AppError,
    session::store::{SessionData, SessionStore},
    state::AppState,
};

/// Request-scoped view of the caller's session.
///
/// Handlers read the identity from it and change it through
/// [`SessionContext::persist_user`] / [`SessionContext::clear`], returning the
/// produced [`SessionCookie`] with the response.
pub struct SessionContext {
    token: Option<Uuid>,
    data: SessionData,
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
}

impl SessionContext {
    pub fn new(
        token: Option<Uuid>,
        data: SessionData,
        store: Arc<dyn SessionStore>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            token,
            data,
            store,
            config,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.data.user_id
    }

    pub fn require_user_id(&self) -> Result<i64, AppError> {
        self.user_id().ok_or(AppError::Unauthenticated)
    }

    /// Bind the session to `user_id`. The token is rotated on every identity change.
    pub async fn persist_user(&mut self, user_id: i64) -> Result<SessionCookie, AppError> {
        if let Some(old) = self.token.take() {
            self.store.delete(old).await?;
        }
        let token = Uuid::new_v4();
        self.data.user_id = Some(user_id);
        self.store.save(token, &self.data).await?;
        self.token = Some(token);
        debug!(user_id, "session identity set");
        SessionCookie::issue(&self.config, token)
    }

    /// Drop the identity and the server-side session.
    pub async fn clear(&mut self) -> Result<SessionCookie, AppError> {
        self.data = SessionData::default();
        if let Some(token) = self.token.take() {
            self.store.delete(token).await?;
        }
        SessionCookie::expire(&self.config)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let config = state.session_config.clone();
        let store = state.sessions.clone();

        let token = match read_cookie(&parts.headers, &config.cookie_name) {
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(t) => Some(t),
                Err(_) => {
                    warn!("malformed session cookie ignored");
                    None
                }
            },
            None => None,
        };

        let (token, data) = match token {
            Some(t) => match store.load(t).await? {
                Some(data) => (Some(t), data),
                // Unknown or expired: start over.
                None => (None, SessionData::default()),
            },
            None => (None, SessionData::default()),
        };

        Ok(Self::new(token, data, store, config))
    }
}

/// `Set-Cookie` header carrying the session token.
#[derive(Debug, Clone)]
pub struct SessionCookie(HeaderValue);

impl SessionCookie {
    fn issue(config: &SessionConfig, token: Uuid) -> Result<Self, AppError> {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            config.cookie_name,
            token,
            config.ttl_minutes.saturating_mul(60)
        );
        if config.secure {
            cookie.push_str("; Secure");
        }
        Self::from_string(cookie)
    }

    fn expire(config: &SessionConfig) -> Result<Self, AppError> {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            config.cookie_name
        );
        if config.secure {
            cookie.push_str("; Secure");
        }
        Self::from_string(cookie)
    }

    fn from_string(cookie: String) -> Result<Self, AppError> {
        let value = HeaderValue::from_str(&cookie).context("build session cookie")?;
        Ok(Self(value))
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.0
    }
}

impl IntoResponseParts for SessionCookie {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.headers_mut().append(SET_COOKIE, self.0);
        Ok(res)
    }
}

/// Value of cookie `name` across all `Cookie` headers.
fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}
