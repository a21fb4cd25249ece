use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    error::AppError,
    state::AppState,
    users::{repo_types::User, services::UsersService},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Trim and lowercase, then validate.
pub(crate) fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }
    Ok(())
}

/// Credential checks on top of [`UsersService`].
#[derive(Clone)]
pub struct AuthService {
    users: UsersService,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(UsersService::from_ref(state))
    }
}

impl AuthService {
    pub fn new(users: UsersService) -> Self {
        Self { users }
    }

    /// Register `email` unless it is already taken.
    ///
    /// The check and the insert are not atomic: two concurrent signups for the
    /// same address can both succeed.
    pub async fn signup(&self, email: &str, password: &str) -> Result<User, AppError> {
        if !self.users.find(email).await?.is_empty() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("email in use".into()));
        }
        let stored = hash_password(password)?;
        let user = self.users.create(email, &stored).await?;
        info!(user_id = user.id, "user signed up");
        Ok(user)
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.users.find(email).await?.into_iter().next() else {
            warn!(email = %email, "signin unknown email");
            return Err(AppError::not_found("user not found"));
        };
        if !verify_password(password, &user.password)? {
            warn!(user_id = user.id, "signin invalid password");
            return Err(AppError::InvalidCredentials);
        }
        info!(user_id = user.id, "user signed in");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::InMemoryUsersRepository;
    use crate::users::repo::UsersRepository;
    use crate::users::repo_types::NewUser;

    fn setup() -> (AuthService, Arc<InMemoryUsersRepository>) {
        let repo = Arc::new(InMemoryUsersRepository::default());
        let auth = AuthService::new(UsersService::new(repo.clone()));
        (auth, repo)
    }

    #[tokio::test]
    async fn signup_stores_salted_and_hashed_password() {
        let (auth, _) = setup();
        let user = auth.signup("asdf@asdf.com", "asdf").await.unwrap();

        assert_ne!(user.password, "asdf");
        assert_eq!(user.password.matches('.').count(), 1);
        let (salt, hash) = user.password.split_once('.').unwrap();
        assert!(!salt.is_empty());
        assert!(!hash.is_empty());
    }

    #[tokio::test]
    async fn signup_with_taken_email_is_conflict() {
        let (auth, repo) = setup();
        repo.insert(NewUser {
            email: "test@email.com".into(),
            password: "pass".into(),
        })
        .await
        .unwrap();

        let err = auth.signup("test@email.com", "pass").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn signin_with_unknown_email_is_not_found() {
        let (auth, _) = setup();
        let err = auth.signin("dawdwd@dwadw.wad", "dsad").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn signin_with_wrong_password_is_invalid_credentials() {
        let (auth, _) = setup();
        auth.signup("vcxv@vxcv.xcv", "right").await.unwrap();
        let err = auth.signin("vcxv@vxcv.xcv", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn signin_against_unsalted_record_is_invalid_credentials() {
        let (auth, repo) = setup();
        repo.insert(NewUser {
            email: "dasd@dadwd.daw".into(),
            password: "dsada".into(),
        })
        .await
        .unwrap();
        let err = auth.signin("dasd@dadwd.daw", "dsada").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn signin_with_correct_password_returns_user() {
        let (auth, _) = setup();
        let created = auth.signup("test@email.com", "pass").await.unwrap();
        let user = auth.signin("test@email.com", "pass").await.unwrap();
        assert_eq!(user.id, created.id);
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  A@B.Com ").unwrap(), "a@b.com");
        assert!(matches!(normalize_email("nope"), Err(AppError::Validation(_))));
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(validate_password("").is_err());
        assert!(validate_password("x").is_ok());
    }
}
