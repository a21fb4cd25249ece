use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{debug, info};

use crate::{
    error::AppError,
    state::AppState,
    users::{
        repo::UsersRepository,
        repo_types::{NewUser, User, UserChanges},
    },
};

/// Business operations on user records. Thin layer over the repository.
#[derive(Clone)]
pub struct UsersService {
    repo: Arc<dyn UsersRepository>,
}

impl FromRef<AppState> for UsersService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone())
    }
}

impl UsersService {
    pub fn new(repo: Arc<dyn UsersRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .repo
            .insert(NewUser {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub async fn find_one(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn find(&self, email: &str) -> Result<Vec<User>, AppError> {
        let users = self.repo.find_by_email(email).await?;
        debug!(count = users.len(), "users found by email");
        Ok(users)
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User, AppError> {
        let mut user = self
            .find_one(id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;
        user.apply(changes);
        // The row may vanish between the read and the write.
        let saved = self
            .repo
            .save(&user)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;
        info!(user_id = id, "user updated");
        Ok(saved)
    }

    pub async fn remove(&self, id: i64) -> Result<User, AppError> {
        let user = self
            .find_one(id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("user not found"));
        }
        info!(user_id = id, "user removed");
        Ok(user)
    }
}
