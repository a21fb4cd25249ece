use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::{
    repo::UsersRepository,
    repo_types::{NewUser, User},
};

/// Users repository backed by a vector, ids assigned sequentially from 1.
#[derive(Default)]
pub struct InMemoryUsersRepository {
    rows: RwLock<Vec<User>>,
}

#[async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn insert(&self, new: NewUser) -> anyhow::Result<User> {
        let mut rows = self.rows.write().await;
        let id = rows.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            email: new.email,
            password: new.password,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.rows.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Vec<User>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|u| u.email == email)
            .cloned()
            .collect())
    }

    async fn save(&self, user: &User) -> anyhow::Result<Option<User>> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|u| u.id == user.id) {
            Some(row) => {
                row.email = user.email.clone();
                row.password = user.password.clone();
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() < before)
    }
}
