use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;

use crate::users::repo_types::{NewUser, User};

/// Generic persistence for user records.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn insert(&self, new: NewUser) -> anyhow::Result<User>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Vec<User>>;
    /// Write every mutable field of `user` back. Returns `None` if the row is gone.
    async fn save(&self, user: &User) -> anyhow::Result<Option<User>>;
    /// Returns `false` if nothing was deleted.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUsersRepository {
    db: PgPool,
}

impl PgUsersRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn insert(&self, new: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password)
            VALUES ($1, $2)
            RETURNING id, email, password, created_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.password)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password, created_at
            FROM users
            WHERE email = $1
            ORDER BY id
            "#,
        )
        .bind(email)
        .fetch_all(&self.db)
        .await
        .context("find users by email")?;
        Ok(users)
    }

    async fn save(&self, user: &User) -> anyhow::Result<Option<User>> {
        let saved = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET email = $2, password = $3
             WHERE id = $1
            RETURNING id, email, password, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_optional(&self.db)
        .await
        .context("update user")?;
        Ok(saved)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}
