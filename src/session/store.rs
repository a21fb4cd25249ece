use std::collections::HashMap;

use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Server-held state for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Option<i64>,
}

fn expiry_from_now(ttl: Duration) -> anyhow::Result<OffsetDateTime> {
    OffsetDateTime::now_utc()
        .checked_add(ttl)
        .ok_or_else(|| anyhow::anyhow!("session ttl out of range: {ttl}"))
}

/// Key-value store for sessions keyed by an opaque token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Expired sessions load as `None`.
    async fn load(&self, token: Uuid) -> anyhow::Result<Option<SessionData>>;
    /// Insert or overwrite, pushing the expiry forward by the store's TTL.
    async fn save(&self, token: Uuid, data: &SessionData) -> anyhow::Result<()>;
    async fn delete(&self, token: Uuid) -> anyhow::Result<()>;
    /// Returns the number of sessions removed.
    async fn delete_expired(&self) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    pub fn new(db: PgPool, ttl: Duration) -> Self {
        Self { db, ttl }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, token: Uuid) -> anyhow::Result<Option<SessionData>> {
        let row: Option<(Option<i64>,)> = sqlx::query_as(
            r#"
            SELECT user_id
              FROM sessions
             WHERE token = $1 AND expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .context("load session")?;
        Ok(row.map(|(user_id,)| SessionData { user_id }))
    }

    async fn save(&self, token: Uuid, data: &SessionData) -> anyhow::Result<()> {
        let expires_at = expiry_from_now(self.ttl)?;
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token)
            DO UPDATE SET user_id = EXCLUDED.user_id, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(token)
        .bind(data.user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("save session")?;
        Ok(())
    }

    async fn delete(&self, token: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(())
    }

    async fn delete_expired(&self) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.db)
            .await
            .context("delete expired sessions")?;
        Ok(res.rows_affected())
    }
}

/// Process-local store. Sessions do not survive a restart.
pub struct MemorySessionStore {
    entries: RwLock<HashMap<Uuid, (SessionData, OffsetDateTime)>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: Uuid) -> anyhow::Result<Option<SessionData>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .entries
            .read()
            .await
            .get(&token)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(data, _)| data.clone()))
    }

    async fn save(&self, token: Uuid, data: &SessionData) -> anyhow::Result<()> {
        let expires_at = expiry_from_now(self.ttl)?;
        self.entries
            .write()
            .await
            .insert(token, (data.clone(), expires_at));
        Ok(())
    }

    async fn delete(&self, token: Uuid) -> anyhow::Result<()> {
        self.entries.write().await.remove(&token);
        Ok(())
    }

    async fn delete_expired(&self) -> anyhow::Result<u64> {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}
