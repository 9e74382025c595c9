//! Session repository

use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        dispatch!(self.pool, |pool| {
            sqlx::query(
                "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(pool)
            .await
            .context("Failed to create session")?;
        });
        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        dispatch!(self.pool, |pool| {
            let row = sqlx::query(
                "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get session")?;
            match row {
                Some(row) => Ok(Some(Session {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
                    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                })),
                None => Ok(None),
            }
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        dispatch!(self.pool, |pool| {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete session")?;
        });
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let removed = dispatch!(self.pool, |pool| {
            sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected()
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};
    use chrono::Duration;

    fn session(id: &str, user_id: i64, expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            user_id,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete_session() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "leo").await;
        let repo = SqlxSessionRepository::new(pool);

        repo.create(&session("abc", user.id, Duration::days(1)))
            .await
            .unwrap();
        let found = repo.get_by_id("abc").await.unwrap().expect("session");
        assert_eq!(found.user_id, user.id);
        assert!(!found.is_expired());

        repo.delete("abc").await.unwrap();
        assert!(repo.get_by_id("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "leo").await;
        let repo = SqlxSessionRepository::new(pool);

        repo.create(&session("old", user.id, Duration::hours(-1)))
            .await
            .unwrap();
        repo.create(&session("fresh", user.id, Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id("old").await.unwrap().is_none());
        assert!(repo.get_by_id("fresh").await.unwrap().is_some());
    }
}
