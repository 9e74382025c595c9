//! Follow repository

use crate::db::DynDatabasePool;
use crate::config::DatabaseDriver;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Record that `user_id` follows `author_id`. Returns false if it already did.
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Returns false if there was nothing to remove.
    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Number of users following `author_id`
    async fn count_followers(&self, author_id: i64) -> Result<i64>;

    /// Number of authors `user_id` follows
    async fn count_following(&self, user_id: i64) -> Result<i64>;
}

pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }

    async fn count_where(&self, column: &str, id: i64) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS total FROM follows WHERE {column} = ?");
        dispatch!(self.pool, |pool| {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_one(pool)
                .await
                .context("Failed to count follows")?;
            Ok(row.try_get("total")?)
        })
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        // The unique (user_id, author_id) index turns a repeat into a no-op.
        let sql = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                "INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?, ?)"
            }
            DatabaseDriver::Mysql => "INSERT IGNORE INTO follows (user_id, author_id) VALUES (?, ?)",
        };
        let inserted = dispatch!(self.pool, |pool| {
            sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .execute(pool)
                .await
                .context("Failed to follow author")?
                .rows_affected()
        });
        Ok(inserted > 0)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let removed = dispatch!(self.pool, |pool| {
            sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
                .bind(user_id)
                .bind(author_id)
                .execute(pool)
                .await
                .context("Failed to unfollow author")?
                .rows_affected()
        });
        Ok(removed > 0)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let total: i64 = dispatch!(self.pool, |pool| {
            sqlx::query(
                "SELECT COUNT(*) AS total FROM follows WHERE user_id = ? AND author_id = ?",
            )
            .bind(user_id)
            .bind(author_id)
            .fetch_one(pool)
            .await
            .context("Failed to check follow")?
            .try_get("total")?
        });
        Ok(total > 0)
    }

    async fn count_followers(&self, author_id: i64) -> Result<i64> {
        self.count_where("author_id", author_id).await
    }

    async fn count_following(&self, user_id: i64) -> Result<i64> {
        self.count_where("user_id", user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let pool = setup_pool().await;
        let reader = insert_user(&pool, "reader").await;
        let writer = insert_user(&pool, "writer").await;
        let repo = SqlxFollowRepository::new(pool);

        assert!(!repo.is_following(reader.id, writer.id).await.unwrap());
        assert!(repo.follow(reader.id, writer.id).await.unwrap());
        assert!(!repo.follow(reader.id, writer.id).await.unwrap());
        assert!(repo.is_following(reader.id, writer.id).await.unwrap());
        assert_eq!(repo.count_followers(writer.id).await.unwrap(), 1);
        assert_eq!(repo.count_following(reader.id).await.unwrap(), 1);
        assert!(!repo.is_following(writer.id, reader.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unfollow() {
        let pool = setup_pool().await;
        let reader = insert_user(&pool, "reader").await;
        let writer = insert_user(&pool, "writer").await;
        let repo = SqlxFollowRepository::new(pool);

        assert!(!repo.unfollow(reader.id, writer.id).await.unwrap());
        repo.follow(reader.id, writer.id).await.unwrap();
        assert!(repo.unfollow(reader.id, writer.id).await.unwrap());
        assert!(!repo.is_following(reader.id, writer.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_follows_removed_with_user() {
        let pool = setup_pool().await;
        let reader = insert_user(&pool, "reader").await;
        let writer = insert_user(&pool, "writer").await;
        let repo = SqlxFollowRepository::new(pool.clone());
        repo.follow(reader.id, writer.id).await.unwrap();

        pool.execute(&format!("DELETE FROM users WHERE id = {}", writer.id))
            .await
            .unwrap();
        assert_eq!(repo.count_following(reader.id).await.unwrap(), 0);
    }
}
