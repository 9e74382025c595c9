//! Comment repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{profile_url, Comment, CommentWithMeta, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Comments on a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        let now = Utc::now();
        let id = dispatch!(self.pool, |pool| {
            sqlx::query("INSERT INTO comments (post_id, author_id, text, created) VALUES (?, ?, ?, ?)")
                .bind(input.post_id)
                .bind(input.author_id)
                .bind(&input.text)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .insert_id()
        });

        Ok(Comment {
            id,
            post_id: input.post_id,
            author_id: input.author_id,
            text: input.text.clone(),
            created: now,
        })
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>> {
        let sql = r#"
            SELECT c.id, c.post_id, c.author_id, c.text, c.created,
                   u.username, u.first_name, u.last_name
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = ?
            ORDER BY c.created ASC, c.id ASC
        "#;

        dispatch!(self.pool, |pool| {
            let rows = sqlx::query(sql)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to list comments")?;

            let mut comments = Vec::with_capacity(rows.len());
            for row in &rows {
                let first: String = row.try_get("first_name")?;
                let last: String = row.try_get("last_name")?;
                let username: String = row.try_get("username")?;
                comments.push(CommentWithMeta {
                    id: row.try_get("id")?,
                    post_id: row.try_get("post_id")?,
                    author_id: row.try_get("author_id")?,
                    author_url: profile_url(&username),
                    author_username: username,
                    author_name: format!("{} {}", first, last).trim().to_string(),
                    text: row.try_get("text")?,
                    created: row.try_get::<DateTime<Utc>, _>("created")?,
                });
            }
            Ok(comments)
        })
    }
}
