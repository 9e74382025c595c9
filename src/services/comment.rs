//! Comment service

use crate::db::repositories::CommentRepository;
use crate::models::{Comment, CommentWithMeta, CreateCommentInput, User};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// Attach a comment by `author` to an existing post.
    pub async fn add(
        &self,
        post_id: i64,
        author: &User,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment text cannot be empty".to_string(),
            ));
        }

        let comment = self
            .repo
            .create(&CreateCommentInput {
                post_id,
                author_id: author.id,
                text: text.to_string(),
            })
            .await
            .context("Failed to create comment")?;

        tracing::info!(post_id, comment_id = comment.id, author = %author.username, "Comment added");
        Ok(comment)
    }

    /// Comments on a post, oldest first.
    pub async fn list(&self, post_id: i64) -> Result<Vec<CommentWithMeta>, CommentServiceError> {
        Ok(self
            .repo
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_post, insert_user, setup_pool};
    use crate::db::repositories::SqlxCommentRepository;

    #[tokio::test]
    async fn test_add_and_list() {
        let pool = setup_pool().await;
        let service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()));
        let author = insert_user(&pool, "leo").await;
        let reader = insert_user(&pool, "reader").await;
        let post = insert_post(&pool, author.id, "post", None).await;

        service.add(post.id, &reader, "  nice post ").await.unwrap();
        service.add(post.id, &author, "thanks").await.unwrap();

        let comments = service.list(post.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "nice post");
        assert_eq!(comments[0].author_username, "reader");
        assert_eq!(comments[1].author_username, "leo");
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let pool = setup_pool().await;
        let service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()));
        let author = insert_user(&pool, "leo").await;
        let post = insert_post(&pool, author.id, "post", None).await;

        let result = service.add(post.id, &author, "\n  ").await;
        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
        assert!(service.list(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_fails() {
        let pool = setup_pool().await;
        let service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()));
        let author = insert_user(&pool, "leo").await;

        let result = service.add(4242, &author, "hello").await;
        assert!(matches!(result, Err(CommentServiceError::InternalError(_))));
    }
}
