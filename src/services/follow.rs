//! Follow service
//!
//! Subscriptions between users. Both directions are idempotent and a
//! user cannot follow themselves.

use crate::db::repositories::{FollowRepository, UserRepository};
use crate::models::User;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FollowServiceError {
    #[error("User not found: {0}")]
    AuthorNotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct FollowService {
    follow_repo: Arc<dyn FollowRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl FollowService {
    pub fn new(follow_repo: Arc<dyn FollowRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            follow_repo,
            user_repo,
        }
    }

    async fn author(&self, username: &str) -> Result<User, FollowServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| FollowServiceError::AuthorNotFound(username.to_string()))
    }

    /// Returns whether a new subscription was recorded.
    pub async fn follow(&self, user: &User, author_username: &str) -> Result<bool, FollowServiceError> {
        let author = self.author(author_username).await?;
        if author.id == user.id {
            return Ok(false);
        }

        let created = self
            .follow_repo
            .follow(user.id, author.id)
            .await
            .context("Failed to follow author")?;
        if created {
            tracing::info!(user = %user.username, author = %author.username, "Followed");
        }
        Ok(created)
    }

    /// Returns whether a subscription existed and was removed.
    pub async fn unfollow(&self, user: &User, author_username: &str) -> Result<bool, FollowServiceError> {
        let author = self.author(author_username).await?;
        let removed = self
            .follow_repo
            .unfollow(user.id, author.id)
            .await
            .context("Failed to unfollow author")?;
        if removed {
            tracing::info!(user = %user.username, author = %author.username, "Unfollowed");
        }
        Ok(removed)
    }

    pub async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, FollowServiceError> {
        Ok(self
            .follow_repo
            .is_following(user_id, author_id)
            .await
            .context("Failed to check follow")?)
    }

    pub async fn followers_count(&self, author_id: i64) -> Result<i64, FollowServiceError> {
        Ok(self
            .follow_repo
            .count_followers(author_id)
            .await
            .context("Failed to count followers")?)
    }

    pub async fn following_count(&self, user_id: i64) -> Result<i64, FollowServiceError> {
        Ok(self
            .follow_repo
            .count_following(user_id)
            .await
            .context("Failed to count followed authors")?)
    }
}
