//! Post service
//!
//! Feed assembly, post authoring and the main-feed cache.
//!
//! Pages of the main feed are cached as query results under
//! `feed:index:page:<n>` for `feed_ttl`. Creating or editing a post here
//! drops those entries; rows written straight to the repository stay
//! hidden from a cached page until it expires or
//! `invalidate_index_feed` is called.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{NewPost, PostRepository};
use crate::models::{
    FeedFilter, ListParams, PagedResult, Post, PostInput, PostWithMeta, User, POSTS_PER_PAGE,
};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const CACHE_KEY_INDEX_FEED: &str = "feed:index";

const DEFAULT_FEED_TTL: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found")]
    NotFound,

    /// The user may not change this post
    #[error("Only the author can edit this post")]
    Forbidden,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
    feed_ttl: Duration,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>, cache: Arc<Cache>) -> Self {
        Self::with_feed_ttl(repo, cache, DEFAULT_FEED_TTL)
    }

    pub fn with_feed_ttl(
        repo: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
        feed_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            cache,
            feed_ttl,
        }
    }

    /// The main feed, served from cache when a fresh copy exists.
    pub async fn index_feed(
        &self,
        raw_page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        let cache_key = format!(
            "{}:page:{}",
            CACHE_KEY_INDEX_FEED,
            ListParams::requested_page(raw_page)
        );

        match self.cache.get::<PagedResult<PostWithMeta>>(&cache_key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %cache_key, "Feed cache hit");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %cache_key, "Feed cache read failed: {:#}", e),
        }

        let page = self.feed(FeedFilter::All, raw_page).await?;
        if let Err(e) = self.cache.set(&cache_key, &page, self.feed_ttl).await {
            tracing::warn!(key = %cache_key, "Feed cache write failed: {:#}", e);
        }
        Ok(page)
    }

    /// One page of a feed, uncached.
    pub async fn feed(
        &self,
        filter: FeedFilter,
        raw_page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        let total = self.repo.count(filter).await.context("Failed to count posts")?;
        let params = ListParams::resolve(raw_page, total, POSTS_PER_PAGE);
        let items = self
            .repo
            .list(filter, &params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Drop every cached page of the main feed.
    pub async fn invalidate_index_feed(&self) -> Result<(), PostServiceError> {
        self.cache
            .delete_pattern(&format!("{}:*", CACHE_KEY_INDEX_FEED))
            .await
            .context("Failed to invalidate feed cache")?;
        Ok(())
    }

    /// A post, provided it was written by `username`.
    pub async fn get_by_author(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<PostWithMeta, PostServiceError> {
        self.repo
            .get_with_meta(post_id)
            .await
            .context("Failed to get post")?
            .filter(|post| post.author_username == username)
            .ok_or(PostServiceError::NotFound)
    }

    pub async fn posts_count(&self, author_id: i64) -> Result<i64, PostServiceError> {
        Ok(self
            .repo
            .count(FeedFilter::Author(author_id))
            .await
            .context("Failed to count posts")?)
    }

    pub async fn create(&self, author: &User, input: PostInput) -> Result<Post, PostServiceError> {
        let input = validate_input(input)?;
        let post = self
            .repo
            .create(&NewPost::new(author.id, input))
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = post.id, author = %author.username, title = %post, "Post created");
        self.invalidate_index_feed().await?;
        Ok(post)
    }

    /// Replace a post's text, group and image. Only its author may do this.
    pub async fn update(
        &self,
        editor: &User,
        post_id: i64,
        input: PostInput,
    ) -> Result<Post, PostServiceError> {
        let existing = self
            .repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        if existing.author_id != editor.id {
            return Err(PostServiceError::Forbidden);
        }

        let input = validate_input(input)?;
        self.repo
            .update(post_id, &input)
            .await
            .context("Failed to update post")?;

        tracing::info!(post_id, "Post updated");
        self.invalidate_index_feed().await?;

        Ok(Post {
            text: input.text,
            group_id: input.group_id,
            image: input.image,
            ..existing
        })
    }
}

fn validate_input(input: PostInput) -> Result<PostInput, PostServiceError> {
    let text = input.text.trim();
    if text.is_empty() {
        return Err(PostServiceError::ValidationError(
            "Post text cannot be empty".to_string(),
        ));
    }
    Ok(PostInput {
        text: text.to_string(),
        ..input
    })
}
