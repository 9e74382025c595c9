//! Post repository
//!
//! Feeds are read through `list`/`count` with a `FeedFilter`, always in
//! reverse publication order.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{
    media_url, post_url, profile_url, FeedFilter, ListParams, Post, PostInput, PostWithMeta,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

/// Fields of a new post row
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
    pub pub_date: DateTime<Utc>,
}

impl NewPost {
    pub fn new(author_id: i64, input: PostInput) -> Self {
        Self {
            author_id,
            text: input.text,
            group_id: input.group_id,
            image: input.image,
            pub_date: Utc::now(),
        }
    }
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &NewPost) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Replace the editable fields. Author and pub_date never change.
    async fn update(&self, id: i64, input: &PostInput) -> Result<()>;

    async fn count(&self, filter: FeedFilter) -> Result<i64>;

    /// One page of a feed, newest first
    async fn list(&self, filter: FeedFilter, params: &ListParams) -> Result<Vec<PostWithMeta>>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const META_SELECT: &str = r#"
    SELECT p.id, p.text, p.pub_date, p.author_id, p.group_id, p.image,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           g.slug AS group_slug,
           g.title AS group_title,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

/// WHERE clause for a feed and the id it binds, if any
fn filter_clause(filter: FeedFilter) -> (&'static str, Option<i64>) {
    match filter {
        FeedFilter::All => ("", None),
        FeedFilter::Group(id) => ("WHERE p.group_id = ?", Some(id)),
        FeedFilter::Author(id) => ("WHERE p.author_id = ?", Some(id)),
        FeedFilter::FollowedBy(user_id) => (
            "WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ?)",
            Some(user_id),
        ),
    }
}

fn author_name(first: &str, last: &str) -> String {
    format!("{} {}", first, last).trim().to_string()
}

macro_rules! post_from_row {
    ($row:expr) => {
        Post {
            id: $row.try_get("id")?,
            text: $row.try_get("text")?,
            pub_date: $row.try_get::<DateTime<Utc>, _>("pub_date")?,
            author_id: $row.try_get("author_id")?,
            group_id: $row.try_get("group_id")?,
            image: $row.try_get("image")?,
        }
    };
}

macro_rules! post_meta_from_row {
    ($row:expr) => {{
        let image: Option<String> = $row.try_get("image")?;
        let first: String = $row.try_get("author_first_name")?;
        let last: String = $row.try_get("author_last_name")?;
        let id: i64 = $row.try_get("id")?;
        let author_username: String = $row.try_get("author_username")?;
        PostWithMeta {
            id,
            text: $row.try_get("text")?,
            pub_date: $row.try_get::<DateTime<Utc>, _>("pub_date")?,
            author_id: $row.try_get("author_id")?,
            author_url: profile_url(&author_username),
            url: post_url(&author_username, id),
            author_username,
            author_name: author_name(&first, &last),
            group_id: $row.try_get("group_id")?,
            group_slug: $row.try_get("group_slug")?,
            group_title: $row.try_get("group_title")?,
            image_url: image.as_deref().map(media_url),
            image,
            comment_count: $row.try_get("comment_count")?,
        }
    }};
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        let sql = r#"
            INSERT INTO posts (text, pub_date, author_id, group_id, image)
            VALUES (?, ?, ?, ?, ?)
        "#;

        let id = dispatch!(self.pool, |pool| {
            sqlx::query(sql)
                .bind(&post.text)
                .bind(post.pub_date)
                .bind(post.author_id)
                .bind(post.group_id)
                .bind(&post.image)
                .execute(pool)
                .await
                .context("Failed to create post")?
                .insert_id()
        });

        Ok(Post {
            id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        dispatch!(self.pool, |pool| {
            let row = sqlx::query(
                "SELECT id, text, pub_date, author_id, group_id, image FROM posts WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get post by ID")?;
            match row {
                Some(row) => Ok(Some(post_from_row!(row))),
                None => Ok(None),
            }
        })
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>> {
        let sql = format!("{META_SELECT} WHERE p.id = ?");
        dispatch!(self.pool, |pool| {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get post")?;
            match row {
                Some(row) => Ok(Some(post_meta_from_row!(row))),
                None => Ok(None),
            }
        })
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<()> {
        dispatch!(self.pool, |pool| {
            sqlx::query("UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ?")
                .bind(&input.text)
                .bind(input.group_id)
                .bind(&input.image)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update post")?;
        });
        Ok(())
    }

    async fn count(&self, filter: FeedFilter) -> Result<i64> {
        let (clause, arg) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) AS total FROM posts p {clause}");
        dispatch!(self.pool, |pool| {
            let mut query = sqlx::query(&sql);
            if let Some(arg) = arg {
                query = query.bind(arg);
            }
            let row = query
                .fetch_one(pool)
                .await
                .context("Failed to count posts")?;
            Ok(row.try_get("total")?)
        })
    }

    async fn list(&self, filter: FeedFilter, params: &ListParams) -> Result<Vec<PostWithMeta>> {
        let (clause, arg) = filter_clause(filter);
        let sql = format!(
            "{META_SELECT} {clause} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?"
        );
        dispatch!(self.pool, |pool| {
            let mut query = sqlx::query(&sql);
            if let Some(arg) = arg {
                query = query.bind(arg);
            }
            let rows = query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await
                .context("Failed to list posts")?;

            let mut posts = Vec::with_capacity(rows.len());
            for row in &rows {
                posts.push(post_meta_from_row!(row));
            }
            Ok(posts)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_group, insert_post, insert_user, setup_pool,
    };
    use crate::db::repositories::{FollowRepository, SqlxFollowRepository};

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "leo").await;
        for i in 0..13 {
            insert_post(&pool, author.id, &format!("post {i}"), None).await;
        }
        let repo = SqlxPostRepository::new(pool);

        assert_eq!(repo.count(FeedFilter::All).await.unwrap(), 13);

        let first = repo
            .list(FeedFilter::All, &ListParams::new(1, 10))
            .await
            .unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].text, "post 12");

        let second = repo
            .list(FeedFilter::All, &ListParams::new(2, 10))
            .await
            .unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[2].text, "post 0");
    }

    #[tokio::test]
    async fn test_group_filter() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "leo").await;
        let cats = insert_group(&pool, "cats").await;
        let dogs = insert_group(&pool, "dogs").await;
        insert_post(&pool, author.id, "meow", Some(cats.id)).await;
        let repo = SqlxPostRepository::new(pool);

        let in_cats = repo
            .list(FeedFilter::Group(cats.id), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(in_cats.len(), 1);
        assert_eq!(in_cats[0].group_slug.as_deref(), Some("cats"));

        assert_eq!(repo.count(FeedFilter::Group(dogs.id)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_followed_by_filter() {
        let pool = setup_pool().await;
        let reader = insert_user(&pool, "reader").await;
        let writer = insert_user(&pool, "writer").await;
        let other = insert_user(&pool, "other").await;
        insert_post(&pool, writer.id, "from writer", None).await;
        insert_post(&pool, other.id, "from other", None).await;

        let repo = SqlxPostRepository::new(pool.clone());
        assert_eq!(repo.count(FeedFilter::FollowedBy(reader.id)).await.unwrap(), 0);

        SqlxFollowRepository::new(pool)
            .follow(reader.id, writer.id)
            .await
            .unwrap();

        let feed = repo
            .list(FeedFilter::FollowedBy(reader.id), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author_username, "writer");
    }

    #[tokio::test]
    async fn test_deleting_group_keeps_post() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "leo").await;
        let cats = insert_group(&pool, "cats").await;
        let post = insert_post(&pool, author.id, "meow", Some(cats.id)).await;

        pool.execute(&format!("DELETE FROM post_groups WHERE id = {}", cats.id))
            .await
            .unwrap();

        let repo = SqlxPostRepository::new(pool);
        let post = repo.get_by_id(post.id).await.unwrap().expect("post survives");
        assert_eq!(post.group_id, None);
    }

    #[tokio::test]
    async fn test_update_keeps_author_and_date() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "leo").await;
        let post = insert_post(&pool, author.id, "draft", None).await;
        let repo = SqlxPostRepository::new(pool);

        let input = PostInput {
            text: "final".to_string(),
            group_id: None,
            image: Some("posts/a.png".to_string()),
        };
        repo.update(post.id, &input).await.unwrap();

        let meta = repo.get_with_meta(post.id).await.unwrap().expect("post");
        assert_eq!(meta.text, "final");
        assert_eq!(meta.author_id, author.id);
        assert_eq!(meta.pub_date, post.pub_date);
        assert_eq!(meta.image_url.as_deref(), Some("/media/posts/a.png"));
    }
}
