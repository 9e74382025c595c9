//! Group repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{CreateGroupInput, Group};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, input: &CreateGroupInput) -> Result<Group>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    /// All groups ordered by title, for the post form's choices
    async fn list(&self) -> Result<Vec<Group>>;
}

pub struct SqlxGroupRepository {
    pool: DynDatabasePool,
}

impl SqlxGroupRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GroupRepository> {
        Arc::new(Self::new(pool))
    }
}

macro_rules! group_from_row {
    ($row:expr) => {
        Group {
            id: $row.try_get("id")?,
            title: $row.try_get("title")?,
            slug: $row.try_get("slug")?,
            description: $row.try_get("description")?,
        }
    };
}

#[async_trait]
impl GroupRepository for SqlxGroupRepository {
    async fn create(&self, input: &CreateGroupInput) -> Result<Group> {
        let id = dispatch!(self.pool, |pool| {
            sqlx::query("INSERT INTO post_groups (title, slug, description) VALUES (?, ?, ?)")
                .bind(&input.title)
                .bind(&input.slug)
                .bind(&input.description)
                .execute(pool)
                .await
                .context("Failed to create group")?
                .insert_id()
        });

        Ok(Group {
            id,
            title: input.title.clone(),
            slug: input.slug.clone(),
            description: input.description.clone(),
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        dispatch!(self.pool, |pool| {
            let row =
                sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE slug = ?")
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get group by slug")?;
            match row {
                Some(row) => Ok(Some(group_from_row!(row))),
                None => Ok(None),
            }
        })
    }

    async fn list(&self) -> Result<Vec<Group>> {
        dispatch!(self.pool, |pool| {
            let rows = sqlx::query(
                "SELECT id, title, slug, description FROM post_groups ORDER BY title, id",
            )
            .fetch_all(pool)
            .await
            .context("Failed to list groups")?;

            let mut groups = Vec::with_capacity(rows.len());
            for row in &rows {
                groups.push(group_from_row!(row));
            }
            Ok(groups)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_group, setup_pool};

    #[tokio::test]
    async fn test_get_by_slug() {
        let pool = setup_pool().await;
        let created = insert_group(&pool, "cats").await;
        let repo = SqlxGroupRepository::new(pool);

        let found = repo.get_by_slug("cats").await.unwrap().expect("group");
        assert_eq!(found, created);
        assert!(repo.get_by_slug("dogs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_title() {
        let pool = setup_pool().await;
        insert_group(&pool, "zebras").await;
        insert_group(&pool, "ants").await;
        let repo = SqlxGroupRepository::new(pool);

        let slugs: Vec<String> = repo.list().await.unwrap().into_iter().map(|g| g.slug).collect();
        assert_eq!(slugs, vec!["ants", "zebras"]);
    }
}
