//! Group service

use crate::db::is_unique_violation;
use crate::db::repositories::GroupRepository;
use crate::models::{is_valid_slug, CreateGroupInput, Group, GROUP_TITLE_MAX_LEN};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum GroupServiceError {
    #[error("Group not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Group with slug '{0}' already exists")]
    SlugExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct GroupService {
    repo: Arc<dyn GroupRepository>,
}

impl GroupService {
    pub fn new(repo: Arc<dyn GroupRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: CreateGroupInput) -> Result<Group, GroupServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(GroupServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if title.chars().count() > GROUP_TITLE_MAX_LEN {
            return Err(GroupServiceError::ValidationError(format!(
                "Title must be at most {} characters",
                GROUP_TITLE_MAX_LEN
            )));
        }
        if !is_valid_slug(&input.slug) {
            return Err(GroupServiceError::ValidationError(format!(
                "Invalid slug '{}': use letters, numbers, hyphens or underscores",
                input.slug
            )));
        }

        let input = CreateGroupInput {
            title: title.to_string(),
            ..input
        };
        match self.repo.create(&input).await {
            Ok(group) => {
                tracing::info!(slug = %group.slug, "Group created");
                Ok(group)
            }
            Err(e) if is_unique_violation(&e) => Err(GroupServiceError::SlugExists(input.slug)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Group, GroupServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get group")?
            .ok_or_else(|| GroupServiceError::NotFound(slug.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<Group>, GroupServiceError> {
        Ok(self.repo.list().await.context("Failed to list groups")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;
    use crate::db::repositories::SqlxGroupRepository;

    async fn setup_test_service() -> GroupService {
        GroupService::new(SqlxGroupRepository::boxed(setup_pool().await))
    }

    fn input(title: &str, slug: &str) -> CreateGroupInput {
        CreateGroupInput {
            title: title.to_string(),
            slug: slug.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = setup_test_service().await;
        let group = service.create(input("  Cats  ", "cats")).await.unwrap();
        assert_eq!(group.title, "Cats");

        let found = service.get_by_slug("cats").await.unwrap();
        assert_eq!(found.id, group.id);
        assert!(matches!(
            service.get_by_slug("dogs").await,
            Err(GroupServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_slug() {
        let service = setup_test_service().await;
        service.create(input("Cats", "cats")).await.unwrap();
        assert!(matches!(
            service.create(input("More cats", "cats")).await,
            Err(GroupServiceError::SlugExists(_))
        ));
    }

    #[tokio::test]
    async fn test_validation() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.create(input("", "cats")).await,
            Err(GroupServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input(&"t".repeat(201), "cats")).await,
            Err(GroupServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input("Cats", "not a slug")).await,
            Err(GroupServiceError::ValidationError(_))
        ));
    }
}
