//! User repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, created_at";

/// Fields of a new user row; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
}

pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

macro_rules! user_from_row {
    ($row:expr) => {
        User {
            id: $row.try_get("id")?,
            username: $row.try_get("username")?,
            email: $row.try_get("email")?,
            first_name: $row.try_get("first_name")?,
            last_name: $row.try_get("last_name")?,
            password_hash: $row.try_get("password_hash")?,
            created_at: $row.try_get::<DateTime<Utc>, _>("created_at")?,
        }
    };
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;

        let id = dispatch!(self.pool, |pool| {
            sqlx::query(sql)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(&user.password_hash)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create user")?
                .insert_id()
        });

        Ok(User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        dispatch!(self.pool, |pool| {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by ID")?;
            match row {
                Some(row) => Ok(Some(user_from_row!(row))),
                None => Ok(None),
            }
        })
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        dispatch!(self.pool, |pool| {
            let row = sqlx::query(&sql)
                .bind(username)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by username")?;
            match row {
                Some(row) => Ok(Some(user_from_row!(row))),
                None => Ok(None),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_unique_violation;
    use crate::db::repositories::test_support::{new_user, setup_pool};

    #[tokio::test]
    async fn test_create_and_get_user() {
        let pool = setup_pool().await;
        let repo = SqlxUserRepository::new(pool);

        let created = repo.create(&new_user("leo")).await.expect("create");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("by id");
        assert_eq!(by_id.username, "leo");

        let by_name = repo.get_by_username("leo").await.unwrap().expect("by name");
        assert_eq!(by_name.id, created.id);

        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let pool = setup_pool().await;
        let repo = SqlxUserRepository::new(pool);

        repo.create(&new_user("leo")).await.unwrap();
        let err = repo.create(&new_user("leo")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
