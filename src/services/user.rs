//! User service
//!
//! Registration, login/logout and session validation.

use crate::db::is_unique_violation;
use crate::db::repositories::{NewUser, SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_SESSION_DAYS: i64 = 7;

pub const USERNAME_MAX_LEN: usize = 150;

pub const PASSWORD_MIN_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("A user with that username already exists.")]
    UserExists(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_days(user_repo, session_repo, DEFAULT_SESSION_DAYS)
    }

    pub fn with_session_days(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_days,
        }
    }

    /// Session lifetime, for the cookie's Max-Age
    pub fn session_max_age(&self) -> Duration {
        Duration::days(self.session_days)
    }

    /// Register a new account.
    ///
    /// Fails with `UserExists` when the username is taken.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_username(&input.username).map_err(UserServiceError::ValidationError)?;
        if input.password.chars().count() < PASSWORD_MIN_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LEN
            )));
        }

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(input.username));
        }

        let password_hash = hash_password(&input.password)?;
        let new_user = NewUser {
            username: input.username.clone(),
            email: input.email.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password_hash,
        };

        // A concurrent signup can still win the race for the name.
        match self.user_repo.create(&new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "User registered");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::UserExists(input.username)),
            Err(e) => Err(e.context("Failed to create user").into()),
        }
    }

    /// Check credentials and open a new session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError(
                "Please enter a correct username and password.".to_string(),
            )
        };

        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(username = %username, "Rejected login");
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    pub async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + self.session_max_age(),
            created_at: now,
        };
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(session)
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user. Expired sessions are deleted.
    pub async fn validate_session(&self, session_id: &str) -> Result<User, UserServiceError> {
        let session = self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to load session")?
            .ok_or(UserServiceError::SessionNotFound)?;

        if session.is_expired() {
            self.session_repo
                .delete(session_id)
                .await
                .context("Failed to delete expired session")?;
            return Err(UserServiceError::SessionExpired);
        }

        self.user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to load session user")?
            .ok_or(UserServiceError::SessionNotFound)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?)
    }

    /// Drop every expired session, returning how many were removed
    pub async fn purge_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to purge sessions")?)
    }
}

/// Usernames are 1-150 characters: letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("This field is required.".to_string());
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Ensure this value has at most {} characters.",
            USERNAME_MAX_LEN
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};

    async fn setup_test_service() -> UserService {
        let pool = setup_pool().await;
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn input(username: &str, password: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            password: password.to_string(),
            ..CreateUserInput::default()
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let service = setup_test_service().await;

        let user = service
            .register(input("AndreyG", "s3cret-pass"))
            .await
            .expect("register");
        assert_ne!(user.password_hash, "s3cret-pass");

        let (logged_in, session) = service
            .login("AndreyG", "s3cret-pass")
            .await
            .expect("login");
        assert_eq!(logged_in.id, user.id);

        let resolved = service.validate_session(&session.id).await.expect("session");
        assert_eq!(resolved.username, "AndreyG");

        service.logout(&session.id).await.unwrap();
        assert!(matches!(
            service.validate_session(&session.id).await,
            Err(UserServiceError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let service = setup_test_service().await;
        service.register(input("leo", "password1")).await.unwrap();

        let result = service.register(input("leo", "password2")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_and_bad_username() {
        let service = setup_test_service().await;

        let result = service.register(input("leo", "short")).await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));

        let result = service.register(input("leo tolstoy", "long-enough")).await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = setup_test_service().await;
        service.register(input("leo", "password1")).await.unwrap();

        let result = service.login("leo", "password2").await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));
        let result = service.login("nobody", "password1").await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let pool = setup_pool().await;
        let service = UserService::with_session_days(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        let user = service.register(input("leo", "password1")).await.unwrap();
        let session = service.create_session(user.id).await.unwrap();

        assert!(matches!(
            service.validate_session(&session.id).await,
            Err(UserServiceError::SessionExpired)
        ));
        assert!(matches!(
            service.validate_session(&session.id).await,
            Err(UserServiceError::SessionNotFound)
        ));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("user.name+tag@host_1-2").is_ok());
        assert!(validate_username("Андрей").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("a b").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }
}
