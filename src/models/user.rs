//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. Every post, comment and follow belongs to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Username (unique), used in profile and post URLs
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// First and last name joined by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Full name when one is set, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = self.full_name();
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Profile page of `username`, percent-encoded for use in links and
/// `Location` headers.
pub fn profile_url(username: &str) -> String {
    format!("/{}/", urlencoding::encode(username))
}

/// Input for creating a user. `password` is hashed by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

/// Public part of a user, as shown on profile pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub display_name: String,
    pub url: String,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
            display_name: user.display_name(),
            url: profile_url(&user.username),
        }
    }
}
