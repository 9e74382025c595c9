//! Signup and login forms

use super::{required, FormData, FormErrors};
use crate::models::CreateUserInput;
use crate::services::{validate_username, PASSWORD_MIN_LEN};
use serde::Serialize;

pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub const PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Serialize)]
pub struct SignupFormView<'a> {
    username: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    errors: &'a FormErrors,
}

impl SignupForm {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            username: data.text("username"),
            email: data.text("email"),
            first_name: data.text("first_name"),
            last_name: data.text("last_name"),
            password1: data.text("password1"),
            password2: data.text("password2"),
        }
    }

    pub fn validate(&self) -> Result<CreateUserInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.trim();
        if let Err(message) = validate_username(username) {
            errors.add("username", message);
        }

        let email = self.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", super::REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", super::REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        } else if self.password2.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password2",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    PASSWORD_MIN_LEN
                ),
            );
        }

        errors.into_result(CreateUserInput {
            username: username.to_string(),
            email: email.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password: self.password1.clone(),
        })
    }

    pub fn view<'a>(&'a self, errors: &'a FormErrors) -> SignupFormView<'a> {
        SignupFormView {
            username: &self.username,
            email: &self.email,
            first_name: &self.first_name,
            last_name: &self.last_name,
            errors,
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

#[derive(Serialize)]
pub struct LoginFormView<'a> {
    username: &'a str,
    errors: &'a FormErrors,
}

impl LoginForm {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            username: data.text("username"),
            password: data.text("password"),
            next: data.text("next"),
        }
    }

    /// Trimmed username and the password as typed.
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&self.username, "username", &mut errors);
        if self.password.is_empty() {
            errors.add("password", super::REQUIRED);
        }
        errors.into_result((username, self.password.clone()))
    }

    pub fn view<'a>(&'a self, errors: &'a FormErrors) -> LoginFormView<'a> {
        LoginFormView {
            username: &self.username,
            errors,
        }
    }
}

/// `next` when it points at a path on this site, otherwise `/`.
pub fn safe_next(next: &str) -> &str {
    let local = next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\");
    if local {
        next
    } else {
        "/"
    }
}
