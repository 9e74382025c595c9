//! HTML form handling
//!
//! Submitted fields arrive as a [`FormData`] (from urlencoded or multipart
//! bodies), are checked by one of the form types here, and either become
//! service input or a [`FormErrors`] to show next to the fields.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub mod auth;
pub mod comment;
pub mod post;

pub use auth::{safe_next, LoginForm, SignupForm, INVALID_LOGIN};
pub use comment::CommentForm;
pub use post::{PostForm, ValidPost};

pub const REQUIRED: &str = "This field is required.";

pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Key for errors that belong to the form as a whole
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// A file field from a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Decoded body of a form submission
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut data = Self::new();
        for (k, v) in pairs {
            data.insert_field(k, v);
        }
        data
    }

    /// Later values for the same name replace earlier ones.
    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Browsers send an empty part for an untouched file input; that counts as no file.
    pub fn insert_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        if file.filename.is_empty() && file.data.is_empty() {
            return;
        }
        self.files.insert(name.into(), file);
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field value, or empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.field(name).unwrap_or_default().to_string()
    }

    /// Checkbox semantics: present and not explicitly off.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.field(name), Some(v) if !matches!(v, "" | "0" | "false" | "off"))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Field-level validation messages, serialized as `{field: [messages]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trimmed value of a required text field, recording an error when blank.
pub(crate) fn required(value: &str, field: &str, errors: &mut FormErrors) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, REQUIRED);
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_errors_serialize_by_field() {
        let mut errors = FormErrors::new();
        errors.add("text", REQUIRED);
        errors.add_non_field("Bad form");

        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["text"][0], REQUIRED);
        assert_eq!(value[NON_FIELD_ERRORS][0], "Bad form");
        assert!(errors.has("text"));
        assert!(errors.get("group").is_empty());
    }

    #[test]
    fn test_flag() {
        let data = FormData::from_pairs([("a", "on"), ("b", ""), ("c", "false")]);
        assert!(data.flag("a"));
        assert!(!data.flag("b"));
        assert!(!data.flag("c"));
        assert!(!data.flag("missing"));
    }

    #[test]
    fn test_empty_file_part_ignored() {
        let mut data = FormData::new();
        data.insert_file(
            "image",
            UploadedFile {
                filename: String::new(),
                data: Vec::new(),
            },
        );
        assert!(data.take_file("image").is_none());
    }
}
