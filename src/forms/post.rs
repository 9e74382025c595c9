//! Post create/edit form

use super::{required, FormData, FormErrors, UploadedFile, INVALID_CHOICE};
use crate::models::{Group, PostInput, PostWithMeta};
use crate::services::MediaStore;
use serde::Serialize;

pub const IMAGE_CLEAR_FIELD: &str = "image-clear";

const CLEAR_AND_UPLOAD: &str =
    "Please either submit a file or check the clear checkbox, not both.";

#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Raw `group` value: a group id or empty
    pub group: String,
    pub image: Option<UploadedFile>,
    pub image_clear: bool,
}

/// A checked submission, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<UploadedFile>,
    pub image_clear: bool,
}

#[derive(Serialize)]
pub struct PostFormView<'a> {
    text: &'a str,
    group: &'a str,
    errors: &'a FormErrors,
}

impl PostForm {
    pub fn from_data(mut data: FormData) -> Self {
        Self {
            text: data.text("text"),
            group: data.text("group"),
            image_clear: data.flag(IMAGE_CLEAR_FIELD),
            image: data.take_file("image"),
        }
    }

    /// Pre-filled from an existing post, for the edit page.
    pub fn initial(post: &PostWithMeta) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn validate(&self, groups: &[Group], media: &MediaStore) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::new();

        let text = required(&self.text, "text", &mut errors);

        let group = self.group.trim();
        let group_id = if group.is_empty() {
            None
        } else {
            match group.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            }
        };

        if let Some(file) = &self.image {
            if self.image_clear {
                errors.add("image", CLEAR_AND_UPLOAD);
            } else if let Err(e) = media.validate_image(&file.filename, &file.data) {
                errors.add("image", e.to_string());
            }
        }

        errors.into_result(ValidPost {
            text,
            group_id,
            image: self.image.clone(),
            image_clear: self.image_clear,
        })
    }

    pub fn view<'a>(&'a self, errors: &'a FormErrors) -> PostFormView<'a> {
        PostFormView {
            text: &self.text,
            group: &self.group,
            errors,
        }
    }
}

impl ValidPost {
    /// Service input given the name of the stored upload (if any) and the
    /// post's current image (when editing).
    pub fn into_input(self, stored: Option<String>, current: Option<String>) -> PostInput {
        let image = match stored {
            Some(name) => Some(name),
            None if self.image_clear => None,
            None => current,
        };
        PostInput {
            text: self.text,
            group_id: self.group_id,
            image,
        }
    }
}
