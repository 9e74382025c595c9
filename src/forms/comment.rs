//! Comment form

use super::{required, FormData, FormErrors};
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Serialize)]
pub struct CommentFormView<'a> {
    text: &'a str,
    errors: &'a FormErrors,
}

impl CommentForm {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            text: data.text("text"),
        }
    }

    /// The trimmed comment text.
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = required(&self.text, "text", &mut errors);
        errors.into_result(text)
    }

    pub fn view<'a>(&'a self, errors: &'a FormErrors) -> CommentFormView<'a> {
        CommentFormView {
            text: &self.text,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::REQUIRED;

    #[test]
    fn test_comment_text_required() {
        let form = CommentForm::from_data(&FormData::from_pairs([("text", " \n ")]));
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("text"), [REQUIRED.to_string()]);

        let form = CommentForm::from_data(&FormData::from_pairs([("text", " fine ")]));
        assert_eq!(form.validate().unwrap(), "fine");
    }
}
