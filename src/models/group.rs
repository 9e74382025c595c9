//! Group model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a group title
pub const GROUP_TITLE_MAX_LEN: usize = 200;

/// A community posts can be filed under, addressed by its slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    /// Unique URL identifier
    pub slug: String,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// Slugs are ASCII letters, digits, hyphens and underscores.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 50
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_title() {
        let group = Group {
            id: 1,
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        };
        assert_eq!(group.to_string(), "Cats");
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("test-slug_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("кошки"));
        assert!(!is_valid_slug(&"a".repeat(51)));
    }
}
