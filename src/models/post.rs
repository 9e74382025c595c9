//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL prefix uploaded files are served under
pub const MEDIA_URL: &str = "/media/";

/// Characters of the text used as a post's short form
const SHORT_TEXT_LEN: usize = 15;

/// Post entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    /// Set once when the post is created
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    /// `None` when the post has no group or its group was deleted
    pub group_id: Option<i64>,
    /// Storage name relative to the media root, e.g. `posts/cat.gif`
    pub image: Option<String>,
}

impl Post {
    /// The first 15 characters of the text.
    pub fn short_text(&self) -> String {
        self.text.chars().take(SHORT_TEXT_LEN).collect()
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_text())
    }
}

/// Public URL of a stored media file
pub fn media_url(name: &str) -> String {
    format!("{}{}", MEDIA_URL, name)
}

/// Detail page of a post
pub fn post_url(username: &str, post_id: i64) -> String {
    format!("{}{}/", super::user::profile_url(username), post_id)
}

/// A post as shown in feeds and on its own page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithMeta {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub author_username: String,
    pub author_name: String,
    pub author_url: String,
    /// Detail page; edit and comment URLs extend it
    pub url: String,
    pub group_id: Option<i64>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub comment_count: i64,
}

/// Which posts a feed contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows
    FollowedBy(i64),
}

/// Validated field values for creating or updating a post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(text: &str) -> Post {
        Post {
            id: 1,
            text: text.to_string(),
            pub_date: Utc::now(),
            author_id: 1,
            group_id: None,
            image: None,
        }
    }

    #[test]
    fn test_display_is_first_fifteen_chars() {
        assert_eq!(post("Тестовый текст поста").to_string(), "Тестовый текст ");
        assert_eq!(post("short").to_string(), "short");
    }

    #[test]
    fn test_post_url_encodes_username() {
        assert_eq!(post_url("leo", 3), "/leo/3/");
        assert_eq!(post_url("a+b@c", 7), "/a%2Bb%40c/7/");
    }

    #[test]
    fn test_media_url() {
        assert_eq!(media_url("posts/small.gif"), "/media/posts/small.gif");
    }
}
