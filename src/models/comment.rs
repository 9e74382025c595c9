//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Comment with its author's name, for display under a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithMeta {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub author_name: String,
    pub author_url: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}
