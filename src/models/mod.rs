//! Data models
//!
//! Database entities (User, Session, Group, Post, Comment, Follow), the
//! joined rows pages display, and pagination types.

mod comment;
mod follow;
mod group;
mod pagination;
mod post;
mod session;
mod user;

pub use comment::{Comment, CommentWithMeta, CreateCommentInput};
pub use follow::Follow;
pub use group::{is_valid_slug, CreateGroupInput, Group, GROUP_TITLE_MAX_LEN};
pub use pagination::{num_pages, ListParams, PagedResult, POSTS_PER_PAGE};
pub use post::{media_url, post_url, FeedFilter, Post, PostInput, PostWithMeta, MEDIA_URL};
pub use session::Session;
pub use user::{profile_url, CreateUserInput, Profile, User};
