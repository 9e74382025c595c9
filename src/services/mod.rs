//! Services layer
//!
//! Business rules over the repositories: feeds and the feed cache,
//! authoring checks, accounts and sessions, follows, and media storage.
//! Each service reports failures through its own error enum.

pub mod comment;
pub mod follow;
pub mod group;
pub mod media;
pub mod password;
pub mod post;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use follow::{FollowService, FollowServiceError};
pub use group::{GroupService, GroupServiceError};
pub use media::{sanitize_filename, ImageError, MediaStore, POSTS_DIR};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use user::{validate_username, UserService, UserServiceError, PASSWORD_MIN_LEN, USERNAME_MAX_LEN};
