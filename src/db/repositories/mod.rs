//! Database repositories
//!
//! One trait per entity plus its sqlx implementation. Services hold the
//! traits as `Arc<dyn ...>` so tests can swap implementations.

pub mod comment;
pub mod follow;
pub mod group;
pub mod post;
pub mod session;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use group::{GroupRepository, SqlxGroupRepository};
pub use post::{NewPost, PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{NewUser, SqlxUserRepository, UserRepository};

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateGroupInput, Group, Post, PostInput, User};

    pub async fn setup_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    pub fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "not-a-real-hash".to_string(),
        }
    }

    pub async fn insert_user(pool: &DynDatabasePool, username: &str) -> User {
        SqlxUserRepository::new(pool.clone())
            .create(&new_user(username))
            .await
            .expect("Failed to insert user")
    }

    pub async fn insert_group(pool: &DynDatabasePool, slug: &str) -> Group {
        SqlxGroupRepository::new(pool.clone())
            .create(&CreateGroupInput {
                title: format!("Group {slug}"),
                slug: slug.to_string(),
                description: format!("About {slug}"),
            })
            .await
            .expect("Failed to insert group")
    }

    pub async fn insert_post(
        pool: &DynDatabasePool,
        author_id: i64,
        text: &str,
        group_id: Option<i64>,
    ) -> Post {
        let input = PostInput {
            text: text.to_string(),
            group_id,
            image: None,
        };
        SqlxPostRepository::new(pool.clone())
            .create(&NewPost::new(author_id, input))
            .await
            .expect("Failed to insert post")
    }
}
