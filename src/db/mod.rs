//! Database layer
//!
//! SQLite (default, single-file deployment) and MySQL are both supported;
//! the driver comes from configuration. Code above this module talks to
//! the repository traits and never to a concrete backend.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! let posts = SqlxPostRepository::boxed(pool.clone());
//! ```

/// Run `$body` with `$conn` bound to the concrete pool behind `$pool`.
///
/// The body is expanded once per backend, so one `sqlx::query(..)` chain
/// is compiled against both SQLite and MySQL. Must be used inside a
/// function returning `anyhow::Result`.
macro_rules! dispatch {
    ($pool:expr, |$conn:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $conn = $pool.sqlite()?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $conn = $pool.mysql()?;
                $body
            }
        }
    };
}

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Backend-neutral access to the id generated by an INSERT.
pub trait InsertId {
    fn insert_id(&self) -> i64;
}

impl InsertId for sqlx::sqlite::SqliteQueryResult {
    fn insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertId for sqlx::mysql::MySqlQueryResult {
    fn insert_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}

/// True when `err` (or anything it wraps) is a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}
