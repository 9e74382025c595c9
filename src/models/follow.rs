//! Follow model

use serde::{Deserialize, Serialize};

/// `user_id` follows `author_id`. At most one row exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
}
