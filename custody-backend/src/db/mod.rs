pub mod sqlite;
pub mod tables;

pub use sqlite::{Database, DbConn, StatusDatabase};
pub use tables::listener_status::ListenerStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

const DEFAULT_LIST_LIMIT: usize = 1000;
const MAX_LIST_LIMIT: usize = 1000;

/// Pagination bounds for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
}

impl ListOptions {
    /// Clamps caller-supplied bounds: non-positive or oversized limits fall
    /// back to the default, negative offsets to zero.
    pub fn parse(limit: i64, offset: i64) -> Self {
        let limit = if limit <= 0 || limit as u64 > MAX_LIST_LIMIT as u64 {
            DEFAULT_LIST_LIMIT
        } else {
            limit as usize
        };
        let offset = if offset < 0 { 0 } else { offset as usize };
        Self { limit, offset }
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}
