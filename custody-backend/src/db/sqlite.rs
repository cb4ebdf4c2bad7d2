//! SQLite connection pool and schema.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use super::StoreError;

pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Busy timeout for ordinary reads and writes
pub(crate) const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const POOL_SIZE: u32 = 8;

const TRANSACTIONS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS transactions (
        transaction_id TEXT PRIMARY KEY,
        address TEXT NOT NULL,
        proposer TEXT NOT NULL,
        payer TEXT NOT NULL,
        authorizers TEXT NOT NULL,
        code TEXT NOT NULL,
        arguments TEXT NOT NULL,
        reference_block_id TEXT NOT NULL,
        state TEXT NOT NULL,
        error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_address
        ON transactions(address, created_at);";

const LISTENER_STATUS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS listener_status (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        latest_height INTEGER NOT NULL DEFAULT 0,
        version INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    );";

/// Opens (or creates) a database file and applies `schema`.
fn open_pool(path: &str, schema: &str) -> Result<Pool<SqliteConnectionManager>, StoreError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Corrupt(format!("cannot create {}: {}", parent.display(), e)))?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)
    });
    let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;
    pool.get()?.execute_batch(schema)?;
    Ok(pool)
}

/// Account transaction records.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let pool = open_pool(path, TRANSACTIONS_SCHEMA)?;
        log::info!("[Database] Opened {}", path);
        Ok(Self { pool })
    }

    pub fn conn(&self) -> Result<DbConn, StoreError> {
        Ok(self.pool.get()?)
    }
}

/// The chain listener cursor, shared by every replica.
///
/// Lives in its own file so the cursor lock, which SQLite takes on the whole
/// file, never contends with transaction record writes.
pub struct StatusDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl StatusDatabase {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let pool = open_pool(path, LISTENER_STATUS_SCHEMA)?;
        log::info!("[ListenerStatus] Opened {}", path);
        Ok(Self { pool })
    }

    pub fn conn(&self) -> Result<DbConn, StoreError> {
        Ok(self.pool.get()?)
    }
}
