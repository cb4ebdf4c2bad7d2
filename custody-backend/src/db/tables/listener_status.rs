//! Chain listener status row
//!
//! A single row (id = 1) shared by every replica. Updates go through
//! [`StatusDatabase::with_exclusive_status`], which takes the write lock without
//! waiting: if another replica already holds it the call fails with
//! [`WalletError::LockContention`] and nothing is changed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use super::super::sqlite::BUSY_TIMEOUT;
use super::super::{StatusDatabase, StoreError};
use crate::error::WalletError;

const STATUS_ROW_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerStatus {
    pub id: i64,
    /// Last block height whose events were fully processed
    pub latest_height: u64,
    /// Bumped on every committed update
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

fn is_lock_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn store_error(err: rusqlite::Error) -> WalletError {
    if is_lock_error(&err) {
        WalletError::LockContention
    } else {
        StoreError::from(err).into()
    }
}

/// Raw row as stored, before validation
struct StatusRow {
    id: i64,
    latest_height: i64,
    version: i64,
    updated_at: String,
}

impl TryFrom<StatusRow> for ListenerStatus {
    type Error = StoreError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        let latest_height = u64::try_from(row.latest_height).map_err(|_| {
            StoreError::Corrupt(format!("negative listener height {}", row.latest_height))
        })?;
        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map_err(|e| StoreError::Corrupt(format!("listener updated_at: {}", e)))?
            .with_timezone(&Utc);
        Ok(Self {
            id: row.id,
            latest_height,
            version: row.version,
            updated_at,
        })
    }
}

fn read_row(conn: &Connection) -> rusqlite::Result<Option<StatusRow>> {
    conn.query_row(
        "SELECT id, latest_height, version, updated_at FROM listener_status WHERE id = ?1",
        [STATUS_ROW_ID],
        |row| {
            Ok(StatusRow {
                id: row.get(0)?,
                latest_height: row.get(1)?,
                version: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    )
    .optional()
}

fn read_status(conn: &Connection) -> Result<Option<ListenerStatus>, StoreError> {
    read_row(conn)?.map(ListenerStatus::try_from).transpose()
}

fn locked_update<F>(conn: &mut Connection, f: F) -> Result<ListenerStatus, WalletError>
where
    F: FnOnce(&mut ListenerStatus) -> Result<(), WalletError>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(store_error)?;

    tx.execute(
        "INSERT OR IGNORE INTO listener_status (id, latest_height, version, updated_at)
         VALUES (?1, 0, 0, ?2)",
        rusqlite::params![STATUS_ROW_ID, Utc::now().to_rfc3339()],
    )
    .map_err(store_error)?;

    let row = read_row(&tx)
        .map_err(store_error)?
        .ok_or_else(|| WalletError::Internal("listener status row missing".to_string()))?;
    let mut status = ListenerStatus::try_from(row)?;

    // Dropping `tx` on an error path rolls back.
    f(&mut status)?;

    status.version += 1;
    status.updated_at = Utc::now();
    tx.execute(
        "UPDATE listener_status SET latest_height = ?1, version = ?2, updated_at = ?3
         WHERE id = ?4",
        rusqlite::params![
            status.latest_height as i64,
            status.version,
            status.updated_at.to_rfc3339(),
            STATUS_ROW_ID,
        ],
    )
    .map_err(store_error)?;
    tx.commit().map_err(store_error)?;

    Ok(status)
}

impl StatusDatabase {
    /// Runs `f` against the listener status while holding the row's write
    /// lock, then commits whatever `f` left in the status.
    ///
    /// Creates the row on first use. Never waits for the lock: contention is
    /// reported as [`WalletError::LockContention`]. An error from `f` rolls
    /// everything back and is returned unchanged.
    pub fn with_exclusive_status<F>(&self, f: F) -> Result<ListenerStatus, WalletError>
    where
        F: FnOnce(&mut ListenerStatus) -> Result<(), WalletError>,
    {
        let mut conn = self.conn()?;
        conn.busy_timeout(Duration::ZERO).map_err(store_error)?;

        let result = locked_update(&mut conn, f);

        // The connection goes back to the pool; restore the normal timeout.
        if let Err(e) = conn.busy_timeout(BUSY_TIMEOUT) {
            log::warn!("[ListenerStatus] Failed to restore busy timeout: {}", e);
        }

        match &result {
            Ok(status) => log::debug!(
                "[ListenerStatus] Cursor now at height {} (version {})",
                status.latest_height,
                status.version
            ),
            Err(WalletError::LockContention) => {
                log::debug!("[ListenerStatus] Locked elsewhere")
            }
            Err(e) => log::warn!("[ListenerStatus] Update rolled back: {}", e),
        }
        result
    }

    /// Current listener status without locking. `None` until the first update.
    pub fn listener_status(&self) -> Result<Option<ListenerStatus>, StoreError> {
        let conn = self.conn()?;
        read_status(&conn)
    }
}
