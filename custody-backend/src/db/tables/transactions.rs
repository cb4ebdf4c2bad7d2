//! Transaction records
//!
//! One row per transaction that reached the ledger, keyed by network id.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;

use super::super::{Database, ListOptions, StoreError};
use crate::flow::{FlowAddress, Identifier};
use crate::transactions::{Transaction, TransactionState, TransactionStore};

const SELECT_COLUMNS: &str = "SELECT transaction_id, address, proposer, payer, authorizers, code,
        arguments, reference_block_id, state, error, created_at, updated_at
 FROM transactions";

/// Raw column values, decoded outside the rusqlite row closure so decode
/// failures surface as `StoreError::Corrupt` instead of being skipped.
struct TransactionRow {
    transaction_id: String,
    address: String,
    proposer: String,
    payer: String,
    authorizers: String,
    code: String,
    arguments: String,
    reference_block_id: String,
    state: String,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        transaction_id: row.get(0)?,
        address: row.get(1)?,
        proposer: row.get(2)?,
        payer: row.get(3)?,
        authorizers: row.get(4)?,
        code: row.get(5)?,
        arguments: row.get(6)?,
        reference_block_id: row.get(7)?,
        state: row.get(8)?,
        error: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn corrupt(field: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!("{}: {}", field, value))
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt(field, value))
}

fn parse_address(field: &str, value: &str) -> Result<FlowAddress, StoreError> {
    FlowAddress::from_str(value).map_err(|_| corrupt(field, value))
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let authorizers: Vec<FlowAddress> = serde_json::from_str(&row.authorizers)
            .map_err(|_| corrupt("authorizers", &row.authorizers))?;
        let arguments = serde_json::from_str(&row.arguments)
            .map_err(|_| corrupt("arguments", &row.arguments))?;

        Ok(Transaction {
            transaction_id: Some(
                Identifier::from_str(&row.transaction_id)
                    .map_err(|_| corrupt("transaction_id", &row.transaction_id))?,
            ),
            address: parse_address("address", &row.address)?,
            proposer: parse_address("proposer", &row.proposer)?,
            payer: parse_address("payer", &row.payer)?,
            authorizers,
            code: row.code,
            arguments,
            reference_block_id: Identifier::from_str(&row.reference_block_id)
                .map_err(|_| corrupt("reference_block_id", &row.reference_block_id))?,
            state: TransactionState::from_str(&row.state).map_err(|_| corrupt("state", &row.state))?,
            error: row.error,
            created_at: parse_time("created_at", &row.created_at)?,
            updated_at: parse_time("updated_at", &row.updated_at)?,
        })
    }
}

/// Fixed-width so `ORDER BY created_at` sorts chronologically.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn require_id(tx: &Transaction) -> Result<Identifier, StoreError> {
    tx.transaction_id
        .ok_or_else(|| StoreError::Corrupt("transaction has no network identifier".to_string()))
}

fn to_json<T: serde::Serialize>(field: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt(format!("{}: {}", field, e)))
}

impl Database {
    pub fn insert_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        let id = require_id(tx)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO transactions
             (transaction_id, address, proposer, payer, authorizers, code, arguments,
              reference_block_id, state, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                id.hex(),
                tx.address.to_string(),
                tx.proposer.to_string(),
                tx.payer.to_string(),
                to_json("authorizers", &tx.authorizers)?,
                tx.code,
                to_json("arguments", &tx.arguments)?,
                tx.reference_block_id.hex(),
                tx.state.to_string(),
                tx.error,
                timestamp(&tx.created_at),
                timestamp(&tx.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Updates the mutable columns. Missing rows are `StoreError::NotFound`.
    pub fn update_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        let id = require_id(tx)?;
        let conn = self.conn()?;

        let rows = conn.execute(
            "UPDATE transactions SET state = ?1, error = ?2, updated_at = ?3
             WHERE transaction_id = ?4",
            rusqlite::params![
                tx.state.to_string(),
                tx.error,
                timestamp(&tx.updated_at),
                id.hex(),
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Transactions of one account, newest first.
    pub fn list_transactions(
        &self,
        address: &FlowAddress,
        opts: ListOptions,
    ) -> Result<Vec<Transaction>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "{} WHERE address = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params![address.to_string(), opts.limit as i64, opts.offset as i64],
            read_row,
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(Transaction::try_from(row?)?);
        }
        Ok(out)
    }

    pub fn get_transaction(
        &self,
        address: &FlowAddress,
        transaction_id: &Identifier,
    ) -> Result<Transaction, StoreError> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE address = ?1 AND transaction_id = ?2", SELECT_COLUMNS);

        let row = match conn.query_row(
            &sql,
            rusqlite::params![address.to_string(), transaction_id.hex()],
            read_row,
        ) {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Transaction::try_from(row)
    }
}

impl TransactionStore for Database {
    fn insert_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        Database::insert_transaction(self, tx)
    }

    fn update_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        Database::update_transaction(self, tx)
    }

    fn transactions(
        &self,
        address: &FlowAddress,
        opts: ListOptions,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.list_transactions(address, opts)
    }

    fn transaction(
        &self,
        address: &FlowAddress,
        transaction_id: &Identifier,
    ) -> Result<Transaction, StoreError> {
        self.get_transaction(address, transaction_id)
    }
}
