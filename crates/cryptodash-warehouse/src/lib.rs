//! # Cryptodash Warehouse
//!
//! DuckDB-backed local stores for the cryptodash refresh pipelines.
//!
//! | Store | File | Tables |
//! |-------|------|--------|
//! | [`CandleStore`] | `candles.duckdb` | one `pair_<SYMBOL>` table per trading pair |
//! | [`MarketStore`] | `markets.duckdb` | `markets` keyed by asset id |
//!
//! Both files also carry `schema_migrations` and an `ingest_log` audit table.
//! Each logical unit of a refresh (one pair, one page) is written in a single
//! transaction, so a failed unit leaves the store exactly as it was.
//!
//! All values are bound as query parameters. The only identifier built from
//! input is the pair table name, and it is checked by [`pair_table_name`].

pub mod candles;
pub mod duckdb;
pub mod markets;
mod migrations;

use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use thiserror::Error;

pub use candles::{CandleBounds, CandleRecord, CandleStore};
pub use duckdb::DuckDbConnectionManager;
pub use markets::{MarketRecord, MarketStore};

const PAIR_TABLE_PREFIX: &str = "pair_";
const MAX_PAIR_SYMBOL_LEN: usize = 32;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (creating the store directory).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A pair symbol that cannot be used as a table name.
    #[error("invalid pair symbol '{0}' (expected 1-32 uppercase ASCII letters or digits)")]
    InvalidPair(String),

    /// Requested pair has no table in the candle store.
    #[error("pair '{0}' has no stored candles")]
    UnknownPair(String),
}

/// Locations of the two store files.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for cryptodash data.
    pub home: PathBuf,
    /// Path to the candle store.
    pub candles_db: PathBuf,
    /// Path to the market store.
    pub markets_db: PathBuf,
    /// Maximum number of idle connections kept per store.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    /// Default layout under a home directory.
    pub fn under(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            candles_db: home.join("candles.duckdb"),
            markets_db: home.join("markets.duckdb"),
            home,
            max_pool_size: 4,
        }
    }

    pub fn open_candles(&self) -> Result<CandleStore, WarehouseError> {
        CandleStore::open(&self.candles_db, self.max_pool_size)
    }

    pub fn open_markets(&self) -> Result<MarketStore, WarehouseError> {
        MarketStore::open(&self.markets_db, self.max_pool_size)
    }
}

/// Table name for a pair symbol, rejecting anything that is not plain
/// uppercase alphanumerics.
pub fn pair_table_name(symbol: &str) -> Result<String, WarehouseError> {
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_PAIR_SYMBOL_LEN
        && symbol
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit());
    if !valid {
        return Err(WarehouseError::InvalidPair(symbol.to_owned()));
    }
    Ok(format!("{PAIR_TABLE_PREFIX}{symbol}"))
}

fn open_manager(
    path: &Path,
    max_pool_size: usize,
    migrations: &[migrations::Migration],
) -> Result<DuckDbConnectionManager, WarehouseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let manager = DuckDbConnectionManager::open(path, max_pool_size)?;
    manager.with_connection(|connection| migrations::apply_migrations(connection, migrations))?;
    Ok(manager)
}

/// Run `work` inside `BEGIN`/`COMMIT`, rolling back when it fails.
fn in_transaction<T>(
    connection: &Connection,
    work: impl FnOnce() -> Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    connection.execute_batch("BEGIN TRANSACTION")?;
    finalize_transaction(connection, work())
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn insert_ingest_log(
    connection: &Connection,
    run_id: &str,
    dataset: &str,
    unit: &str,
    status: &str,
    row_count: usize,
    detail: Option<&str>,
) -> Result<(), WarehouseError> {
    let row_count = i64::try_from(row_count).unwrap_or(i64::MAX);
    let params: [&dyn ToSql; 6] = [&run_id, &dataset, &unit, &status, &row_count, &detail];
    connection.execute(
        "INSERT INTO ingest_log (run_id, dataset, unit, status, row_count, detail, timestamp) \
         VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
        params.as_slice(),
    )?;
    Ok(())
}

fn count_ingest_log(connection: &Connection, run_id: &str, status: &str) -> Result<usize, WarehouseError> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM ingest_log WHERE run_id = ? AND status = ?",
        [run_id, status],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or(0))
}
