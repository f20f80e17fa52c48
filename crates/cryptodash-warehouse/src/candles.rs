//! Candle store: one append-only candle table per trading pair.
//!
//! Times cross this boundary as epoch milliseconds and are stored as
//! `TIMESTAMP` columns. `open_time` is the primary key of every pair table.

use std::path::Path;

use ::duckdb::{Connection, ToSql};
use serde::Serialize;
use tracing::debug;

use crate::{
    count_ingest_log, in_transaction, insert_ingest_log, open_manager, pair_table_name,
    DuckDbConnectionManager, WarehouseError, PAIR_TABLE_PREFIX,
};

const DATASET: &str = "candles";

/// One stored daily candle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleRecord {
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time_ms: i64,
    pub trade_count: i64,
}

/// Open and close time of a stored candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleBounds {
    pub open_time_ms: i64,
    pub close_time_ms: i64,
}

#[derive(Clone)]
pub struct CandleStore {
    manager: DuckDbConnectionManager,
}

impl CandleStore {
    pub fn open(path: &Path, max_pool_size: usize) -> Result<Self, WarehouseError> {
        let manager = open_manager(path, max_pool_size, crate::migrations::CANDLE_MIGRATIONS)?;
        Ok(Self { manager })
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Create the pair table if it does not exist yet.
    pub fn ensure_pair_table(&self, symbol: &str) -> Result<(), WarehouseError> {
        let table = pair_table_name(symbol)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                open_time TIMESTAMP PRIMARY KEY, \
                open DOUBLE NOT NULL, \
                high DOUBLE NOT NULL, \
                low DOUBLE NOT NULL, \
                close DOUBLE NOT NULL, \
                volume DOUBLE NOT NULL, \
                close_time TIMESTAMP NOT NULL, \
                trade_count BIGINT NOT NULL\
            )"
        );
        self.manager
            .with_connection(|connection| connection.execute_batch(ddl.as_str()))?;
        Ok(())
    }

    pub fn has_pair(&self, symbol: &str) -> Result<bool, WarehouseError> {
        let table = pair_table_name(symbol)?;
        self.manager.with_connection(|connection| {
            let count: i64 = connection.query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                [table.as_str()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Symbols of every pair that has a table, sorted.
    pub fn list_pairs(&self) -> Result<Vec<String>, WarehouseError> {
        self.manager.with_connection(|connection| {
            let mut statement = connection.prepare(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_name LIKE 'pair%' ORDER BY table_name",
            )?;
            let names = statement.query_map([], |row| row.get::<_, String>(0))?;

            let mut pairs = Vec::new();
            for name in names {
                let name = name?;
                if let Some(symbol) = name.strip_prefix(PAIR_TABLE_PREFIX) {
                    pairs.push(symbol.to_owned());
                }
            }
            Ok(pairs)
        })
    }

    /// Newest stored candle of a pair, or `None` when the table is empty.
    pub fn latest_candle(&self, symbol: &str) -> Result<Option<CandleBounds>, WarehouseError> {
        let table = self.existing_table(symbol)?;
        let sql = format!(
            "SELECT epoch_ms(open_time), epoch_ms(close_time) FROM {table} \
             ORDER BY open_time DESC LIMIT 1"
        );
        self.manager.with_connection(|connection| {
            let mut statement = connection.prepare(sql.as_str())?;
            let mut rows = statement.query([])?;
            match rows.next()? {
                Some(row) => Ok(Some(CandleBounds {
                    open_time_ms: row.get(0)?,
                    close_time_ms: row.get(1)?,
                })),
                None => Ok(None),
            }
        })
    }

    /// Earliest and latest close time of a pair.
    pub fn close_time_bounds(&self, symbol: &str) -> Result<Option<(i64, i64)>, WarehouseError> {
        let table = self.existing_table(symbol)?;
        let sql = format!(
            "SELECT epoch_ms(MIN(close_time)), epoch_ms(MAX(close_time)) FROM {table}"
        );
        self.manager.with_connection(|connection| {
            let (min, max): (Option<i64>, Option<i64>) =
                connection.query_row(sql.as_str(), [], |row| Ok((row.get(0)?, row.get(1)?)))?;
            Ok(min.zip(max))
        })
    }

    /// Append candles in one transaction and record the run in `ingest_log`.
    ///
    /// Rows must be newer than everything already stored; a duplicate
    /// `open_time` violates the primary key and rolls the whole batch back.
    pub fn append_candles(
        &self,
        run_id: &str,
        symbol: &str,
        rows: &[CandleRecord],
    ) -> Result<usize, WarehouseError> {
        let table = pair_table_name(symbol)?;
        let insert_sql = format!(
            "INSERT INTO {table} \
             (open_time, open, high, low, close, volume, close_time, trade_count) \
             VALUES (epoch_ms(CAST(? AS BIGINT)), ?, ?, ?, ?, ?, epoch_ms(CAST(? AS BIGINT)), ?)"
        );

        self.manager.with_connection(|connection| {
            in_transaction(connection, || {
                for row in rows {
                    let params: [&dyn ToSql; 8] = [
                        &row.open_time_ms,
                        &row.open,
                        &row.high,
                        &row.low,
                        &row.close,
                        &row.volume,
                        &row.close_time_ms,
                        &row.trade_count,
                    ];
                    connection.execute(insert_sql.as_str(), params.as_slice())?;
                }
                insert_ingest_log(connection, run_id, DATASET, symbol, "ok", rows.len(), None)?;
                Ok(rows.len())
            })
        })?;

        debug!(pair = symbol, rows = rows.len(), "appended candles");
        Ok(rows.len())
    }

    /// Record a pair that failed during a run.
    pub fn record_failure(&self, run_id: &str, symbol: &str, detail: &str) -> Result<(), WarehouseError> {
        self.manager.with_connection(|connection| {
            insert_ingest_log(connection, run_id, DATASET, symbol, "error", 0, Some(detail))
        })
    }

    pub fn failures_in_run(&self, run_id: &str) -> Result<usize, WarehouseError> {
        self.manager
            .with_connection(|connection| count_ingest_log(connection, run_id, "error"))
    }

    /// All candles of a pair in open-time order.
    pub fn candles(&self, symbol: &str) -> Result<Vec<CandleRecord>, WarehouseError> {
        let table = self.existing_table(symbol)?;
        let sql = format!("{SELECT_COLUMNS} FROM {table} ORDER BY open_time");
        self.manager
            .with_connection(|connection| read_candles(connection, sql.as_str(), &[]))
    }

    /// Candles whose close time falls in `[from_ms, to_ms]`.
    pub fn query_range(
        &self,
        symbol: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<CandleRecord>, WarehouseError> {
        let table = self.existing_table(symbol)?;
        let sql = format!(
            "{SELECT_COLUMNS} FROM {table} \
             WHERE close_time BETWEEN epoch_ms(CAST(? AS BIGINT)) AND epoch_ms(CAST(? AS BIGINT)) \
             ORDER BY open_time"
        );
        let params: [&dyn ToSql; 2] = [&from_ms, &to_ms];
        self.manager
            .with_connection(|connection| read_candles(connection, sql.as_str(), &params))
    }

    pub fn count(&self, symbol: &str) -> Result<usize, WarehouseError> {
        let table = self.existing_table(symbol)?;
        let sql = format!("SELECT COUNT(*) FROM {table}");
        self.manager.with_connection(|connection| {
            let count: i64 = connection.query_row(sql.as_str(), [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    fn existing_table(&self, symbol: &str) -> Result<String, WarehouseError> {
        let table = pair_table_name(symbol)?;
        if !self.has_pair(symbol)? {
            return Err(WarehouseError::UnknownPair(symbol.to_owned()));
        }
        Ok(table)
    }
}

const SELECT_COLUMNS: &str =
    "SELECT epoch_ms(open_time), open, high, low, close, volume, epoch_ms(close_time), trade_count";

fn read_candles(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<CandleRecord>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let rows = statement.query_map(params, |row| {
        Ok(CandleRecord {
            open_time_ms: row.get(0)?,
            open: row.get(1)?,
            high: row.get(2)?,
            low: row.get(3)?,
            close: row.get(4)?,
            volume: row.get(5)?,
            close_time_ms: row.get(6)?,
            trade_count: row.get(7)?,
        })
    })?;

    let mut candles = Vec::new();
    for row in rows {
        candles.push(row?);
    }
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DAY_MS: i64 = 86_400_000;

    fn candle(day: i64) -> CandleRecord {
        CandleRecord {
            open_time_ms: day * DAY_MS,
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            volume: 1_500.5,
            close_time_ms: (day + 1) * DAY_MS - 1,
            trade_count: 42,
        }
    }

    #[test]
    fn empty_pair_has_no_latest_candle() {
        let temp = tempdir().expect("tempdir");
        let store = CandleStore::open(&temp.path().join("candles.duckdb"), 2).expect("open");

        store.ensure_pair_table("BTCUSDT").expect("table");
        assert_eq!(store.latest_candle("BTCUSDT").expect("latest"), None);
        assert_eq!(store.close_time_bounds("BTCUSDT").expect("bounds"), None);
        assert_eq!(store.list_pairs().expect("pairs"), vec![String::from("BTCUSDT")]);
    }

    #[test]
    fn appended_candles_round_trip_through_timestamps() {
        let temp = tempdir().expect("tempdir");
        let store = CandleStore::open(&temp.path().join("candles.duckdb"), 2).expect("open");
        store.ensure_pair_table("ETHUSDT").expect("table");

        let rows = vec![candle(17_500), candle(17_501)];
        let inserted = store.append_candles("run-1", "ETHUSDT", &rows).expect("append");
        assert_eq!(inserted, 2);

        assert_eq!(store.candles("ETHUSDT").expect("read"), rows);
        assert_eq!(
            store.latest_candle("ETHUSDT").expect("latest"),
            Some(CandleBounds {
                open_time_ms: 17_501 * DAY_MS,
                close_time_ms: 17_502 * DAY_MS - 1,
            })
        );

        let ranged = store
            .query_range("ETHUSDT", 17_501 * DAY_MS, 17_503 * DAY_MS)
            .expect("range");
        assert_eq!(ranged, vec![candle(17_501)]);
    }

    #[test]
    fn duplicate_open_time_rolls_back_the_batch() {
        let temp = tempdir().expect("tempdir");
        let store = CandleStore::open(&temp.path().join("candles.duckdb"), 2).expect("open");
        store.ensure_pair_table("BNBUSDT").expect("table");
        store
            .append_candles("run-1", "BNBUSDT", &[candle(1)])
            .expect("first append");

        let error = store
            .append_candles("run-2", "BNBUSDT", &[candle(2), candle(1)])
            .expect_err("duplicate must fail");
        assert!(matches!(error, WarehouseError::DuckDb(_)));
        assert_eq!(store.count("BNBUSDT").expect("count"), 1);
    }

    #[test]
    fn unknown_pair_is_reported() {
        let temp = tempdir().expect("tempdir");
        let store = CandleStore::open(&temp.path().join("candles.duckdb"), 2).expect("open");

        let error = store.candles("XRPUSDT").expect_err("no table");
        assert!(matches!(error, WarehouseError::UnknownPair(_)));
    }

    #[test]
    fn failures_are_counted_per_run() {
        let temp = tempdir().expect("tempdir");
        let store = CandleStore::open(&temp.path().join("candles.duckdb"), 2).expect("open");

        store.record_failure("run-9", "ADAUSDT", "timeout").expect("log");
        assert_eq!(store.failures_in_run("run-9").expect("count"), 1);
        assert_eq!(store.failures_in_run("run-10").expect("count"), 0);
    }
}
