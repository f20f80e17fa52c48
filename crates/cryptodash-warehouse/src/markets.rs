//! Market store: the latest market snapshot, one row per asset id.

use std::path::Path;

use ::duckdb::{Row, ToSql};
use serde::Serialize;
use tracing::debug;

use crate::{
    count_ingest_log, in_transaction, insert_ingest_log, open_manager, DuckDbConnectionManager,
    WarehouseError,
};

const DATASET: &str = "markets";

const COLUMNS: &str = "id, symbol, name, image, current_price, market_cap, market_cap_rank, \
    fully_diluted_valuation, total_volume, high_24h, low_24h, price_change_24h, \
    price_change_percentage_24h, market_cap_change_24h, market_cap_change_percentage_24h, \
    circulating_supply, total_supply, max_supply, ath, ath_change_percentage, ath_date, atl, \
    atl_change_percentage, atl_date, last_updated, price_change_percentage_14d_in_currency, \
    price_change_percentage_1h_in_currency, price_change_percentage_1y_in_currency, \
    price_change_percentage_200d_in_currency, price_change_percentage_24h_in_currency, \
    price_change_percentage_30d_in_currency, price_change_percentage_7d_in_currency";

/// One row of the `markets` table. Every metric may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketRecord {
    pub id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i64>,
    pub fully_diluted_valuation: Option<f64>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h: Option<f64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<String>,
    pub last_updated: Option<String>,
    pub price_change_percentage_14d_in_currency: Option<f64>,
    pub price_change_percentage_1h_in_currency: Option<f64>,
    pub price_change_percentage_1y_in_currency: Option<f64>,
    pub price_change_percentage_200d_in_currency: Option<f64>,
    pub price_change_percentage_24h_in_currency: Option<f64>,
    pub price_change_percentage_30d_in_currency: Option<f64>,
    pub price_change_percentage_7d_in_currency: Option<f64>,
}

impl MarketRecord {
    fn params(&self) -> [&dyn ToSql; 32] {
        [
            &self.id,
            &self.symbol,
            &self.name,
            &self.image,
            &self.current_price,
            &self.market_cap,
            &self.market_cap_rank,
            &self.fully_diluted_valuation,
            &self.total_volume,
            &self.high_24h,
            &self.low_24h,
            &self.price_change_24h,
            &self.price_change_percentage_24h,
            &self.market_cap_change_24h,
            &self.market_cap_change_percentage_24h,
            &self.circulating_supply,
            &self.total_supply,
            &self.max_supply,
            &self.ath,
            &self.ath_change_percentage,
            &self.ath_date,
            &self.atl,
            &self.atl_change_percentage,
            &self.atl_date,
            &self.last_updated,
            &self.price_change_percentage_14d_in_currency,
            &self.price_change_percentage_1h_in_currency,
            &self.price_change_percentage_1y_in_currency,
            &self.price_change_percentage_200d_in_currency,
            &self.price_change_percentage_24h_in_currency,
            &self.price_change_percentage_30d_in_currency,
            &self.price_change_percentage_7d_in_currency,
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, ::duckdb::Error> {
        Ok(Self {
            id: row.get(0)?,
            symbol: row.get(1)?,
            name: row.get(2)?,
            image: row.get(3)?,
            current_price: row.get(4)?,
            market_cap: row.get(5)?,
            market_cap_rank: row.get(6)?,
            fully_diluted_valuation: row.get(7)?,
            total_volume: row.get(8)?,
            high_24h: row.get(9)?,
            low_24h: row.get(10)?,
            price_change_24h: row.get(11)?,
            price_change_percentage_24h: row.get(12)?,
            market_cap_change_24h: row.get(13)?,
            market_cap_change_percentage_24h: row.get(14)?,
            circulating_supply: row.get(15)?,
            total_supply: row.get(16)?,
            max_supply: row.get(17)?,
            ath: row.get(18)?,
            ath_change_percentage: row.get(19)?,
            ath_date: row.get(20)?,
            atl: row.get(21)?,
            atl_change_percentage: row.get(22)?,
            atl_date: row.get(23)?,
            last_updated: row.get(24)?,
            price_change_percentage_14d_in_currency: row.get(25)?,
            price_change_percentage_1h_in_currency: row.get(26)?,
            price_change_percentage_1y_in_currency: row.get(27)?,
            price_change_percentage_200d_in_currency: row.get(28)?,
            price_change_percentage_24h_in_currency: row.get(29)?,
            price_change_percentage_30d_in_currency: row.get(30)?,
            price_change_percentage_7d_in_currency: row.get(31)?,
        })
    }
}

#[derive(Clone)]
pub struct MarketStore {
    manager: DuckDbConnectionManager,
}

impl MarketStore {
    pub fn open(path: &Path, max_pool_size: usize) -> Result<Self, WarehouseError> {
        let manager = open_manager(path, max_pool_size, crate::migrations::MARKET_MIGRATIONS)?;
        Ok(Self { manager })
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Upsert one page of rows by id in a single transaction.
    pub fn upsert_page(
        &self,
        run_id: &str,
        page: u32,
        rows: &[MarketRecord],
    ) -> Result<usize, WarehouseError> {
        let placeholders = vec!["?"; 32].join(", ");
        let upsert_sql = format!("INSERT OR REPLACE INTO markets ({COLUMNS}) VALUES ({placeholders})");
        let unit = format!("page-{page}");

        self.manager.with_connection(|connection| {
            in_transaction(connection, || {
                for row in rows {
                    let params = row.params();
                    connection.execute(upsert_sql.as_str(), params.as_slice())?;
                }
                insert_ingest_log(connection, run_id, DATASET, &unit, "ok", rows.len(), None)?;
                Ok(())
            })
        })?;

        debug!(page, rows = rows.len(), "upserted market page");
        Ok(rows.len())
    }

    pub fn record_failure(&self, run_id: &str, page: u32, detail: &str) -> Result<(), WarehouseError> {
        let unit = format!("page-{page}");
        self.manager.with_connection(|connection| {
            insert_ingest_log(connection, run_id, DATASET, &unit, "error", 0, Some(detail))
        })
    }

    pub fn failures_in_run(&self, run_id: &str) -> Result<usize, WarehouseError> {
        self.manager
            .with_connection(|connection| count_ingest_log(connection, run_id, "error"))
    }

    /// Every row ordered by market cap rank; unranked assets come last.
    pub fn all_rows(&self) -> Result<Vec<MarketRecord>, WarehouseError> {
        let sql = format!("SELECT {COLUMNS} FROM markets ORDER BY market_cap_rank ASC NULLS LAST, id");
        self.manager.with_connection(|connection| {
            let mut statement = connection.prepare(sql.as_str())?;
            let rows = statement.query_map([], MarketRecord::from_row)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<MarketRecord>, WarehouseError> {
        let sql = format!("SELECT {COLUMNS} FROM markets WHERE id = ?");
        self.manager.with_connection(|connection| {
            let mut statement = connection.prepare(sql.as_str())?;
            let mut rows = statement.query([id])?;
            match rows.next()? {
                Some(row) => Ok(Some(MarketRecord::from_row(row)?)),
                None => Ok(None),
            }
        })
    }

    pub fn count(&self) -> Result<usize, WarehouseError> {
        self.manager.with_connection(|connection| {
            let count: i64 = connection.query_row("SELECT COUNT(*) FROM markets", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn bitcoin(price: f64) -> MarketRecord {
        MarketRecord {
            id: String::from("bitcoin"),
            symbol: Some(String::from("btc")),
            name: Some(String::from("Bitcoin")),
            current_price: Some(price),
            market_cap_rank: Some(1),
            max_supply: Some(21_000_000.0),
            last_updated: Some(String::from("2024-03-01T12:00:00.000Z")),
            ..MarketRecord::default()
        }
    }

    #[test]
    fn upsert_replaces_existing_row_by_id() {
        let temp = tempdir().expect("tempdir");
        let store = MarketStore::open(&temp.path().join("markets.duckdb"), 2).expect("open");

        store.upsert_page("run-1", 1, &[bitcoin(60_000.0)]).expect("first");
        store.upsert_page("run-2", 1, &[bitcoin(61_500.0)]).expect("second");

        assert_eq!(store.count().expect("count"), 1);
        let row = store.get("bitcoin").expect("get").expect("row");
        assert_eq!(row.current_price, Some(61_500.0));
        assert_eq!(row.ath, None);
    }

    #[test]
    fn rows_are_ordered_by_rank_with_unranked_last() {
        let temp = tempdir().expect("tempdir");
        let store = MarketStore::open(&temp.path().join("markets.duckdb"), 2).expect("open");

        let unranked = MarketRecord {
            id: String::from("newcoin"),
            ..MarketRecord::default()
        };
        let ether = MarketRecord {
            id: String::from("ethereum"),
            market_cap_rank: Some(2),
            ..MarketRecord::default()
        };
        store
            .upsert_page("run-1", 1, &[unranked, ether, bitcoin(1.0)])
            .expect("upsert");

        let ids: Vec<String> = store
            .all_rows()
            .expect("rows")
            .into_iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "newcoin"]);
    }

    #[test]
    fn reopening_the_store_keeps_rows_and_migrations() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("markets.duckdb");
        {
            let store = MarketStore::open(&path, 1).expect("open");
            store.upsert_page("run-1", 1, &[bitcoin(5.0)]).expect("upsert");
        }

        let reopened = MarketStore::open(&path, 1).expect("reopen");
        assert_eq!(reopened.count().expect("count"), 1);
    }
}
