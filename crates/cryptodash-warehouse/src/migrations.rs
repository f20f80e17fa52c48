use ::duckdb::Connection;

pub(crate) struct Migration {
    version: &'static str,
    sql: &'static str,
}

const INGEST_LOG: Migration = Migration {
    version: "0001_ingest_log",
    sql: r#"
CREATE TABLE IF NOT EXISTS ingest_log (
    run_id TEXT NOT NULL,
    dataset TEXT NOT NULL,
    unit TEXT NOT NULL,
    status TEXT NOT NULL,
    row_count BIGINT NOT NULL DEFAULT 0,
    detail TEXT,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
};

/// The candle store keeps one table per pair; those are created on demand.
pub(crate) const CANDLE_MIGRATIONS: &[Migration] = &[INGEST_LOG];

pub(crate) const MARKET_MIGRATIONS: &[Migration] = &[
    INGEST_LOG,
    Migration {
        version: "0002_markets",
        sql: r#"
CREATE TABLE IF NOT EXISTS markets (
    id TEXT PRIMARY KEY,
    symbol TEXT,
    name TEXT,
    image TEXT,
    current_price DOUBLE,
    market_cap DOUBLE,
    market_cap_rank BIGINT,
    fully_diluted_valuation DOUBLE,
    total_volume DOUBLE,
    high_24h DOUBLE,
    low_24h DOUBLE,
    price_change_24h DOUBLE,
    price_change_percentage_24h DOUBLE,
    market_cap_change_24h DOUBLE,
    market_cap_change_percentage_24h DOUBLE,
    circulating_supply DOUBLE,
    total_supply DOUBLE,
    max_supply DOUBLE,
    ath DOUBLE,
    ath_change_percentage DOUBLE,
    ath_date TEXT,
    atl DOUBLE,
    atl_change_percentage DOUBLE,
    atl_date TEXT,
    last_updated TEXT,
    price_change_percentage_14d_in_currency DOUBLE,
    price_change_percentage_1h_in_currency DOUBLE,
    price_change_percentage_1y_in_currency DOUBLE,
    price_change_percentage_200d_in_currency DOUBLE,
    price_change_percentage_24h_in_currency DOUBLE,
    price_change_percentage_30d_in_currency DOUBLE,
    price_change_percentage_7d_in_currency DOUBLE
);
"#,
    },
    Migration {
        version: "0003_markets_rank_index",
        sql: "CREATE INDEX IF NOT EXISTS idx_markets_rank ON markets(market_cap_rank);",
    },
];

pub(crate) fn apply_migrations(
    connection: &Connection,
    migrations: &[Migration],
) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in migrations {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
