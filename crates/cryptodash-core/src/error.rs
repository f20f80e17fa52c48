use thiserror::Error;

/// Validation errors raised when constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("pair symbol cannot be empty")]
    EmptyPair,
    #[error("pair symbol length {len} exceeds max {max}")]
    PairTooLong { len: usize, max: usize },
    #[error("pair symbol contains invalid character '{ch}' at index {index}")]
    PairInvalidChar { ch: char, index: usize },

    #[error("wallet address must match ^0x[0-9a-fA-F]{{40}}$: '{value}'")]
    InvalidAddress { value: String },

    #[error("ticker cannot be empty")]
    EmptyTicker,

    #[error("invalid source '{value}', expected one of binance, coingecko, etherscan, yahoo")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("date range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("schedule time {hour:02}:{minute:02} is not a valid UTC wall-clock time")]
    InvalidWallClock { hour: u8, minute: u8 },
    #[error("schedule interval must be greater than zero")]
    ZeroInterval,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Source(#[from] crate::data_source::SourceError),

    #[error(transparent)]
    Scan(#[from] crate::pagination::ScanError),

    #[error(transparent)]
    Warehouse(#[from] cryptodash_warehouse::WarehouseError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
