use cryptodash_warehouse::CandleRecord;
use serde::{Deserialize, Serialize};

use crate::{UtcDateTime, ValidationError};

/// One daily OHLC interval for a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: UtcDateTime,
    pub trade_count: u64,
}

impl Candle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        open_time: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: UtcDateTime,
        trade_count: u64,
    ) -> Result<Self, ValidationError> {
        validate_finite("open", open)?;
        validate_finite("high", high)?;
        validate_finite("low", low)?;
        validate_finite("close", close)?;
        validate_finite("volume", volume)?;

        Ok(Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
            trade_count,
        })
    }

    /// A candle whose interval has not ended yet at `now`.
    pub fn is_provisional(&self, now: UtcDateTime) -> bool {
        self.close_time > now
    }

    pub fn to_record(&self) -> CandleRecord {
        CandleRecord {
            open_time_ms: self.open_time.unix_millis(),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            close_time_ms: self.close_time.unix_millis(),
            trade_count: i64::try_from(self.trade_count).unwrap_or(i64::MAX),
        }
    }

    pub fn from_record(record: &CandleRecord) -> Result<Self, ValidationError> {
        Ok(Self {
            open_time: UtcDateTime::from_unix_millis(record.open_time_ms)?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
            close_time: UtcDateTime::from_unix_millis(record.close_time_ms)?,
            trade_count: u64::try_from(record.trade_count).unwrap_or(0),
        })
    }
}

/// A single dated value, used for chart prices and index closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: UtcDateTime,
    pub value: f64,
}

impl PricePoint {
    pub fn new(time: UtcDateTime, value: f64) -> Result<Self, ValidationError> {
        validate_finite("value", value)?;
        Ok(Self { time, value })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFiniteValue { field })
    }
}
