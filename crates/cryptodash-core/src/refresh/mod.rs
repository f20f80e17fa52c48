//! Background refresh pipelines that persist upstream data into the
//! warehouse stores.

pub mod candles;
pub mod markets;

use serde::Serialize;
use uuid::Uuid;

pub use candles::{select_new_candles, CandleRefreshReport, CandleRefreshSettings, CandleRefresher};
pub use markets::{MarketRefreshReport, MarketRefreshSettings, MarketRefresher};

/// A unit of work (one pair, one page) that failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub unit: String,
    pub error: String,
}

fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}
