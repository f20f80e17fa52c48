//! Read-side computations over stored or freshly fetched series.
//!
//! | Item | Feeds |
//! |------|-------|
//! | [`PriceSummary`] | pair browser |
//! | [`market_table`] | live market table |
//! | [`market_cycles`] | BTC SMA 50/200 cycle chart |
//! | [`compare_returns`] | cumulative return comparison |

pub mod indicators;
mod cycles;
mod market_table;
mod returns;
mod summary;

pub use cycles::{
    load_market_cycles, market_cycles, CyclePoint, CycleReport, CycleSegment, CYCLE_CANDLE_LIMIT,
    CYCLE_TAIL,
};
pub use market_table::{abbreviate, format_percent, format_price, market_table, MarketRow, MarketTable};
pub use returns::{
    compare_returns, find_benchmark, relative_returns, Benchmark, ReturnPoint, ReturnSeries,
    BENCHMARKS,
};
pub use summary::{Crossover, PriceSummary};

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
