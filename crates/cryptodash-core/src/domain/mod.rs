//! # Domain Models
//!
//! Validated value types shared by the adapters, the refreshers and the
//! wallet aggregator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PairSymbol`] | Exchange pair such as `BTCUSDT` |
//! | [`Candle`] | Daily OHLC interval |
//! | [`PricePoint`] | Dated price from a chart or index series |
//! | [`MarketSnapshot`] | One asset of the aggregator listing |
//! | [`Transfer`] | Native or token wallet transfer |
//! | [`WalletAddress`] | `0x`-prefixed 40 hex digit address |
//! | [`UtcDateTime`] | UTC timestamp |

mod candle;
mod market;
mod pair;
mod timestamp;
mod transfer;

pub use candle::{Candle, PricePoint};
pub use market::MarketSnapshot;
pub use pair::{is_tradable, PairSymbol, REFERENCE_QUOTE};
pub use timestamp::{parse_date, UtcDateTime};
pub use transfer::{shorten_address, TokenInfo, Transfer, TransferKind, WalletAddress};
