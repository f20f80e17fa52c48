//! # Cryptodash Core
//!
//! Market data pipelines, wallet aggregation and analytics for the cryptodash
//! dashboard backend.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Binance, CoinGecko, Etherscan and Yahoo adapters |
//! | [`analytics`] | Price summaries, market table, BTC cycles, return comparison |
//! | [`config`] | File and environment configuration |
//! | [`data_source`] | Source traits and structured source errors |
//! | [`domain`] | Pairs, candles, market snapshots, transfers, timestamps |
//! | [`error`] | Core error types |
//! | [`flow`] | Sankey-style flow diagrams for wallets |
//! | [`http_client`] | HTTP client abstraction |
//! | [`pagination`] | Block-cursor scan state machine for wallet history |
//! | [`provider_policy`] | Per-provider request budgets |
//! | [`refresh`] | Candle and market refresh pipelines |
//! | [`schedule`] | Wake times for the refresh loops |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Token-bucket pacing |
//! | [`wallet`] | Wallet transfer normalization and aggregation |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Daemon   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Refreshers /    │────▶│ Pacer (governor) │
//! │ Wallet scan     │     └──────────────────┘
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Source traits   │────▶│ HTTP Client      │
//! │ (adapters)      │     │ (reqwest)        │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ DuckDB stores   │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use cryptodash_core::{SourceError, SourceErrorKind};
//!
//! fn handle_error(error: SourceError) {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => {
//!             // Skip this unit; the next run picks it up
//!         }
//!         SourceErrorKind::InvalidRequest => {
//!             // Report to user
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod adapters;
pub mod analytics;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod flow;
pub mod http_client;
pub mod pagination;
pub mod provider_policy;
pub mod refresh;
pub mod schedule;
pub mod source;
pub mod throttling;
pub mod wallet;

// Adapter implementations
pub use adapters::{BinanceAdapter, CoingeckoAdapter, EtherscanAdapter, YahooAdapter};

// Analytics
pub use analytics::{
    compare_returns, load_market_cycles, market_cycles, market_table, relative_returns,
    Crossover, CycleReport, MarketRow, MarketTable, PriceSummary, ReturnSeries,
};

pub use config::Config;

// Source traits and errors
pub use data_source::{
    ExchangeSource, MarketSource, PriceHistorySource, SourceError, SourceErrorKind, SourceFuture,
    TransferPage, WalletSource,
};

// Domain models
pub use domain::{
    is_tradable, parse_date, shorten_address, Candle, MarketSnapshot, PairSymbol, PricePoint,
    TokenInfo, Transfer, TransferKind, UtcDateTime, WalletAddress, REFERENCE_QUOTE,
};

// Error types
pub use error::{CoreError, ValidationError};

pub use flow::{counterparty_flow, token_flow, FlowDiagram, FlowLink, FlowNode};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use pagination::{next_state, scan_transfers, ScanError, ScanResult, ScanState, Termination};

pub use provider_policy::ProviderPolicy;

pub use refresh::{
    CandleRefreshReport, CandleRefresher, MarketRefreshReport, MarketRefresher, UnitFailure,
};

pub use schedule::Schedule;

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::{Pacer, PacingClock};

pub use wallet::{explore_wallet, HoldingsSummary, WalletQuery, WalletReport, WalletTransfer};

// Warehouse (re-exported from cryptodash-warehouse)
pub use cryptodash_warehouse::{
    CandleRecord, CandleStore, MarketRecord, MarketStore, WarehouseConfig, WarehouseError,
};
