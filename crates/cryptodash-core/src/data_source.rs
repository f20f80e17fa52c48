//! Upstream source contracts and their error type.
//!
//! Each pipeline talks to its provider through a narrow trait so the
//! refreshers and the wallet scan can be driven by scripted fakes in tests.
//!
//! | Trait | Provider | Used by |
//! |-------|----------|---------|
//! | [`ExchangeSource`] | Binance | candle refresher, cycles |
//! | [`MarketSource`] | CoinGecko | market refresher, cycles |
//! | [`WalletSource`] | Etherscan | wallet scan |
//! | [`PriceHistorySource`] | Yahoo Finance | compare returns |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::{
    Candle, MarketSnapshot, PairSymbol, PricePoint, ProviderId, Transfer, TransferKind,
    UtcDateTime, WalletAddress,
};

/// Boxed future returned by every source method.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Internal,
}

/// Structured error returned by adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// One wallet history response.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferPage {
    /// Transfers in ascending block order; empty when nothing is left.
    Items(Vec<Transfer>),
    /// Upstream answered with a non-success HTTP status other than 429.
    Status(u16),
}

/// Spot exchange listing and daily candles.
pub trait ExchangeSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Pairs that pass the tradable filter, in listing order.
    fn trading_pairs<'a>(&'a self) -> SourceFuture<'a, Vec<PairSymbol>>;

    /// Up to `limit` daily candles opening at or after `start`. Without a
    /// start the most recent `limit` candles are returned.
    fn daily_candles<'a>(
        &'a self,
        pair: &'a PairSymbol,
        start: Option<UtcDateTime>,
        limit: usize,
    ) -> SourceFuture<'a, Vec<Candle>>;
}

/// Aggregator market listing.
pub trait MarketSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// One page (1-based) of the listing ordered by market cap.
    fn markets_page<'a>(&'a self, page: u32, per_page: u32) -> SourceFuture<'a, Vec<MarketSnapshot>>;

    /// Full daily USD price history for one coin id.
    fn daily_prices<'a>(&'a self, coin_id: &'a str) -> SourceFuture<'a, Vec<PricePoint>>;
}

/// Wallet transfer history and balance.
pub trait WalletSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Transfers with `block_number >= start_block`, ascending, at most `cap`.
    /// HTTP 429 and upstream rate-limit messages surface as
    /// [`SourceErrorKind::RateLimited`].
    fn transfers_page<'a>(
        &'a self,
        kind: TransferKind,
        address: &'a WalletAddress,
        start_block: u64,
        cap: usize,
    ) -> SourceFuture<'a, TransferPage>;

    /// Native balance in ether.
    fn balance<'a>(&'a self, address: &'a WalletAddress) -> SourceFuture<'a, f64>;
}

/// Daily closes for equity indexes, commodities and coins.
pub trait PriceHistorySource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn daily_closes<'a>(
        &'a self,
        ticker: &'a str,
        start: Date,
        end: Date,
    ) -> SourceFuture<'a, Vec<PricePoint>>;
}
