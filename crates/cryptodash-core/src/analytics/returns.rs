use serde::Serialize;
use time::Date;
use tracing::debug;

use super::round2;
use crate::data_source::{PriceHistorySource, SourceError};
use crate::throttling::{Pacer, PacingClock};
use crate::{PricePoint, ValidationError};

/// Ticker offered by the comparison view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Benchmark {
    pub ticker: &'static str,
    pub name: &'static str,
}

pub const BENCHMARKS: [Benchmark; 18] = [
    Benchmark { ticker: "^GSPC", name: "S&P 500" },
    Benchmark { ticker: "^IXIC", name: "NASDAQ" },
    Benchmark { ticker: "^DJI", name: "Dow Jones Industrial" },
    Benchmark { ticker: "^STOXX", name: "Stoxx 600" },
    Benchmark { ticker: "^FTSE", name: "FTSE 100" },
    Benchmark { ticker: "000001.SS", name: "Shanghai SE" },
    Benchmark { ticker: "GC=F", name: "Gold" },
    Benchmark { ticker: "SI=F", name: "Silver" },
    Benchmark { ticker: "BTC-USD", name: "Bitcoin" },
    Benchmark { ticker: "ETH-USD", name: "Ethereum" },
    Benchmark { ticker: "BNB-USD", name: "Binance Coin" },
    Benchmark { ticker: "XRP-USD", name: "Ripple" },
    Benchmark { ticker: "ADA-USD", name: "Cardano" },
    Benchmark { ticker: "DOGE-USD", name: "Dogecoin" },
    Benchmark { ticker: "MATIC-USD", name: "Polygon" },
    Benchmark { ticker: "SOL-USD", name: "Solana" },
    Benchmark { ticker: "DOT-USD", name: "Polkadot" },
    Benchmark { ticker: "SHIB-USD", name: "Shiba Inu" },
];

/// Resolve a ticker or display name (case-insensitive) to a benchmark.
pub fn find_benchmark(query: &str) -> Option<Benchmark> {
    let query = query.trim();
    BENCHMARKS.iter().copied().find(|benchmark| {
        benchmark.ticker.eq_ignore_ascii_case(query) || benchmark.name.eq_ignore_ascii_case(query)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnPoint {
    pub date: Date,
    /// Percent gained since the first close, two decimals.
    pub cumulative_pct: f64,
}

/// Cumulative return of every close relative to the first one.
pub fn relative_returns(closes: &[PricePoint]) -> Vec<ReturnPoint> {
    let Some(base) = closes.first().map(|point| point.value).filter(|base| *base != 0.0) else {
        return Vec::new();
    };

    closes
        .iter()
        .map(|point| ReturnPoint {
            date: point.time.date(),
            cumulative_pct: round2((point.value / base - 1.0) * 100.0),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub ticker: String,
    pub name: String,
    pub points: Vec<ReturnPoint>,
    pub latest_change: Option<f64>,
}

/// Fetch daily closes for each ticker and turn them into return series,
/// in the order given.
pub async fn compare_returns<C: PacingClock>(
    source: &dyn PriceHistorySource,
    pacer: &Pacer<C>,
    tickers: &[String],
    start: Date,
    end: Date,
) -> Result<Vec<ReturnSeries>, SourceError> {
    if start > end {
        return Err(SourceError::invalid_request(
            ValidationError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            }
            .to_string(),
        ));
    }

    let mut series = Vec::with_capacity(tickers.len());
    for query in tickers {
        let (ticker, name) = match find_benchmark(query) {
            Some(benchmark) => (benchmark.ticker.to_owned(), benchmark.name.to_owned()),
            None => (query.trim().to_owned(), query.trim().to_owned()),
        };
        if ticker.is_empty() {
            return Err(SourceError::invalid_request(ValidationError::EmptyTicker.to_string()));
        }

        pacer.until_ready().await;
        let closes = source.daily_closes(&ticker, start, end).await?;
        debug!(%ticker, closes = closes.len(), "price history fetched");

        let points = relative_returns(&closes);
        series.push(ReturnSeries {
            latest_change: points.last().map(|point| point.cumulative_pct),
            ticker,
            name,
            points,
        });
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UtcDateTime;

    fn point(day: i64, value: f64) -> PricePoint {
        PricePoint::new(UtcDateTime::from_unix_seconds(day * 86_400).expect("ts"), value)
            .expect("point")
    }

    #[test]
    fn first_point_is_zero_and_later_points_compound() {
        let returns = relative_returns(&[point(0, 200.0), point(1, 220.0), point(2, 150.0)]);

        let values = returns.iter().map(|r| r.cumulative_pct).collect::<Vec<_>>();
        assert_eq!(values, vec![0.0, 10.0, -25.0]);
    }

    #[test]
    fn zero_base_yields_no_series() {
        assert!(relative_returns(&[point(0, 0.0), point(1, 1.0)]).is_empty());
        assert!(relative_returns(&[]).is_empty());
    }

    #[test]
    fn benchmarks_resolve_by_ticker_or_name() {
        assert_eq!(find_benchmark("gc=f").map(|b| b.name), Some("Gold"));
        assert_eq!(find_benchmark("Bitcoin").map(|b| b.ticker), Some("BTC-USD"));
        assert_eq!(find_benchmark("AAPL"), None);
    }
}
