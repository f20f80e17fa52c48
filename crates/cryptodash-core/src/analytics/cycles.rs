use std::collections::HashMap;

use serde::Serialize;
use time::Date;

use super::indicators::rolling_mean;
use crate::data_source::{ExchangeSource, MarketSource, SourceError};
use crate::{Candle, PairSymbol, PricePoint};

/// Daily klines requested for the cycle chart.
pub const CYCLE_CANDLE_LIMIT: usize = 1000;
/// Most recent days kept in the report.
pub const CYCLE_TAIL: usize = 800;

const CYCLE_PAIR: &str = "BTCUSDT";
const CYCLE_COIN_ID: &str = "bitcoin";

const DAYS_PER_WEEK: usize = 7;
const SHORT_WEEKS: usize = 100;
const LONG_WEEKS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CyclePoint {
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub sma_100w: Option<f64>,
    pub sma_200w: Option<f64>,
}

impl CyclePoint {
    /// Short average above the long one; missing averages count as bearish.
    pub fn is_bullish(&self) -> bool {
        matches!((self.sma_50, self.sma_200), (Some(short), Some(long)) if short > long)
    }
}

/// A maximal run of consecutive days on the same side of the crossover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSegment {
    pub start: Date,
    pub end: Date,
    pub days: usize,
    pub bullish: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub points: Vec<CyclePoint>,
    pub segments: Vec<CycleSegment>,
}

/// Join exchange candles with weekly averages of the long price history,
/// keep the last `tail` days and split them at every SMA 50/200 cross.
///
/// The final chart point is today's partial day and is ignored.
pub fn market_cycles(candles: &[Candle], chart: &[PricePoint], tail: usize) -> CycleReport {
    let closes = candles.iter().map(|candle| candle.close).collect::<Vec<_>>();
    let sma_50 = rolling_mean(&closes, 50);
    let sma_200 = rolling_mean(&closes, 200);

    let settled = &chart[..chart.len().saturating_sub(1)];
    let prices = settled.iter().map(|point| point.value).collect::<Vec<_>>();
    let weekly_short = rolling_mean(&prices, SHORT_WEEKS * DAYS_PER_WEEK);
    let weekly_long = rolling_mean(&prices, LONG_WEEKS * DAYS_PER_WEEK);
    let weekly_by_date = settled
        .iter()
        .zip(weekly_short.into_iter().zip(weekly_long))
        .map(|(point, averages)| (point.time.date(), averages))
        .collect::<HashMap<_, _>>();

    let points = candles
        .iter()
        .enumerate()
        .map(|(index, candle)| {
            let date = candle.open_time.date();
            let (sma_100w, sma_200w) = weekly_by_date.get(&date).copied().unwrap_or((None, None));
            CyclePoint {
                date,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                sma_50: sma_50[index],
                sma_200: sma_200[index],
                sma_100w,
                sma_200w,
            }
        })
        .collect::<Vec<_>>();

    let skip = points.len().saturating_sub(tail);
    let points = points.into_iter().skip(skip).collect::<Vec<_>>();
    let segments = segments(&points);

    CycleReport { points, segments }
}

/// Fetch the bitcoin klines and price history and build the report.
pub async fn load_market_cycles(
    exchange: &dyn ExchangeSource,
    market: &dyn MarketSource,
) -> Result<CycleReport, SourceError> {
    let pair = PairSymbol::parse(CYCLE_PAIR)
        .map_err(|e| SourceError::invalid_request(e.to_string()))?;
    let candles = exchange
        .daily_candles(&pair, None, CYCLE_CANDLE_LIMIT)
        .await?;
    let chart = market.daily_prices(CYCLE_COIN_ID).await?;
    Ok(market_cycles(&candles, &chart, CYCLE_TAIL))
}

fn segments(points: &[CyclePoint]) -> Vec<CycleSegment> {
    let mut segments: Vec<CycleSegment> = Vec::new();
    for point in points {
        let bullish = point.is_bullish();
        match segments.last_mut() {
            Some(current) if current.bullish == bullish => {
                current.end = point.date;
                current.days += 1;
            }
            _ => segments.push(CycleSegment {
                start: point.date,
                end: point.date,
                days: 1,
                bullish,
            }),
        }
    }
    segments
}
