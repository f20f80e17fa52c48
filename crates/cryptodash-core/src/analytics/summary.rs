use serde::Serialize;

use super::indicators::{latest, rolling_mean, rsi, stoch_rsi};
use super::round2;
use crate::{Candle, PairSymbol};

const SHORT_SMA: usize = 50;
const LONG_SMA: usize = 200;
const RSI_WINDOW: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Crossover {
    Bullish,
    Bearish,
}

/// Headline figures for a run of candles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub pair: PairSymbol,
    pub opening_price: f64,
    pub closing_price: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub percentage_change: f64,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    /// Undefined until there are enough candles for the long average.
    pub crossover: Option<Crossover>,
    pub rsi: Option<f64>,
    pub stoch_rsi: Option<f64>,
}

impl PriceSummary {
    /// `None` for an empty range.
    pub fn from_candles(pair: &PairSymbol, candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let last = candles.last()?;
        let closes = candles.iter().map(|candle| candle.close).collect::<Vec<_>>();

        let sma_50 = latest(&rolling_mean(&closes, SHORT_SMA));
        let sma_200 = latest(&rolling_mean(&closes, LONG_SMA));
        let crossover = sma_200.map(|long| match sma_50 {
            Some(short) if short > long => Crossover::Bullish,
            _ => Crossover::Bearish,
        });
        let rsi_series = rsi(&closes, RSI_WINDOW);
        let stoch = stoch_rsi(&rsi_series, RSI_WINDOW);

        let percentage_change = if first.open == 0.0 {
            0.0
        } else {
            round2((last.close - first.open) / first.open * 100.0)
        };

        Some(Self {
            pair: pair.clone(),
            opening_price: first.open,
            closing_price: last.close,
            highest_price: candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
            lowest_price: candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
            percentage_change,
            sma_50,
            sma_200,
            crossover,
            rsi: latest(&rsi_series).map(round2),
            stoch_rsi: latest(&stoch).map(round2),
        })
    }
}
