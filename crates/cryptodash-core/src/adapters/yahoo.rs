use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::{Date, Duration};

use super::{parse_json, send, success_body, trim_base, validation_to_error};
use crate::data_source::{PriceHistorySource, SourceError, SourceFuture};
use crate::http_client::{build_url, HttpClient, HttpRequest};
use crate::{PricePoint, ProviderId, UtcDateTime};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Chart endpoint adapter for daily closes.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: trim_base(base_url),
            timeout_ms: 10_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(SourceError::invalid_request("ticker must not be empty"));
        }
        if start > end {
            return Err(SourceError::invalid_request(format!(
                "start {start} is after end {end}"
            )));
        }

        // period2 is exclusive, so ask for the day after `end`.
        let period1 = UtcDateTime::start_of_day(start).unix_seconds();
        let period2 = UtcDateTime::start_of_day(end)
            .saturating_add(Duration::days(1))
            .unix_seconds();
        let url = build_url(
            &format!(
                "{}/v8/finance/chart/{}",
                self.base_url,
                urlencoding::encode(ticker)
            ),
            &[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", String::from("1d")),
                ("events", String::from("history")),
            ],
        );

        let request = HttpRequest::get(url)
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(self.timeout_ms);
        let response = send(&self.http_client, ProviderId::Yahoo, request).await?;
        let body = success_body(ProviderId::Yahoo, response)?;
        let chart: ChartResponse = parse_json(ProviderId::Yahoo, &body)?;

        if let Some(error) = chart.chart.error.filter(|error| !error.is_null()) {
            return Err(SourceError::unavailable(format!(
                "yahoo chart API error for {ticker}: {error}"
            )));
        }

        let result = chart
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| SourceError::internal(format!("no chart data for {ticker}")))?;
        result.into_closes()
    }
}

impl PriceHistorySource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn daily_closes<'a>(
        &'a self,
        ticker: &'a str,
        start: Date,
        end: Date,
    ) -> SourceFuture<'a, Vec<PricePoint>> {
        Box::pin(self.fetch_daily_closes(ticker, start, end))
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Vec<ChartAdjClose>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

impl ChartResult {
    /// Adjusted closes when present, plain closes otherwise. Days without a
    /// value are skipped.
    fn into_closes(self) -> Result<Vec<PricePoint>, SourceError> {
        let closes = self
            .indicators
            .adjclose
            .into_iter()
            .next()
            .map(|adj| adj.adjclose)
            .filter(|values| !values.is_empty())
            .or_else(|| self.indicators.quote.into_iter().next().map(|q| q.close))
            .unwrap_or_default();

        let mut points = Vec::with_capacity(self.timestamp.len());
        for (seconds, close) in self.timestamp.iter().zip(closes) {
            let Some(close) = close else { continue };
            let time = UtcDateTime::from_unix_seconds(*seconds).map_err(validation_to_error)?;
            points.push(PricePoint::new(time, close).map_err(validation_to_error)?);
        }
        Ok(points)
    }
}
