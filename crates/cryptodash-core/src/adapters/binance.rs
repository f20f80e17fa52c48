use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{parse_json, send, success_body, trim_base, validation_to_error};
use crate::data_source::{ExchangeSource, SourceError, SourceFuture};
use crate::http_client::{build_url, HttpClient, HttpRequest};
use crate::{is_tradable, Candle, PairSymbol, ProviderId, UtcDateTime};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

const DAILY_INTERVAL: &str = "1d";

/// Spot exchange adapter: listing plus daily klines.
#[derive(Clone)]
pub struct BinanceAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl BinanceAdapter {
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

    async fn fetch_trading_pairs(&self) -> Result<Vec<PairSymbol>, SourceError> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let response = send(
            &self.http_client,
            ProviderId::Binance,
            HttpRequest::get(url).with_timeout_ms(self.timeout_ms),
        )
        .await?;
        let body = success_body(ProviderId::Binance, response)?;
        let info: ExchangeInfo = parse_json(ProviderId::Binance, &body)?;

        let pairs = info
            .symbols
            .into_iter()
            .filter(|entry| is_tradable(&entry.symbol, &entry.status))
            .filter_map(|entry| match PairSymbol::parse(&entry.symbol) {
                Ok(pair) => Some(pair),
                Err(error) => {
                    warn!(symbol = %entry.symbol, %error, "skipping unsupported pair symbol");
                    None
                }
            })
            .collect();
        Ok(pairs)
    }

    async fn fetch_daily_candles(
        &self,
        pair: &PairSymbol,
        start: Option<UtcDateTime>,
        limit: usize,
    ) -> Result<Vec<Candle>, SourceError> {
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "kline limit must be greater than zero",
            ));
        }

        let mut params = vec![
            ("symbol", pair.as_str().to_owned()),
            ("interval", DAILY_INTERVAL.to_owned()),
        ];
        if let Some(start) = start {
            params.push(("startTime", start.unix_millis().to_string()));
        }
        params.push(("limit", limit.to_string()));

        let url = build_url(&format!("{}/api/v3/klines", self.base_url), &params);
        let response = send(
            &self.http_client,
            ProviderId::Binance,
            HttpRequest::get(url).with_timeout_ms(self.timeout_ms),
        )
        .await?;
        let body = success_body(ProviderId::Binance, response)?;
        let rows: Vec<Vec<Value>> = parse_json(ProviderId::Binance, &body)?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }
}

impl ExchangeSource for BinanceAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Binance
    }

    fn trading_pairs<'a>(&'a self) -> SourceFuture<'a, Vec<PairSymbol>> {
        Box::pin(self.fetch_trading_pairs())
    }

    fn daily_candles<'a>(
        &'a self,
        pair: &'a PairSymbol,
        start: Option<UtcDateTime>,
        limit: usize,
    ) -> SourceFuture<'a, Vec<Candle>> {
        Box::pin(self.fetch_daily_candles(pair, start, limit))
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<ExchangeSymbol>,
}

#[derive(Debug, Deserialize)]
struct ExchangeSymbol {
    symbol: String,
    status: String,
}

/// Kline rows are positional:
/// `[open_time, open, high, low, close, volume, close_time, quote_volume,
/// trades, taker_base, taker_quote, ignore]` with prices as strings.
fn parse_kline(row: &[Value]) -> Result<Candle, SourceError> {
    if row.len() < 9 {
        return Err(SourceError::internal(format!(
            "kline row has {} fields, expected 12",
            row.len()
        )));
    }

    let open_time = UtcDateTime::from_unix_millis(integer_at(row, 0, "open_time")?)
        .map_err(validation_to_error)?;
    let close_time = UtcDateTime::from_unix_millis(integer_at(row, 6, "close_time")?)
        .map_err(validation_to_error)?;
    let trade_count = u64::try_from(integer_at(row, 8, "trades")?).unwrap_or(0);

    Candle::new(
        open_time,
        number_at(row, 1, "open")?,
        number_at(row, 2, "high")?,
        number_at(row, 3, "low")?,
        number_at(row, 4, "close")?,
        number_at(row, 5, "volume")?,
        close_time,
        trade_count,
    )
    .map_err(validation_to_error)
}

fn number_at(row: &[Value], index: usize, field: &str) -> Result<f64, SourceError> {
    let parsed = match row.get(index) {
        Some(Value::String(text)) => text.parse::<f64>().ok(),
        Some(Value::Number(number)) => number.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| SourceError::internal(format!("kline field '{field}' is not numeric")))
}

fn integer_at(row: &[Value], index: usize, field: &str) -> Result<i64, SourceError> {
    let parsed = match row.get(index) {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SourceError::internal(format!("kline field '{field}' is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::ScriptedHttpClient;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::HttpResponse;

    const KLINES: &str = r#"[
        [1704067200000, "42283.58", "44184.10", "42180.77", "44179.55", "27174.29",
         1704153599999, "1169996730.53", 1046712, "14140.98", "608931166.97", "0"]
    ]"#;

    #[tokio::test]
    async fn listing_keeps_only_tradable_usdt_pairs() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"symbols": [
                {"symbol": "BTCUSDT", "status": "TRADING"},
                {"symbol": "ETHBTC", "status": "TRADING"},
                {"symbol": "LUNAUSDT", "status": "BREAK"},
                {"symbol": "BTCUPUSDT", "status": "TRADING"},
                {"symbol": "ETHUSDT", "status": "TRADING"}
            ]}"#,
        ))]));
        let adapter = BinanceAdapter::new(client.clone(), "https://binance.test/");

        let pairs = adapter.trading_pairs().await.expect("listing should parse");

        let names = pairs.iter().map(PairSymbol::as_str).collect::<Vec<_>>();
        assert_eq!(names, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(
            client.recorded_requests()[0].url,
            "https://binance.test/api/v3/exchangeInfo"
        );
    }

    #[tokio::test]
    async fn listing_skips_symbols_that_fail_validation() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"symbols": [
                {"symbol": "BTCUSDT", "status": "TRADING"},
                {"symbol": "币安人生USDT", "status": "TRADING"},
                {"symbol": "ETHUSDT", "status": "TRADING"}
            ]}"#,
        ))]));
        let adapter = BinanceAdapter::new(client, "https://binance.test");

        let pairs = adapter
            .trading_pairs()
            .await
            .expect("one odd symbol must not fail the listing");

        let names = pairs.iter().map(PairSymbol::as_str).collect::<Vec<_>>();
        assert_eq!(names, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[tokio::test]
    async fn klines_parse_mixed_numeric_rows() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(KLINES))]));
        let adapter = BinanceAdapter::new(client.clone(), "https://binance.test");
        let pair = PairSymbol::parse("BTCUSDT").expect("pair");
        let start = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("start");

        let candles = adapter
            .daily_candles(&pair, Some(start), 1000)
            .await
            .expect("klines should parse");

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open, 42283.58);
        assert_eq!(candles[0].close, 44179.55);
        assert_eq!(candles[0].trade_count, 1_046_712);
        assert_eq!(candles[0].close_time.unix_millis(), 1_704_153_599_999);
        assert_eq!(
            client.recorded_requests()[0].url,
            "https://binance.test/api/v3/klines?symbol=BTCUSDT&interval=1d&startTime=1704067200000&limit=1000"
        );
    }

    #[tokio::test]
    async fn teapot_status_maps_to_rate_limited() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::with_status(
            418, "",
        ))]));
        let adapter = BinanceAdapter::new(client, "https://binance.test");

        let err = adapter.trading_pairs().await.expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::RateLimited);
    }

    #[test]
    fn short_kline_rows_are_rejected() {
        let err = parse_kline(&[Value::from(1)]).expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Internal);
    }
}
