use std::sync::Arc;

use serde::Deserialize;

use super::{parse_json, send, success_body, trim_base, validation_to_error};
use crate::data_source::{MarketSource, SourceError, SourceFuture};
use crate::http_client::{build_url, HttpClient, HttpRequest};
use crate::{MarketSnapshot, PricePoint, ProviderId, UtcDateTime};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";

/// Price change windows requested with every listing page.
pub const PRICE_CHANGE_WINDOWS: &str = "1h,24h,7d,14d,30d,200d,1y";

const DEMO_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Aggregator adapter: market listing pages and coin price charts.
#[derive(Clone)]
pub struct CoingeckoAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl CoingeckoAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: trim_base(base_url),
            api_key: None,
            timeout_ms: 15_000,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn request(&self, url: String) -> HttpRequest {
        let request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);
        match &self.api_key {
            Some(key) => request.with_header(DEMO_KEY_HEADER, key.as_str()),
            None => request,
        }
    }

    async fn fetch_markets_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<MarketSnapshot>, SourceError> {
        if page == 0 || per_page == 0 {
            return Err(SourceError::invalid_request(
                "market pages are 1-based and must request at least one item",
            ));
        }

        let url = build_url(
            &format!("{}/api/v3/coins/markets", self.base_url),
            &[
                ("vs_currency", String::from("usd")),
                ("order", String::from("market_cap_desc")),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("sparkline", String::from("false")),
                ("price_change_percentage", String::from(PRICE_CHANGE_WINDOWS)),
                ("locale", String::from("en")),
            ],
        );
        let response = send(&self.http_client, ProviderId::Coingecko, self.request(url)).await?;
        let body = success_body(ProviderId::Coingecko, response)?;
        parse_json(ProviderId::Coingecko, &body)
    }

    async fn fetch_daily_prices(&self, coin_id: &str) -> Result<Vec<PricePoint>, SourceError> {
        if coin_id.trim().is_empty() {
            return Err(SourceError::invalid_request("coin id must not be empty"));
        }

        let url = build_url(
            &format!(
                "{}/api/v3/coins/{}/market_chart",
                self.base_url,
                urlencoding::encode(coin_id.trim())
            ),
            &[
                ("vs_currency", String::from("usd")),
                ("days", String::from("max")),
                ("interval", String::from("daily")),
            ],
        );
        let response = send(&self.http_client, ProviderId::Coingecko, self.request(url)).await?;
        let body = success_body(ProviderId::Coingecko, response)?;
        let chart: MarketChart = parse_json(ProviderId::Coingecko, &body)?;

        chart
            .prices
            .into_iter()
            .map(|(millis, price)| {
                // Upstream sends float millisecond stamps.
                let time = UtcDateTime::from_unix_millis(millis as i64)
                    .map_err(validation_to_error)?;
                PricePoint::new(time, price).map_err(validation_to_error)
            })
            .collect()
    }
}

impl MarketSource for CoingeckoAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Coingecko
    }

    fn markets_page<'a>(&'a self, page: u32, per_page: u32) -> SourceFuture<'a, Vec<MarketSnapshot>> {
        Box::pin(self.fetch_markets_page(page, per_page))
    }

    fn daily_prices<'a>(&'a self, coin_id: &'a str) -> SourceFuture<'a, Vec<PricePoint>> {
        Box::pin(self.fetch_daily_prices(coin_id))
    }
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<(f64, f64)>,
}
