//! Behavior-driven tests for the read-side views
//!
//! These tests verify what the pair browser, market table, cycle chart and
//! return comparison produce from stored or fetched data.

use std::sync::Arc;
use std::time::Duration;

use cryptodash_core::{
    compare_returns, load_market_cycles, market_table, BinanceAdapter, Candle, Crossover,
    MarketSnapshot, PairSymbol, PriceSummary, SourceErrorKind, WarehouseConfig,
};
use cryptodash_tests::{
    candle, fake_pacer, klines, snapshot, FakeMarketSource, FakePriceHistory, ScriptedHttpClient,
    DAY_MS,
};
use tempfile::tempdir;
use time::macros::date;

// =============================================================================
// Pair Browser
// =============================================================================

#[test]
fn when_user_selects_a_date_range_summary_covers_only_that_range() {
    // Given: Five stored daily candles
    let temp = tempdir().expect("tempdir");
    let store = WarehouseConfig::under(temp.path())
        .open_candles()
        .expect("candle store opens");
    store.ensure_pair_table("ETHUSDT").expect("table");
    let records = [100.0, 110.0, 90.0, 120.0, 130.0]
        .iter()
        .enumerate()
        .map(|(day, close)| candle(day as i64, *close).to_record())
        .collect::<Vec<_>>();
    store
        .append_candles("run-1", "ETHUSDT", &records)
        .expect("append");

    // When: The user asks for days 1 through 3 by close time
    let rows = store
        .query_range("ETHUSDT", DAY_MS, 4 * DAY_MS - 1)
        .expect("range query");
    let candles = rows
        .iter()
        .map(Candle::from_record)
        .collect::<Result<Vec<_>, _>>()
        .expect("valid candles");
    let pair = PairSymbol::parse("ethusdt").expect("valid pair");
    let summary = PriceSummary::from_candles(&pair, &candles).expect("summary");

    // Then: Only the three candles in range are summarized
    assert_eq!(candles.len(), 3);
    assert_eq!(summary.opening_price, 110.0);
    assert_eq!(summary.closing_price, 120.0);
    assert_eq!(summary.highest_price, 120.0);
    assert_eq!(summary.lowest_price, 90.0);
    assert_eq!(summary.percentage_change, 9.09);

    // And: Long averages are undefined for a short range
    assert_eq!(summary.sma_200, None);
    assert_eq!(summary.crossover, None);
}

#[test]
fn when_long_history_rises_summary_reports_a_bullish_crossover() {
    // Given: 250 days of steadily rising closes
    let candles = (0..250)
        .map(|day| candle(day, 100.0 + day as f64))
        .collect::<Vec<_>>();
    let pair = PairSymbol::parse("BTCUSDT").expect("valid pair");

    // When: The summary is computed
    let summary = PriceSummary::from_candles(&pair, &candles).expect("summary");

    // Then: The short average sits above the long one
    assert_eq!(summary.crossover, Some(Crossover::Bullish));
    assert_eq!(summary.rsi, Some(100.0));
}

// =============================================================================
// Live Market Table
// =============================================================================

#[test]
fn when_market_rows_are_stored_table_is_ranked_and_formatted() {
    // Given: Stored market rows inserted out of rank order
    let temp = tempdir().expect("tempdir");
    let store = WarehouseConfig::under(temp.path())
        .open_markets()
        .expect("market store opens");
    let records = vec![
        snapshot("ethereum", 2, 3_400.5).into_record(),
        snapshot("bitcoin", 1, 64_000.0).into_record(),
    ];
    store.upsert_page("run-1", 1, &records).expect("upsert");

    // When: The market table is built from the store
    let snapshots = store
        .all_rows()
        .expect("rows")
        .into_iter()
        .map(MarketSnapshot::from_record)
        .collect::<Vec<_>>();
    let table = market_table(&snapshots);

    // Then: Rows follow market cap rank with display formatting
    assert_eq!(table.rows[0].id, "bitcoin");
    assert_eq!(table.rows[0].symbol, "BIT");
    assert_eq!(table.rows[0].current_price, "64,000");
    assert_eq!(table.rows[0].market_cap, "64.0B");
    assert_eq!(table.rows[1].current_price, "3,400.5");
    assert_eq!(table.last_updated.as_deref(), Some("2024/03/01 - 10:00:00 UTC"));
}

// =============================================================================
// BTC Market Cycles
// =============================================================================

#[tokio::test]
async fn when_btc_price_rises_cycle_chart_turns_bullish_after_the_long_window() {
    // Given: 250 rising daily klines and an empty aggregator chart
    let http = Arc::new(ScriptedHttpClient::new(vec![Ok(klines(
        &(0..250).collect::<Vec<_>>(),
    ))]));
    let exchange = BinanceAdapter::new(http.clone(), "https://binance.test");
    let market = FakeMarketSource::new(vec![]);

    // When: The cycle report is loaded
    let report = load_market_cycles(&exchange, &market)
        .await
        .expect("cycle report");

    // Then: The latest klines were requested for the bitcoin pair
    let urls = http.urls();
    assert!(urls[0].contains("symbol=BTCUSDT"));
    assert!(urls[0].contains("limit=1000"));
    assert!(!urls[0].contains("startTime"));

    // And: The chart splits into a bearish warm-up and a bullish run
    assert_eq!(report.points.len(), 250);
    let segments = report
        .segments
        .iter()
        .map(|segment| (segment.bullish, segment.days))
        .collect::<Vec<_>>();
    assert_eq!(segments, vec![(false, 199), (true, 51)]);
}

// =============================================================================
// Compare Returns
// =============================================================================

#[tokio::test]
async fn when_user_compares_benchmarks_each_series_starts_at_zero() {
    // Given: Gold up 10% and Bitcoin down 50% over the range
    let source = FakePriceHistory::new(vec![
        ("GC=F", vec![100.0, 105.0, 110.0]),
        ("BTC-USD", vec![50.0, 25.0]),
    ]);
    let pacer = fake_pacer(Duration::from_secs(60), 60);
    let tickers = vec![String::from("Gold"), String::from("BTC-USD")];

    // When: The returns are compared
    let series = compare_returns(
        &source,
        &pacer,
        &tickers,
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 03),
    )
    .await
    .expect("comparison succeeds");

    // Then: Benchmark names resolve to tickers, in the requested order
    assert_eq!(series[0].ticker, "GC=F");
    assert_eq!(series[0].name, "Gold");
    assert_eq!(series[1].name, "Bitcoin");

    // And: Every series starts at zero and ends at its cumulative return
    assert_eq!(series[0].points[0].cumulative_pct, 0.0);
    assert_eq!(series[0].latest_change, Some(10.0));
    assert_eq!(series[1].latest_change, Some(-50.0));
    assert_eq!(source.requested()[0].1, date!(2024 - 01 - 01));
}

#[tokio::test]
async fn when_range_is_inverted_comparison_is_rejected_before_fetching() {
    // Given: An end date before the start date
    let source = FakePriceHistory::new(vec![("GC=F", vec![1.0])]);
    let pacer = fake_pacer(Duration::from_secs(60), 60);

    // When: The returns are compared
    let error = compare_returns(
        &source,
        &pacer,
        &[String::from("GC=F")],
        date!(2024 - 02 - 01),
        date!(2024 - 01 - 01),
    )
    .await
    .expect_err("inverted range");

    // Then: The request is invalid and nothing was fetched
    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert!(source.requested().is_empty());
}
