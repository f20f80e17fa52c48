//! Exchange OHLC refresher: appends newly closed daily candles for every
//! tradable pair to the candle store.

use std::sync::Arc;

use cryptodash_warehouse::CandleStore;
use governor::clock::DefaultClock;
use serde::Serialize;
use time::macros::date;
use tracing::{error, info, warn};

use super::{new_run_id, UnitFailure};
use crate::data_source::ExchangeSource;
use crate::throttling::{Pacer, PacingClock};
use crate::{Candle, CoreError, PairSymbol, UtcDateTime};

/// Candles per kline request.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Start of history for pairs with nothing stored yet.
pub fn default_epoch_start() -> UtcDateTime {
    UtcDateTime::start_of_day(date!(2017 - 01 - 01))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleRefreshSettings {
    pub page_limit: usize,
    pub epoch_start: UtcDateTime,
}

impl Default for CandleRefreshSettings {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            epoch_start: default_epoch_start(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleRefreshReport {
    pub run_id: String,
    pub started_at: UtcDateTime,
    /// The exchange listing call failed and nothing was processed.
    pub listing_failed: bool,
    pub pairs_listed: usize,
    pub pairs_refreshed: usize,
    pub rows_appended: usize,
    pub failures: Vec<UnitFailure>,
}

pub struct CandleRefresher<C: PacingClock = DefaultClock> {
    source: Arc<dyn ExchangeSource>,
    store: CandleStore,
    pacer: Pacer<C>,
    settings: CandleRefreshSettings,
}

impl<C: PacingClock> CandleRefresher<C> {
    pub fn new(
        source: Arc<dyn ExchangeSource>,
        store: CandleStore,
        pacer: Pacer<C>,
        settings: CandleRefreshSettings,
    ) -> Self {
        Self {
            source,
            store,
            pacer,
            settings,
        }
    }

    pub fn store(&self) -> &CandleStore {
        &self.store
    }

    pub fn pacer(&self) -> &Pacer<C> {
        &self.pacer
    }

    /// Refresh every tradable pair. Failures are per pair; the run itself
    /// never fails.
    pub async fn run(&self, now: UtcDateTime) -> CandleRefreshReport {
        let mut report = CandleRefreshReport {
            run_id: new_run_id(),
            started_at: now,
            listing_failed: false,
            pairs_listed: 0,
            pairs_refreshed: 0,
            rows_appended: 0,
            failures: Vec::new(),
        };

        self.pacer.until_ready().await;
        let pairs = match self.source.trading_pairs().await {
            Ok(pairs) => pairs,
            Err(error) => {
                error!(run_id = %report.run_id, error = %error, "exchange listing failed; skipping run");
                report.listing_failed = true;
                return report;
            }
        };
        report.pairs_listed = pairs.len();
        info!(run_id = %report.run_id, pairs = pairs.len(), "candle refresh started");

        for pair in &pairs {
            match self.refresh_pair(&report.run_id, pair, now).await {
                Ok(appended) => {
                    report.pairs_refreshed += 1;
                    report.rows_appended += appended;
                    info!(run_id = %report.run_id, %pair, appended, "pair refreshed");
                }
                Err(error) => {
                    warn!(run_id = %report.run_id, %pair, error = %error, "pair refresh failed");
                    if let Err(log_error) =
                        self.store
                            .record_failure(&report.run_id, pair.as_str(), &error.to_string())
                    {
                        warn!(%pair, error = %log_error, "could not record pair failure");
                    }
                    report.failures.push(UnitFailure {
                        unit: pair.to_string(),
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            run_id = %report.run_id,
            refreshed = report.pairs_refreshed,
            failed = report.failures.len(),
            rows = report.rows_appended,
            "candle refresh finished"
        );
        report
    }

    /// Fetch everything after the newest stored candle of `pair` and append
    /// the closed candles. Returns the number of rows appended.
    pub async fn refresh_pair(
        &self,
        run_id: &str,
        pair: &PairSymbol,
        now: UtcDateTime,
    ) -> Result<usize, CoreError> {
        self.store.ensure_pair_table(pair.as_str())?;
        let latest = self.store.latest_candle(pair.as_str())?;
        let (latest_open, start) = match latest {
            Some(bounds) => (
                Some(UtcDateTime::from_unix_millis(bounds.open_time_ms)?),
                UtcDateTime::from_unix_millis(bounds.close_time_ms)?,
            ),
            None => (None, self.settings.epoch_start),
        };

        let page_limit = self.settings.page_limit.max(1);
        let mut fetched: Vec<Candle> = Vec::new();
        let mut cursor = start;
        loop {
            self.pacer.until_ready().await;
            let page = self
                .source
                .daily_candles(pair, Some(cursor), page_limit)
                .await?;
            let full = page.len() >= page_limit;
            let next = page
                .last()
                .map(|candle| candle.close_time.saturating_add(time::Duration::milliseconds(1)));
            fetched.extend(page);

            match next {
                Some(next) if full && next > cursor => cursor = next,
                _ => break,
            }
        }

        let fresh = select_new_candles(fetched, latest_open, now);
        if fresh.is_empty() {
            return Ok(0);
        }

        let records = fresh.iter().map(Candle::to_record).collect::<Vec<_>>();
        Ok(self.store.append_candles(run_id, pair.as_str(), &records)?)
    }
}

/// Drop a trailing candle that has not closed yet at `now`, then anything
/// not newer than the latest stored open time.
pub fn select_new_candles(
    mut candles: Vec<Candle>,
    latest_open: Option<UtcDateTime>,
    now: UtcDateTime,
) -> Vec<Candle> {
    if candles.last().is_some_and(|candle| candle.is_provisional(now)) {
        candles.pop();
    }

    match latest_open {
        Some(latest) => candles
            .into_iter()
            .filter(|candle| candle.open_time > latest)
            .collect(),
        None => candles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;

    fn day(index: i64) -> Candle {
        Candle::new(
            UtcDateTime::from_unix_millis(index * DAY_MS).expect("ts"),
            1.0,
            1.0,
            1.0,
            1.0,
            1.0,
            UtcDateTime::from_unix_millis((index + 1) * DAY_MS - 1).expect("ts"),
            1,
        )
        .expect("candle")
    }

    fn open_days(candles: &[Candle]) -> Vec<i64> {
        candles
            .iter()
            .map(|candle| candle.open_time.unix_millis() / DAY_MS)
            .collect()
    }

    #[test]
    fn provisional_trailing_candle_is_dropped() {
        let now = UtcDateTime::from_unix_millis(2 * DAY_MS + 5).expect("now");
        let kept = select_new_candles(vec![day(0), day(1), day(2)], None, now);
        assert_eq!(open_days(&kept), vec![0, 1]);
    }

    #[test]
    fn already_stored_open_times_are_dropped() {
        let now = UtcDateTime::from_unix_millis(10 * DAY_MS).expect("now");
        let latest = UtcDateTime::from_unix_millis(DAY_MS).ok();
        let kept = select_new_candles(vec![day(1), day(2), day(3)], latest, now);
        assert_eq!(open_days(&kept), vec![2, 3]);
    }

    #[test]
    fn default_epoch_is_start_of_2017() {
        assert_eq!(
            CandleRefreshSettings::default().epoch_start.format_rfc3339(),
            "2017-01-01T00:00:00Z"
        );
    }
}
