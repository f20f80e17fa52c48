//! Aggregator market refresher: upserts the first `pages` pages of the
//! market listing into the market store.

use std::sync::Arc;

use cryptodash_warehouse::MarketStore;
use governor::clock::DefaultClock;
use serde::Serialize;
use tracing::{info, warn};

use super::{new_run_id, UnitFailure};
use crate::data_source::MarketSource;
use crate::throttling::{Pacer, PacingClock};
use crate::{CoreError, MarketSnapshot};

pub const DEFAULT_PAGES: u32 = 4;
pub const DEFAULT_PER_PAGE: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketRefreshSettings {
    pub pages: u32,
    pub per_page: u32,
}

impl Default for MarketRefreshSettings {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRefreshReport {
    pub run_id: String,
    pub pages_requested: u32,
    pub pages_stored: u32,
    pub rows_upserted: usize,
    pub failures: Vec<UnitFailure>,
}

pub struct MarketRefresher<C: PacingClock = DefaultClock> {
    source: Arc<dyn MarketSource>,
    store: MarketStore,
    pacer: Pacer<C>,
    settings: MarketRefreshSettings,
}

impl<C: PacingClock> MarketRefresher<C> {
    pub fn new(
        source: Arc<dyn MarketSource>,
        store: MarketStore,
        pacer: Pacer<C>,
        settings: MarketRefreshSettings,
    ) -> Self {
        Self {
            source,
            store,
            pacer,
            settings,
        }
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    pub fn pacer(&self) -> &Pacer<C> {
        &self.pacer
    }

    /// Fetch and upsert every page in order. A failed page is skipped and
    /// leaves previously stored rows untouched.
    pub async fn run(&self) -> MarketRefreshReport {
        let mut report = MarketRefreshReport {
            run_id: new_run_id(),
            pages_requested: 0,
            pages_stored: 0,
            rows_upserted: 0,
            failures: Vec::new(),
        };
        info!(run_id = %report.run_id, pages = self.settings.pages, "market refresh started");

        for page in 1..=self.settings.pages {
            report.pages_requested += 1;
            match self.refresh_page(&report.run_id, page).await {
                Ok(rows) => {
                    report.pages_stored += 1;
                    report.rows_upserted += rows;
                    info!(run_id = %report.run_id, page, rows, "market page stored");
                }
                Err(error) => {
                    warn!(run_id = %report.run_id, page, error = %error, "market page skipped");
                    if let Err(log_error) =
                        self.store.record_failure(&report.run_id, page, &error.to_string())
                    {
                        warn!(page, error = %log_error, "could not record page failure");
                    }
                    report.failures.push(UnitFailure {
                        unit: format!("page {page}"),
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            run_id = %report.run_id,
            stored = report.pages_stored,
            rows = report.rows_upserted,
            "market refresh finished"
        );
        report
    }

    async fn refresh_page(&self, run_id: &str, page: u32) -> Result<usize, CoreError> {
        self.pacer.until_ready().await;
        let snapshots = self.source.markets_page(page, self.settings.per_page).await?;
        let records = snapshots
            .into_iter()
            .map(MarketSnapshot::into_record)
            .collect::<Vec<_>>();
        Ok(self.store.upsert_page(run_id, page, &records)?)
    }
}
