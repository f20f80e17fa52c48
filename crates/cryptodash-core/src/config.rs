//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then `$CRYPTODASH_HOME/config.json`,
//! then environment variables. CLI flags are applied by the caller on the
//! returned value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cryptodash_warehouse::WarehouseConfig;
use serde::{Deserialize, Serialize};

use crate::adapters::{binance, coingecko, etherscan, yahoo};
use crate::pagination::DEFAULT_PAGE_CAP;
use crate::provider_policy::ProviderPolicy;
use crate::refresh::candles::{default_epoch_start, DEFAULT_PAGE_LIMIT};
use crate::refresh::markets::{DEFAULT_PAGES, DEFAULT_PER_PAGE};
use crate::refresh::{CandleRefreshSettings, MarketRefreshSettings};
use crate::schedule::Schedule;
use crate::wallet::{WalletQuery, DEFAULT_TOP_COUNTERPARTIES};
use crate::{CoreError, ProviderId, UtcDateTime, ValidationError};

pub const HOME_ENV: &str = "CRYPTODASH_HOME";
pub const ETHERSCAN_API_KEY_ENV: &str = "CRYPTODASH_ETHERSCAN_API_KEY";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolved data directory; never read from the file itself.
    #[serde(skip)]
    pub home: PathBuf,
    #[serde(alias = "api_key")]
    pub etherscan_api_key: Option<String>,
    pub coingecko_api_key: Option<String>,
    pub endpoints: Endpoints,
    /// Overrides every provider's default timeout when set.
    pub request_timeout_ms: Option<u64>,
    pub candles: CandleConfig,
    pub markets: MarketConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub binance: String,
    pub coingecko: String,
    pub etherscan: String,
    pub yahoo: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            binance: binance::DEFAULT_BASE_URL.to_owned(),
            coingecko: coingecko::DEFAULT_BASE_URL.to_owned(),
            etherscan: etherscan::DEFAULT_BASE_URL.to_owned(),
            yahoo: yahoo::DEFAULT_BASE_URL.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleConfig {
    pub page_limit: usize,
    pub epoch_start: UtcDateTime,
    /// Daily wake time, UTC.
    pub wake_hour: u8,
    pub wake_minute: u8,
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            epoch_start: default_epoch_start(),
            wake_hour: 0,
            wake_minute: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub pages: u32,
    pub per_page: u32,
    pub page_delay_secs: u64,
    pub refresh_every_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES,
            per_page: DEFAULT_PER_PAGE,
            page_delay_secs: 10,
            refresh_every_secs: 900,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub page_cap: usize,
    pub requests_per_second: u32,
    pub top_counterparties: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            page_cap: DEFAULT_PAGE_CAP,
            requests_per_second: 1,
            top_counterparties: DEFAULT_TOP_COUNTERPARTIES,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home: PathBuf::from(".cryptodash"),
            etherscan_api_key: None,
            coingecko_api_key: None,
            endpoints: Endpoints::default(),
            request_timeout_ms: None,
            candles: CandleConfig::default(),
            markets: MarketConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}

impl Config {
    /// Load using the process environment.
    pub fn load(home_override: Option<&Path>) -> Result<Self, CoreError> {
        Self::load_with(home_override, |key| std::env::var(key).ok())
    }

    /// Load with an explicit variable lookup. `home_override` wins over
    /// `CRYPTODASH_HOME`, which wins over `$HOME/.cryptodash`.
    pub fn load_with<F>(home_override: Option<&Path>, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let home = match home_override {
            Some(path) => path.to_path_buf(),
            None => non_empty(HOME_ENV)
                .map(PathBuf::from)
                .or_else(|| non_empty("HOME").map(|home| PathBuf::from(home).join(".cryptodash")))
                .unwrap_or_else(|| PathBuf::from(".cryptodash")),
        };

        let mut config = Self::read_file(&home.join(CONFIG_FILE_NAME))?;
        config.home = home;
        if let Some(key) = non_empty(ETHERSCAN_API_KEY_ENV) {
            config.etherscan_api_key = Some(key);
        }
        Ok(config)
    }

    /// Parse a config file; a missing file yields the defaults.
    pub fn read_file(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    pub fn warehouse(&self) -> WarehouseConfig {
        WarehouseConfig::under(&self.home)
    }

    pub fn policy(&self, provider_id: ProviderId) -> ProviderPolicy {
        let mut policy = ProviderPolicy::default_for(provider_id);
        match provider_id {
            ProviderId::Coingecko => {
                policy.quota_window = Duration::from_secs(self.markets.page_delay_secs.max(1));
                policy.quota_limit = 1;
            }
            ProviderId::Etherscan => {
                policy.quota_window = Duration::from_secs(1);
                policy.quota_limit = self.wallet.requests_per_second.max(1);
            }
            ProviderId::Binance | ProviderId::Yahoo => {}
        }
        if let Some(timeout_ms) = self.request_timeout_ms {
            policy.request_timeout = Duration::from_millis(timeout_ms);
        }
        policy
    }

    pub fn etherscan_api_key(&self) -> Result<&str, CoreError> {
        self.etherscan_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "an Etherscan API key is required (set {ETHERSCAN_API_KEY_ENV} or api_key in {CONFIG_FILE_NAME})"
                ))
            })
    }

    pub fn candle_settings(&self) -> CandleRefreshSettings {
        CandleRefreshSettings {
            page_limit: self.candles.page_limit,
            epoch_start: self.candles.epoch_start,
        }
    }

    pub fn market_settings(&self) -> MarketRefreshSettings {
        MarketRefreshSettings {
            pages: self.markets.pages,
            per_page: self.markets.per_page,
        }
    }

    pub fn wallet_query(&self, stablecoins_only: bool) -> WalletQuery {
        WalletQuery {
            page_cap: self.wallet.page_cap,
            stablecoins_only,
            top_counterparties: self.wallet.top_counterparties,
        }
    }

    pub fn candle_schedule(&self) -> Result<Schedule, ValidationError> {
        Schedule::daily_at(self.candles.wake_hour, self.candles.wake_minute)
    }

    pub fn market_schedule(&self) -> Result<Schedule, ValidationError> {
        Schedule::every(Duration::from_secs(self.markets.refresh_every_secs))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let home = dir.path().to_string_lossy().into_owned();

        let config = Config::load_with(None, lookup(&[(HOME_ENV, &home)])).expect("load");

        assert_eq!(config.home, dir.path());
        assert_eq!(config.markets.pages, 4);
        assert_eq!(config.wallet.page_cap, 10_000);
        assert_eq!(config.etherscan_api_key, None);
        assert_eq!(config.warehouse().candles_db, dir.path().join("candles.duckdb"));
    }

    #[test]
    fn file_values_then_environment_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"api_key": "from-file", "markets": {"pages": 2}}"#,
        )
        .expect("write config");

        let from_file = Config::load_with(Some(dir.path()), lookup(&[])).expect("load");
        assert_eq!(from_file.etherscan_api_key.as_deref(), Some("from-file"));
        assert_eq!(from_file.markets.pages, 2);
        assert_eq!(from_file.markets.per_page, 250);

        let overridden =
            Config::load_with(Some(dir.path()), lookup(&[(ETHERSCAN_API_KEY_ENV, "from-env")]))
                .expect("load");
        assert_eq!(overridden.etherscan_api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{not json").expect("write config");

        let err = Config::load_with(Some(dir.path()), lookup(&[])).expect_err("must fail");
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn policies_follow_configured_pacing() {
        let mut config = Config::default();
        config.markets.page_delay_secs = 3;
        config.request_timeout_ms = Some(1_500);

        let coingecko = config.policy(ProviderId::Coingecko);
        assert_eq!(coingecko.quota_window, Duration::from_secs(3));
        assert_eq!(coingecko.quota_limit, 1);
        assert_eq!(coingecko.timeout_ms(), 1_500);
        assert_eq!(config.policy(ProviderId::Etherscan).quota_limit, 1);
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = Config::default().etherscan_api_key().expect_err("must fail");
        assert!(err.to_string().contains(ETHERSCAN_API_KEY_ENV));
    }
}
