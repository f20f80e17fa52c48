mod compare;
mod cycles;
mod markets;
mod pairs;
mod refresh;
mod wallet;

use std::sync::Arc;

use cryptodash_core::{
    BinanceAdapter, CoingeckoAdapter, Config, EtherscanAdapter, HttpClient, Pacer, ProviderId,
    ReqwestHttpClient, YahooAdapter,
};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub command: &'static str,
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(command: &'static str, data: Value) -> Self {
        Self {
            command,
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// Resolved configuration plus the shared transport.
pub struct AppContext {
    pub config: Config,
    /// Output style for results emitted before the command returns.
    pub pretty: bool,
    http: Arc<dyn HttpClient>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = Config::load(cli.home.as_deref())?;
        if let Some(key) = &cli.etherscan_api_key {
            config.etherscan_api_key = Some(key.clone());
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            config.request_timeout_ms = Some(timeout_ms);
        }

        Ok(Self {
            config,
            pretty: cli.pretty,
            http: Arc::new(ReqwestHttpClient::new()),
        })
    }

    pub fn pacer(&self, provider_id: ProviderId) -> Pacer {
        Pacer::from_policy(&self.config.policy(provider_id))
    }

    fn timeout_ms(&self, provider_id: ProviderId) -> u64 {
        self.config.policy(provider_id).timeout_ms()
    }

    pub fn binance(&self) -> BinanceAdapter {
        BinanceAdapter::new(Arc::clone(&self.http), &self.config.endpoints.binance)
            .with_timeout_ms(self.timeout_ms(ProviderId::Binance))
    }

    pub fn coingecko(&self) -> CoingeckoAdapter {
        CoingeckoAdapter::new(Arc::clone(&self.http), &self.config.endpoints.coingecko)
            .with_api_key(self.config.coingecko_api_key.clone())
            .with_timeout_ms(self.timeout_ms(ProviderId::Coingecko))
    }

    pub fn etherscan(&self) -> Result<EtherscanAdapter, CliError> {
        let api_key = self.config.etherscan_api_key()?;
        Ok(EtherscanAdapter::new(
            Arc::clone(&self.http),
            &self.config.endpoints.etherscan,
            api_key,
        )
        .with_timeout_ms(self.timeout_ms(ProviderId::Etherscan)))
    }

    pub fn yahoo(&self) -> YahooAdapter {
        YahooAdapter::new(Arc::clone(&self.http), &self.config.endpoints.yahoo)
            .with_timeout_ms(self.timeout_ms(ProviderId::Yahoo))
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let context = AppContext::from_cli(cli)?;

    match &cli.command {
        Command::Refresh(args) => refresh::run(args, &context).await,
        Command::Pairs(args) => pairs::run(args, &context),
        Command::Markets => markets::run(&context),
        Command::Wallet(args) => wallet::run(args, &context).await,
        Command::Cycles => cycles::run(&context).await,
        Command::Compare(args) => compare::run(args, &context).await,
    }
}
