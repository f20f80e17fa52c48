//! CLI argument definitions for cryptodash.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `refresh candles` | Append newly closed daily candles for every tradable pair |
//! | `refresh markets` | Upsert the market listing pages |
//! | `pairs list` / `pairs show` | Browse stored pairs and their price summary |
//! | `markets` | Live market table from the market store |
//! | `wallet` | Transfer history, holdings and flows of an address |
//! | `cycles` | BTC SMA 50/200 market cycles |
//! | `compare` | Cumulative returns of several tickers |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--home` | `$CRYPTODASH_HOME` or `~/.cryptodash` | Data directory |
//! | `--etherscan-api-key` | from config/env | Etherscan API key |
//! | `--timeout-ms` | per provider | Request timeout override |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//!
//! # Examples
//!
//! ```bash
//! cryptodash refresh candles --daemon
//! cryptodash pairs show BTCUSDT --start 2024-01-01 --end 2024-03-01 --pretty
//! cryptodash wallet 0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae --stablecoins-only
//! cryptodash compare BTC-USD "S&P 500" Gold --start 2023-01-01 --end 2024-01-01
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Crypto market dashboard backend.
#[derive(Debug, Parser)]
#[command(
    name = "cryptodash",
    author,
    version,
    about = "Crypto market data pipelines and wallet analytics"
)]
pub struct Cli {
    /// Data directory holding the DuckDB stores and config.json.
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Etherscan API key; overrides config.json and the environment.
    #[arg(long, global = true)]
    pub etherscan_api_key: Option<String>,

    /// Request timeout for every provider in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings (skipped pairs or pages, missing balance) as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a refresh pipeline once, or forever with --daemon.
    Refresh(RefreshArgs),

    /// Browse pairs stored in the candle store.
    Pairs(PairsArgs),

    /// Live market table built from the market store.
    Markets,

    /// Explore the transfer history of an Ethereum address.
    ///
    /// # Examples
    ///
    ///   cryptodash wallet 0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae
    Wallet(WalletArgs),

    /// BTC market cycles from the SMA 50/200 crossover.
    Cycles,

    /// Compare cumulative returns of tickers or benchmark names.
    Compare(CompareArgs),
}

#[derive(Debug, Args)]
pub struct RefreshArgs {
    #[command(subcommand)]
    pub target: RefreshTarget,
}

#[derive(Debug, Subcommand)]
pub enum RefreshTarget {
    /// Daily candles for every tradable USDT pair.
    Candles(DaemonArgs),
    /// The first pages of the market listing.
    Markets(DaemonArgs),
}

#[derive(Debug, Args)]
pub struct DaemonArgs {
    /// Keep running, waking on the configured schedule.
    #[arg(long, default_value_t = false)]
    pub daemon: bool,
}

#[derive(Debug, Args)]
pub struct PairsArgs {
    #[command(subcommand)]
    pub command: PairsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PairsCommand {
    /// Stored pairs with their close time range.
    List,
    /// Candles and price summary of one pair.
    Show(PairShowArgs),
}

#[derive(Debug, Args)]
pub struct PairShowArgs {
    /// Pair symbol such as BTCUSDT.
    pub pair: String,

    /// First day to include (YYYY-MM-DD); defaults to the earliest stored.
    #[arg(long)]
    pub start: Option<String>,

    /// Last day to include (YYYY-MM-DD); defaults to the latest stored.
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Debug, Args)]
pub struct WalletArgs {
    /// Address matching 0x followed by 40 hex digits.
    pub address: String,

    /// Restrict holdings to the known stablecoins.
    #[arg(long, default_value_t = false)]
    pub stablecoins_only: bool,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Tickers (e.g. BTC-USD, ^GSPC) or benchmark names (e.g. Gold).
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,

    /// First day (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last day (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_daemon_flag_parses() {
        let cli = Cli::try_parse_from(["cryptodash", "refresh", "markets", "--daemon"])
            .expect("parse");

        assert!(matches!(
            cli.command,
            Command::Refresh(RefreshArgs {
                target: RefreshTarget::Markets(DaemonArgs { daemon: true })
            })
        ));
    }

    #[test]
    fn global_flags_apply_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "cryptodash",
            "wallet",
            "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae",
            "--stablecoins-only",
            "--home",
            "/tmp/cd",
            "--pretty",
        ])
        .expect("parse");

        assert!(cli.pretty);
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/cd")));
        match cli.command {
            Command::Wallet(args) => assert!(args.stablecoins_only),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn compare_requires_tickers_and_dates() {
        assert!(Cli::try_parse_from(["cryptodash", "compare", "--start", "2024-01-01"]).is_err());
    }
}
