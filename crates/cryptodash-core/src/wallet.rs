//! Wallet transaction aggregation.
//!
//! Raw transfers from both history endpoints are normalized into display
//! units, grouped by counterparty and folded into per-token holdings. All
//! tables here are request-scoped.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::analytics::round2;
use crate::data_source::WalletSource;
use crate::flow::{counterparty_flow, token_flow, FlowDiagram};
use crate::pagination::{scan_transfers, ScanError, Termination, DEFAULT_PAGE_CAP};
use crate::throttling::{Pacer, PacingClock};
use crate::{Transfer, TransferKind, UtcDateTime, WalletAddress};

const NATIVE_DECIMALS: i32 = 18;
const WEI_PER_GWEI: f64 = 1e9;

/// Counterparties kept as their own node in the flow diagram.
pub const DEFAULT_TOP_COUNTERPARTIES: usize = 25;

/// Token names treated as USD stablecoins by the holdings filter.
pub const STABLECOINS: [&str; 6] = [
    "Binance USD",
    "Dai Stablecoin",
    "Fei USD",
    "Tether USD",
    "TrueUSD",
    "USD Coin",
];

/// Human label for a native transfer's method selector.
pub fn method_label(method_id: Option<&str>) -> &'static str {
    match method_id {
        Some("0x") | Some("0x29723511") => "Transfer",
        Some("0x9fbf10fc") => "Swap",
        Some("0xeb672419") => "Request L2Trx",
        Some("0xe2bbb158") => "Deposit",
        Some("0x439370b1") => "Deposit Eth",
        Some("0x5ae401dc") => "Multicall",
        Some("0x73e888fd") => "Contribute",
        Some("0x3593564c") => "Execute",
        Some("0xfb488204") => "Multi Send ETH",
        Some("0xb6f9de95") => "Swap Exact ETH for Tokens Supporting Fee on Trx Tokens",
        _ => "Unknown",
    }
}

/// A transfer in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletTransfer {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Ether for native transfers, whole tokens otherwise.
    pub amount: f64,
    pub timestamp: UtcDateTime,
    pub block_number: u64,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    /// Set for native transfers only.
    pub method: Option<&'static str>,
    pub gas_price_gwei: f64,
}

/// Drop zero-value transfers and scale values by their decimals.
pub fn normalize(transfers: &[Transfer]) -> Vec<WalletTransfer> {
    transfers
        .iter()
        .filter(|transfer| transfer.value != 0.0)
        .map(|transfer| {
            let (decimals, method) = match &transfer.token {
                Some(token) => (i32::try_from(token.decimals).unwrap_or(i32::MAX), None),
                None => (
                    NATIVE_DECIMALS,
                    Some(method_label(transfer.method_id.as_deref())),
                ),
            };
            WalletTransfer {
                hash: transfer.hash.clone(),
                from: transfer.from.clone(),
                to: transfer.to.clone(),
                amount: transfer.value / 10_f64.powi(decimals),
                timestamp: transfer.timestamp,
                block_number: transfer.block_number,
                token_name: transfer.token.as_ref().map(|token| token.name.clone()),
                token_symbol: transfer.token.as_ref().map(|token| token.symbol.clone()),
                method,
                gas_price_gwei: transfer.gas_price_wei / WEI_PER_GWEI,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowTotals {
    pub count: usize,
    pub value: f64,
    /// Sum of the transfers' gas prices, in gwei.
    pub gas: f64,
}

impl FlowTotals {
    fn add(&mut self, transfer: &WalletTransfer) {
        self.count += 1;
        self.value += transfer.amount;
        self.gas += transfer.gas_price_gwei;
    }
}

/// Traffic between the wallet and one counterparty (per token for token
/// transfers). A side with no traffic is all zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterpartyRow {
    pub address: String,
    pub token: Option<String>,
    pub outbound: FlowTotals,
    pub inbound: FlowTotals,
}

/// Outbound transfers are keyed by recipient, inbound by sender. Rows are
/// sorted by inbound value, largest first.
pub fn group_by_counterparty(
    transfers: &[WalletTransfer],
    wallet: &WalletAddress,
) -> Vec<CounterpartyRow> {
    let wallet = wallet.as_str();
    let mut groups: BTreeMap<(String, Option<String>), (FlowTotals, FlowTotals)> = BTreeMap::new();

    for transfer in transfers {
        if transfer.from == wallet {
            let key = (transfer.to.clone(), transfer.token_name.clone());
            groups.entry(key).or_default().0.add(transfer);
        }
        if transfer.to == wallet {
            let key = (transfer.from.clone(), transfer.token_name.clone());
            groups.entry(key).or_default().1.add(transfer);
        }
    }

    let mut rows = groups
        .into_iter()
        .map(|((address, token), (outbound, inbound))| CounterpartyRow {
            address,
            token,
            outbound,
            inbound,
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.inbound.value.total_cmp(&a.inbound.value));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingRow {
    pub token: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub current_holdings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingsSummary {
    /// One row per token name, sorted by name.
    pub tokens: Vec<HoldingRow>,
    /// Sum of the rounded token rows.
    pub total: HoldingRow,
}

impl HoldingsSummary {
    /// Token rows followed by the `Total` row.
    pub fn rows(&self) -> impl Iterator<Item = &HoldingRow> {
        self.tokens.iter().chain(std::iter::once(&self.total))
    }
}

/// Per-token inflow minus outflow for `wallet`. Values are rounded to two
/// decimals before the total is taken.
pub fn holdings(
    transfers: &[WalletTransfer],
    wallet: &WalletAddress,
    stablecoins_only: bool,
) -> HoldingsSummary {
    let wallet = wallet.as_str();
    let mut sums: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

    for transfer in transfers {
        let Some(token) = transfer.token_name.as_deref() else {
            continue;
        };
        if transfer.to == wallet {
            sums.entry(token).or_default().0 += transfer.amount;
        }
        if transfer.from == wallet {
            sums.entry(token).or_default().1 += transfer.amount;
        }
    }

    let tokens = sums
        .into_iter()
        .filter(|(token, _)| !stablecoins_only || STABLECOINS.contains(token))
        .map(|(token, (amount_in, amount_out))| HoldingRow {
            token: token.to_owned(),
            amount_in: round2(amount_in),
            amount_out: round2(amount_out),
            current_holdings: round2(amount_in - amount_out),
        })
        .collect::<Vec<_>>();

    let total = HoldingRow {
        token: String::from("Total"),
        amount_in: tokens.iter().map(|row| row.amount_in).sum(),
        amount_out: tokens.iter().map(|row| row.amount_out).sum(),
        current_holdings: tokens.iter().map(|row| row.current_holdings).sum(),
    };

    HoldingsSummary { tokens, total }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletQuery {
    pub page_cap: usize,
    pub stablecoins_only: bool,
    pub top_counterparties: usize,
}

impl Default for WalletQuery {
    fn default() -> Self {
        Self {
            page_cap: DEFAULT_PAGE_CAP,
            stablecoins_only: false,
            top_counterparties: DEFAULT_TOP_COUNTERPARTIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSection {
    pub termination: Termination,
    pub pages: usize,
    pub transfers: Vec<WalletTransfer>,
    pub counterparties: Vec<CounterpartyRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletReport {
    pub address: WalletAddress,
    /// `None` when the balance lookup failed.
    pub balance_eth: Option<f64>,
    pub native: TransferSection,
    pub token: TransferSection,
    pub holdings: HoldingsSummary,
    pub token_flow: FlowDiagram,
    pub counterparty_flow: FlowDiagram,
}

/// Fetch both histories and the balance for `address` and build every
/// wallet table.
pub async fn explore_wallet<C: PacingClock>(
    source: &dyn WalletSource,
    pacer: &Pacer<C>,
    address: &WalletAddress,
    query: WalletQuery,
) -> Result<WalletReport, ScanError> {
    pacer.until_ready().await;
    let balance_eth = match source.balance(address).await {
        Ok(balance) => Some(balance),
        Err(error) => {
            warn!(%address, error = %error, "balance lookup failed");
            None
        }
    };

    let native = scan_transfers(source, pacer, TransferKind::Native, address, query.page_cap).await?;
    let token = scan_transfers(source, pacer, TransferKind::Token, address, query.page_cap).await?;
    info!(
        %address,
        native = native.transfers.len(),
        token = token.transfers.len(),
        "wallet history fetched"
    );

    let native_transfers = normalize(&native.transfers);
    let token_transfers = normalize(&token.transfers);
    let summary = holdings(&token_transfers, address, query.stablecoins_only);

    Ok(WalletReport {
        address: address.clone(),
        balance_eth,
        token_flow: token_flow(&summary),
        counterparty_flow: counterparty_flow(&native_transfers, address, query.top_counterparties),
        holdings: summary,
        native: TransferSection {
            termination: native.termination,
            pages: native.pages,
            counterparties: group_by_counterparty(&native_transfers, address),
            transfers: native_transfers,
        },
        token: TransferSection {
            termination: token.termination,
            pages: token.pages,
            counterparties: group_by_counterparty(&token_transfers, address),
            transfers: token_transfers,
        },
    })
}
