//! Behavior-driven tests for wallet exploration
//!
//! These tests verify what a user sees for an address: holdings per token,
//! counterparty tables, flow diagrams and the balance.

use std::time::Duration;

use cryptodash_core::{
    explore_wallet, SourceError, TransferPage, WalletQuery, WalletReport,
};
use cryptodash_tests::{
    fake_pacer, native_transfer, token_transfer, wallet, FakeWalletSource, ALICE, BOB, WALLET,
};

async fn explore(source: &FakeWalletSource, stablecoins_only: bool) -> WalletReport {
    let pacer = fake_pacer(Duration::from_secs(1), 1);
    let query = WalletQuery {
        stablecoins_only,
        ..WalletQuery::default()
    };
    explore_wallet(source, &pacer, &wallet(), query)
        .await
        .expect("wallet exploration succeeds")
}

// =============================================================================
// Wallet: Holdings
// =============================================================================

#[tokio::test]
async fn when_tokens_flow_in_and_out_holdings_show_the_difference_and_total() {
    // Given: 100 USDT received and 30 USDT sent
    let source = FakeWalletSource::new(
        vec![],
        vec![Ok(TransferPage::Items(vec![
            token_transfer(ALICE, WALLET, "Tether USD", 100.0, 10),
            token_transfer(WALLET, BOB, "Tether USD", 30.0, 11),
        ]))],
    );

    // When: The wallet is explored
    let report = explore(&source, false).await;

    // Then: The token row nets the flows
    assert_eq!(report.holdings.tokens.len(), 1);
    let row = &report.holdings.tokens[0];
    assert_eq!(row.token, "Tether USD");
    assert_eq!(row.amount_in, 100.0);
    assert_eq!(row.amount_out, 30.0);
    assert_eq!(row.current_holdings, 70.0);

    // And: The total row matches the single token
    assert_eq!(report.holdings.total.token, "Total");
    assert_eq!(report.holdings.total.current_holdings, 70.0);
}

#[tokio::test]
async fn when_stablecoins_only_is_requested_other_tokens_are_hidden() {
    // Given: One stablecoin and one other token received
    let source = FakeWalletSource::new(
        vec![],
        vec![Ok(TransferPage::Items(vec![
            token_transfer(ALICE, WALLET, "USD Coin", 50.0, 10),
            token_transfer(ALICE, WALLET, "Chainlink Token", 7.0, 11),
        ]))],
    );

    // When: The wallet is explored with the stablecoin filter
    let report = explore(&source, true).await;

    // Then: Only the stablecoin contributes to holdings
    let tokens = report
        .holdings
        .tokens
        .iter()
        .map(|row| row.token.as_str())
        .collect::<Vec<_>>();
    assert_eq!(tokens, vec!["USD Coin"]);
    assert_eq!(report.holdings.total.amount_in, 50.0);

    // And: The token flow diagram draws the remaining token only
    let labels = report
        .token_flow
        .nodes
        .iter()
        .map(|node| node.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["Amount In", "Amount Out", "Current Holdings", "USD Coin"]);
}

// =============================================================================
// Wallet: Counterparties
// =============================================================================

#[tokio::test]
async fn when_counterparty_only_receives_funds_it_appears_once_with_zero_inbound() {
    // Given: 2 ETH sent to Bob and 1 ETH received from Alice
    let source = FakeWalletSource::new(
        vec![Ok(TransferPage::Items(vec![
            native_transfer(WALLET, BOB, 2e18, 20),
            native_transfer(ALICE, WALLET, 1e18, 21),
            native_transfer(ALICE, WALLET, 0.0, 22),
        ]))],
        vec![],
    );

    // When: The wallet is explored
    let report = explore(&source, false).await;

    // Then: Zero-value transfers are dropped and amounts are in ether
    assert_eq!(report.native.transfers.len(), 2);
    assert_eq!(report.native.transfers[0].amount, 2.0);

    // And: Bob has a single row with outbound traffic only
    let bob_rows = report
        .native
        .counterparties
        .iter()
        .filter(|row| row.address == BOB)
        .collect::<Vec<_>>();
    assert_eq!(bob_rows.len(), 1);
    assert_eq!(bob_rows[0].outbound.count, 1);
    assert_eq!(bob_rows[0].outbound.value, 2.0);
    assert_eq!(bob_rows[0].inbound.count, 0);
    assert_eq!(bob_rows[0].inbound.value, 0.0);

    // And: Rows are ordered by inbound value
    assert_eq!(report.native.counterparties[0].address, ALICE);
}

#[tokio::test]
async fn when_native_transfers_exist_counterparty_flow_highlights_the_wallet() {
    // Given: One transfer in each direction
    let source = FakeWalletSource::new(
        vec![Ok(TransferPage::Items(vec![
            native_transfer(ALICE, WALLET, 1e18, 20),
            native_transfer(WALLET, BOB, 3e18, 21),
        ]))],
        vec![],
    );

    // When: The wallet is explored
    let report = explore(&source, false).await;

    // Then: Exactly one node is highlighted and it is the wallet
    let highlighted = report
        .counterparty_flow
        .nodes
        .iter()
        .filter(|node| node.highlight)
        .collect::<Vec<_>>();
    assert_eq!(highlighted.len(), 1);
    assert!(highlighted[0].label.starts_with("0x0000...00aa"));

    // And: One link per transfer direction carries the ether value
    let mut values = report
        .counterparty_flow
        .links
        .iter()
        .map(|link| link.value)
        .collect::<Vec<_>>();
    values.sort_by(f64::total_cmp);
    assert_eq!(values, vec![1.0, 3.0]);
}

// =============================================================================
// Wallet: Balance
// =============================================================================

#[tokio::test]
async fn when_balance_lookup_fails_the_rest_of_the_report_is_still_built() {
    // Given: A balance endpoint that is unavailable
    let source = FakeWalletSource::new(
        vec![Ok(TransferPage::Items(vec![native_transfer(ALICE, WALLET, 1e18, 1)]))],
        vec![],
    )
    .with_balance(Err(SourceError::unavailable("balance endpoint down")));

    // When: The wallet is explored
    let report = explore(&source, false).await;

    // Then: The balance is missing but transfers are present
    assert_eq!(report.balance_eth, None);
    assert_eq!(report.native.transfers.len(), 1);
}

#[tokio::test]
async fn when_balance_is_available_it_is_reported_in_ether() {
    // Given: A wallet with an empty history
    let source = FakeWalletSource::new(vec![], vec![]).with_balance(Ok(1.5));

    // When: The wallet is explored
    let report = explore(&source, false).await;

    // Then: The balance is present and the holdings total is zero
    assert_eq!(report.balance_eth, Some(1.5));
    assert!(report.holdings.tokens.is_empty());
    assert_eq!(report.holdings.total.current_holdings, 0.0);
}
