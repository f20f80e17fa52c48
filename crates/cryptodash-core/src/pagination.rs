//! Block-cursor pagination over wallet history.
//!
//! The upstream returns at most `cap` transfers per request, ascending by
//! block. The cursor moves to the block after the last one seen. A page
//! whose items all sit in one block cannot be advanced past and is an
//! overflow.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data_source::{SourceError, SourceErrorKind, TransferPage, WalletSource};
use crate::throttling::{Pacer, PacingClock};
use crate::{Transfer, TransferKind, WalletAddress};

/// Upstream maximum items per history request.
pub const DEFAULT_PAGE_CAP: usize = 10_000;

/// Anything positioned at a block height.
pub trait BlockNumbered {
    fn block_number(&self) -> u64;
}

impl BlockNumbered for Transfer {
    fn block_number(&self) -> u64 {
        self.block_number
    }
}

impl BlockNumbered for u64 {
    fn block_number(&self) -> u64 {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Fetching { start_block: u64 },
    Done,
    Overflow { block: u64 },
}

impl ScanState {
    pub const fn initial() -> Self {
        Self::Fetching { start_block: 0 }
    }
}

/// Next cursor state after receiving `page` for a request capped at `cap`.
pub fn next_state<T: BlockNumbered>(page: &[T], cap: usize) -> ScanState {
    let Some(last) = page.last() else {
        return ScanState::Done;
    };
    let last_block = last.block_number();

    if page.len() >= cap {
        let at_last_block = page
            .iter()
            .filter(|item| item.block_number() == last_block)
            .count();
        if at_last_block >= cap {
            return ScanState::Overflow { block: last_block };
        }
    }

    ScanState::Fetching {
        start_block: last_block.saturating_add(1),
    }
}

/// How a scan that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "status", rename_all = "snake_case")]
pub enum Termination {
    Exhausted,
    UpstreamStatus(u16),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("rate limited while scanning {kind} transfers: {message}")]
    RateLimited { kind: TransferKind, message: String },

    #[error("block {block} holds at least {cap} {kind} transfers; cannot page past it")]
    BlockOverflow {
        kind: TransferKind,
        block: u64,
        cap: usize,
    },

    #[error("{kind} transfers did not advance past block {block}")]
    Stalled { kind: TransferKind, block: u64 },

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub kind: TransferKind,
    pub transfers: Vec<Transfer>,
    /// Pages that carried at least one transfer.
    pub pages: usize,
    pub termination: Termination,
}

/// Page through one transfer kind until exhausted, paced by `pacer`.
pub async fn scan_transfers<C: PacingClock>(
    source: &dyn WalletSource,
    pacer: &Pacer<C>,
    kind: TransferKind,
    address: &WalletAddress,
    cap: usize,
) -> Result<ScanResult, ScanError> {
    let cap = cap.max(1);
    let mut state = ScanState::initial();
    let mut transfers = Vec::new();
    let mut pages = 0;

    loop {
        let start_block = match state {
            ScanState::Done => {
                return Ok(ScanResult {
                    kind,
                    transfers,
                    pages,
                    termination: Termination::Exhausted,
                })
            }
            ScanState::Overflow { block } => {
                return Err(ScanError::BlockOverflow { kind, block, cap });
            }
            ScanState::Fetching { start_block } => start_block,
        };

        pacer.until_ready().await;
        let page = match source.transfers_page(kind, address, start_block, cap).await {
            Ok(page) => page,
            Err(error) if error.kind() == SourceErrorKind::RateLimited => {
                return Err(ScanError::RateLimited {
                    kind,
                    message: error.message().to_owned(),
                });
            }
            Err(error) => return Err(ScanError::Source(error)),
        };

        let items = match page {
            TransferPage::Items(items) => items,
            TransferPage::Status(status) => {
                warn!(%kind, status, start_block, "wallet scan ended on upstream status");
                return Ok(ScanResult {
                    kind,
                    transfers,
                    pages,
                    termination: Termination::UpstreamStatus(status),
                });
            }
        };

        let next = next_state(&items, cap);
        if let ScanState::Fetching { start_block: next_block } = next {
            if next_block <= start_block {
                return Err(ScanError::Stalled {
                    kind,
                    block: start_block,
                });
            }
        }

        debug!(%kind, start_block, items = items.len(), "wallet page fetched");
        if !items.is_empty() {
            pages += 1;
        }
        transfers.extend(items);
        state = next;
    }
}
