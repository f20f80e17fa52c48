use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_PAIR_LEN: usize = 32;

/// Quote currency every refreshed pair must trade against.
pub const REFERENCE_QUOTE: &str = "USDT";

/// Leveraged-token variants that share the reference suffix.
const LEVERAGED_MARKERS: [&str; 2] = ["UPUSDT", "DOWNUSDT"];

const TRADING_STATUS: &str = "TRADING";

/// Exchange pair symbol such as `BTCUSDT`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairSymbol(String);

impl PairSymbol {
    /// Parse and normalize a pair symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPair);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_PAIR_LEN {
            return Err(ValidationError::PairTooLong {
                len,
                max: MAX_PAIR_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ValidationError::PairInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether an exchange listing entry is a spot pair the refresher tracks.
pub fn is_tradable(symbol: &str, status: &str) -> bool {
    status == TRADING_STATUS
        && symbol.contains(REFERENCE_QUOTE)
        && !LEVERAGED_MARKERS
            .iter()
            .any(|marker| symbol.contains(marker))
}

impl Display for PairSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PairSymbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for PairSymbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PairSymbol> for String {
    fn from(value: PairSymbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_pair() {
        let parsed = PairSymbol::parse(" btcusdt ").expect("pair should parse");
        assert_eq!(parsed.as_str(), "BTCUSDT");
    }

    #[test]
    fn rejects_separators() {
        let err = PairSymbol::parse("BTC-USDT").expect_err("must fail");
        assert_eq!(err, ValidationError::PairInvalidChar { ch: '-', index: 3 });
    }

    #[test]
    fn tradable_filter_keeps_only_live_usdt_spot_pairs() {
        assert!(is_tradable("BTCUSDT", "TRADING"));
        assert!(!is_tradable("BTCUSDT", "BREAK"));
        assert!(!is_tradable("ETHBTC", "TRADING"));
        assert!(!is_tradable("BTCUPUSDT", "TRADING"));
        assert!(!is_tradable("ETHDOWNUSDT", "TRADING"));
    }
}
