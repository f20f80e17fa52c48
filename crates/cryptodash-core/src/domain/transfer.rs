use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{UtcDateTime, ValidationError};

const ADDRESS_HEX_LEN: usize = 40;

/// Externally owned or contract address, stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let valid = trimmed.len() == ADDRESS_HEX_LEN + 2
            && trimmed.starts_with("0x")
            && trimmed[2..].chars().all(|ch| ch.is_ascii_hexdigit());
        if !valid {
            return Err(ValidationError::InvalidAddress {
                value: input.to_owned(),
            });
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd`
    pub fn short(&self) -> String {
        shorten_address(&self.0)
    }
}

/// First six and last four characters of an address.
pub fn shorten_address(address: &str) -> String {
    let chars = address.chars().collect::<Vec<_>>();
    if chars.len() <= 10 {
        return address.to_owned();
    }
    let head = chars[..6].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}...{tail}")
}

impl Display for WalletAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// Which wallet history endpoint a transfer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Native,
    Token,
}

impl TransferKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Token => "token",
        }
    }
}

impl Display for TransferKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token metadata attached to token transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// A transfer as reported upstream, value still in base units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Wei for native transfers, smallest token unit otherwise.
    pub value: f64,
    pub timestamp: UtcDateTime,
    pub block_number: u64,
    pub token: Option<TokenInfo>,
    pub method_id: Option<String>,
    pub gas_price_wei: f64,
}

impl Transfer {
    pub fn kind(&self) -> TransferKind {
        if self.token.is_some() {
            TransferKind::Token
        } else {
            TransferKind::Native
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_lowercased() {
        let address =
            WalletAddress::parse("0xAbCdEf0123456789abcdef0123456789ABCDEF01").expect("valid");
        assert_eq!(address.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(address.short(), "0xabcd...ef01");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for input in [
            "",
            "abcdef0123456789abcdef0123456789abcdef0123",
            "0xabc",
            "0xZZcdef0123456789abcdef0123456789abcdef01",
            "0xabcdef0123456789abcdef0123456789abcdef0123",
        ] {
            let err = WalletAddress::parse(input).expect_err("must fail");
            assert!(matches!(err, ValidationError::InvalidAddress { .. }));
        }
    }

    #[test]
    fn short_names_are_left_alone() {
        assert_eq!(shorten_address("Other"), "Other");
    }
}
