use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream APIs the pipelines talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Binance,
    Coingecko,
    Etherscan,
    Yahoo,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [Self::Binance, Self::Coingecko, Self::Etherscan, Self::Yahoo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Coingecko => "coingecko",
            Self::Etherscan => "etherscan",
            Self::Yahoo => "yahoo",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "coingecko" => Ok(Self::Coingecko),
            "etherscan" => Ok(Self::Etherscan),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_case_insensitively() {
        assert_eq!(ProviderId::from_str(" Etherscan ").expect("parse"), ProviderId::Etherscan);
        for provider in ProviderId::ALL {
            assert_eq!(ProviderId::from_str(provider.as_str()).expect("parse"), provider);
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = ProviderId::from_str("kraken").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidSource { .. }));
    }
}
