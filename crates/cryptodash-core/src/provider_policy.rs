use std::time::Duration;

use crate::ProviderId;

/// Request budget for one upstream provider: at most `quota_limit` requests
/// per `quota_window`, plus the per-request timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub request_timeout: Duration,
}

impl ProviderPolicy {
    pub fn binance_default() -> Self {
        Self {
            provider_id: ProviderId::Binance,
            quota_window: Duration::from_secs(60),
            quota_limit: 600,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// One market page per ten seconds.
    pub fn coingecko_default() -> Self {
        Self {
            provider_id: ProviderId::Coingecko,
            quota_window: Duration::from_secs(10),
            quota_limit: 1,
            request_timeout: Duration::from_secs(15),
        }
    }

    /// One wallet history request per second.
    pub fn etherscan_default() -> Self {
        Self {
            provider_id: ProviderId::Etherscan,
            quota_window: Duration::from_secs(1),
            quota_limit: 1,
            request_timeout: Duration::from_secs(20),
        }
    }

    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Binance => Self::binance_default(),
            ProviderId::Coingecko => Self::coingecko_default(),
            ProviderId::Etherscan => Self::etherscan_default(),
            ProviderId::Yahoo => Self::yahoo_default(),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coingecko_policy_spaces_pages_ten_seconds_apart() {
        let policy = ProviderPolicy::coingecko_default();

        assert_eq!(policy.provider_id, ProviderId::Coingecko);
        assert_eq!(policy.quota_window, Duration::from_secs(10));
        assert_eq!(policy.quota_limit, 1);
    }

    #[test]
    fn etherscan_policy_allows_one_request_per_second() {
        let policy = ProviderPolicy::default_for(ProviderId::Etherscan);

        assert_eq!(policy.quota_window, Duration::from_secs(1));
        assert_eq!(policy.quota_limit, 1);
        assert_eq!(policy.timeout_ms(), 20_000);
    }
}
