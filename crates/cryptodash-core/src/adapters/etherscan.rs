use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::{parse_json, send, trim_base, validation_to_error};
use crate::data_source::{SourceError, SourceFuture, TransferPage, WalletSource};
use crate::http_client::{build_url, HttpClient, HttpRequest};
use crate::{ProviderId, TokenInfo, Transfer, TransferKind, UtcDateTime, WalletAddress};

pub const DEFAULT_BASE_URL: &str = "https://api.etherscan.io";

const END_BLOCK: &str = "99999999";
const WEI_PER_ETHER: f64 = 1e18;

/// Wallet history adapter for the account module.
#[derive(Clone)]
pub struct EtherscanAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl EtherscanAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: trim_base(base_url),
            api_key: api_key.into(),
            timeout_ms: 20_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn fetch_transfers_page(
        &self,
        kind: TransferKind,
        address: &WalletAddress,
        start_block: u64,
        cap: usize,
    ) -> Result<TransferPage, SourceError> {
        let action = match kind {
            TransferKind::Native => "txlist",
            TransferKind::Token => "tokentx",
        };
        let url = build_url(
            &format!("{}/api", self.base_url),
            &[
                ("module", String::from("account")),
                ("action", String::from(action)),
                ("address", address.as_str().to_owned()),
                ("startblock", start_block.to_string()),
                ("endblock", String::from(END_BLOCK)),
                ("page", String::from("1")),
                ("offset", cap.to_string()),
                ("sort", String::from("asc")),
                ("apikey", self.api_key.clone()),
            ],
        );

        let response = send(
            &self.http_client,
            ProviderId::Etherscan,
            HttpRequest::get(url).with_timeout_ms(self.timeout_ms),
        )
        .await?;
        if response.is_rate_limited() {
            return Err(SourceError::rate_limited("etherscan returned status 429"));
        }
        if !response.is_success() {
            return Ok(TransferPage::Status(response.status));
        }

        let envelope: Envelope = parse_json(ProviderId::Etherscan, &response.body)?;
        let rows = envelope.into_rows()?;
        rows.into_iter()
            .map(|row| row.into_transfer(kind))
            .collect::<Result<Vec<_>, _>>()
            .map(TransferPage::Items)
    }

    async fn fetch_balance(&self, address: &WalletAddress) -> Result<f64, SourceError> {
        let url = build_url(
            &format!("{}/api", self.base_url),
            &[
                ("module", String::from("account")),
                ("action", String::from("balance")),
                ("address", address.as_str().to_owned()),
                ("tag", String::from("latest")),
                ("apikey", self.api_key.clone()),
            ],
        );

        let response = send(
            &self.http_client,
            ProviderId::Etherscan,
            HttpRequest::get(url).with_timeout_ms(self.timeout_ms),
        )
        .await?;
        let body = super::success_body(ProviderId::Etherscan, response)?;
        let envelope: Envelope = parse_json(ProviderId::Etherscan, &body)?;

        match envelope.result {
            Value::String(wei) if envelope.status == "1" => wei
                .parse::<f64>()
                .map(|wei| wei / WEI_PER_ETHER)
                .map_err(|_| SourceError::internal(format!("balance '{wei}' is not numeric"))),
            Value::String(message) => Err(api_error(&message)),
            _ => Err(SourceError::internal("balance result is not a string")),
        }
    }
}

impl WalletSource for EtherscanAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Etherscan
    }

    fn transfers_page<'a>(
        &'a self,
        kind: TransferKind,
        address: &'a WalletAddress,
        start_block: u64,
        cap: usize,
    ) -> SourceFuture<'a, TransferPage> {
        Box::pin(self.fetch_transfers_page(kind, address, start_block, cap))
    }

    fn balance<'a>(&'a self, address: &'a WalletAddress) -> SourceFuture<'a, f64> {
        Box::pin(self.fetch_balance(address))
    }
}

/// `{status, message, result}`; `result` is a string on API-level errors.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: String,
    result: Value,
}

impl Envelope {
    fn into_rows(self) -> Result<Vec<TransferRow>, SourceError> {
        match self.result {
            Value::Array(_) => serde_json::from_value(self.result).map_err(|e| {
                SourceError::internal(format!("failed to parse etherscan transfers: {e}"))
            }),
            Value::Null if self.message.starts_with("No transactions") => Ok(Vec::new()),
            Value::String(message) => Err(api_error(&message)),
            other => Err(SourceError::internal(format!(
                "unexpected etherscan result: {other}"
            ))),
        }
    }
}

fn api_error(message: &str) -> SourceError {
    if message.to_ascii_lowercase().contains("rate limit") {
        SourceError::rate_limited(format!("etherscan: {message}"))
    } else {
        SourceError::unavailable(format!("etherscan: {message}"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferRow {
    block_number: String,
    time_stamp: String,
    hash: String,
    from: String,
    to: String,
    value: String,
    #[serde(default)]
    gas_price: String,
    #[serde(default)]
    method_id: Option<String>,
    #[serde(default)]
    token_name: Option<String>,
    #[serde(default)]
    token_symbol: Option<String>,
    #[serde(default)]
    token_decimal: Option<String>,
}

impl TransferRow {
    fn into_transfer(self, kind: TransferKind) -> Result<Transfer, SourceError> {
        let block_number = parse_field::<u64>("blockNumber", &self.block_number)?;
        let seconds = parse_field::<i64>("timeStamp", &self.time_stamp)?;
        let timestamp = UtcDateTime::from_unix_seconds(seconds).map_err(validation_to_error)?;
        let value = parse_field::<f64>("value", &self.value)?;
        let gas_price_wei = if self.gas_price.is_empty() {
            0.0
        } else {
            parse_field::<f64>("gasPrice", &self.gas_price)?
        };

        let token = match kind {
            TransferKind::Native => None,
            TransferKind::Token => {
                let decimals = self
                    .token_decimal
                    .as_deref()
                    .ok_or_else(|| SourceError::internal("token transfer without tokenDecimal"))
                    .and_then(|raw| parse_field::<u32>("tokenDecimal", raw))?;
                Some(TokenInfo {
                    name: self.token_name.unwrap_or_default(),
                    symbol: self.token_symbol.unwrap_or_default(),
                    decimals,
                })
            }
        };

        Ok(Transfer {
            hash: self.hash,
            from: self.from.to_ascii_lowercase(),
            to: self.to.to_ascii_lowercase(),
            value,
            timestamp,
            block_number,
            token,
            method_id: self.method_id.filter(|id| !id.is_empty()),
            gas_price_wei,
        })
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, SourceError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| SourceError::internal(format!("etherscan field '{field}' is malformed: '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::ScriptedHttpClient;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::HttpResponse;

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";

    fn address() -> WalletAddress {
        WalletAddress::parse(WALLET).expect("address")
    }

    fn adapter(responses: Vec<HttpResponse>) -> (Arc<ScriptedHttpClient>, EtherscanAdapter) {
        let client = Arc::new(ScriptedHttpClient::new(responses.into_iter().map(Ok).collect()));
        let adapter = EtherscanAdapter::new(client.clone(), "https://scan.test", "KEY");
        (client, adapter)
    }

    #[tokio::test]
    async fn token_page_parses_rows_and_builds_query() {
        let (client, adapter) = adapter(vec![HttpResponse::ok_json(
            r#"{"status": "1", "message": "OK", "result": [{
                "blockNumber": "17000000", "timeStamp": "1680000000",
                "hash": "0xabc", "from": "0x00000000000000000000000000000000000000BB",
                "to": "0x00000000000000000000000000000000000000aa",
                "value": "2500000", "gasPrice": "30000000000",
                "tokenName": "USD Coin", "tokenSymbol": "USDC", "tokenDecimal": "6"
            }]}"#,
        )]);

        let page = adapter
            .transfers_page(TransferKind::Token, &address(), 42, 10_000)
            .await
            .expect("page");

        let TransferPage::Items(items) = page else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].block_number, 17_000_000);
        assert_eq!(items[0].from, "0x00000000000000000000000000000000000000bb");
        assert_eq!(items[0].token.as_ref().map(|t| t.decimals), Some(6));
        assert_eq!(
            client.recorded_requests()[0].url,
            format!(
                "https://scan.test/api?module=account&action=tokentx&address={WALLET}\
                 &startblock=42&endblock=99999999&page=1&offset=10000&sort=asc&apikey=KEY"
            )
        );
    }

    #[tokio::test]
    async fn no_transactions_is_an_empty_page() {
        let (_, adapter) = adapter(vec![HttpResponse::ok_json(
            r#"{"status": "0", "message": "No transactions found", "result": []}"#,
        )]);

        let page = adapter
            .transfers_page(TransferKind::Native, &address(), 0, 10_000)
            .await
            .expect("page");
        assert_eq!(page, TransferPage::Items(Vec::new()));
    }

    #[tokio::test]
    async fn rate_limit_message_and_status_are_rate_limited() {
        let (_, adapter) = adapter(vec![
            HttpResponse::ok_json(
                r#"{"status": "0", "message": "NOTOK", "result": "Max rate limit reached"}"#,
            ),
            HttpResponse::with_status(429, ""),
        ]);

        for _ in 0..2 {
            let err = adapter
                .transfers_page(TransferKind::Native, &address(), 0, 10_000)
                .await
                .expect_err("must fail");
            assert_eq!(err.kind(), SourceErrorKind::RateLimited);
        }
    }

    #[tokio::test]
    async fn other_statuses_are_reported_not_raised() {
        let (_, adapter) = adapter(vec![HttpResponse::with_status(502, "bad gateway")]);

        let page = adapter
            .transfers_page(TransferKind::Native, &address(), 0, 10_000)
            .await
            .expect("status page");
        assert_eq!(page, TransferPage::Status(502));
    }

    #[tokio::test]
    async fn balance_converts_wei_to_ether() {
        let (_, adapter) = adapter(vec![HttpResponse::ok_json(
            r#"{"status": "1", "message": "OK", "result": "1500000000000000000"}"#,
        )]);

        let balance = adapter.balance(&address()).await.expect("balance");
        assert_eq!(balance, 1.5);
    }
}
