//! Provider adapters over the shared [`HttpClient`] transport.

pub mod binance;
pub mod coingecko;
pub mod etherscan;
pub mod yahoo;

pub use binance::BinanceAdapter;
pub use coingecko::CoingeckoAdapter;
pub use etherscan::EtherscanAdapter;
pub use yahoo::YahooAdapter;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::{ProviderId, ValidationError};

/// Execute one request, mapping transport failures to `Unavailable`.
async fn send(
    http_client: &Arc<dyn HttpClient>,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    http_client.execute(request).await.map_err(|e| {
        SourceError::unavailable(format!("{provider} transport error: {}", e.message()))
    })
}

/// Body of a 2xx response; 429 and 418 become `RateLimited`.
fn success_body(provider: ProviderId, response: HttpResponse) -> Result<String, SourceError> {
    if response.is_rate_limited() || response.status == 418 {
        return Err(SourceError::rate_limited(format!(
            "{provider} returned status {}",
            response.status
        )));
    }
    if !response.is_success() {
        return Err(SourceError::unavailable(format!(
            "{provider} returned status {}",
            response.status
        )));
    }
    Ok(response.body)
}

fn parse_json<T: DeserializeOwned>(provider: ProviderId, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse {provider} response: {e}")))
}

fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::internal(format!("upstream row failed validation: {error}"))
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_owned()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

    /// Replays canned responses in order and records every request.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        pub(crate) fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self
                .responses
                .lock()
                .expect("response queue should not be poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::new("no scripted response left")));
            Box::pin(async move { response })
        }
    }
}
