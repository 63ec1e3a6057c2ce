use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::{FetchError, RateSource};
use crate::core::quote::{RATE_SCALE, max_rate};

/// Upper bound for a single upstream call, connect to last body byte.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

const TARGET_CURRENCY: &str = "RUB";

/// Client for exchangerate-api style endpoints returning
/// `{"rates": {"RUB": 92.5, ...}}` for a USD base.
pub struct ExchangeRateApiProvider {
    url: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeout(url, UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rubrate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(ExchangeRateApiProvider {
            url: url.to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct LatestRatesResponse {
    #[serde(default)]
    rates: Option<HashMap<String, Value>>,
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::TimedOut
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Rounds an upstream rate to the stored precision and rejects values that
/// cannot be stored.
pub(crate) fn normalize_rate(raw: f64) -> Result<Decimal, FetchError> {
    let rate = Decimal::from_f64(raw)
        .ok_or_else(|| FetchError::Unexpected(format!("Rate {raw} is not representable")))?
        .round_dp(RATE_SCALE);

    if rate <= Decimal::ZERO {
        return Err(FetchError::RateUnavailable);
    }
    if rate > max_rate() {
        return Err(FetchError::Unexpected(format!(
            "Rate {rate} exceeds storable precision"
        )));
    }
    Ok(rate)
}

#[async_trait]
impl RateSource for ExchangeRateApiProvider {
    /// Fetches `rates.RUB` from the upstream document.
    ///
    /// Only a JSON number is accepted. A numeric string such as `"75.5"` is
    /// rejected as [`FetchError::Unexpected`] rather than parsed, so it surfaces
    /// as a 500 instead of a 200.
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(url = %self.url))]
    async fn fetch_usd_to_rub(&self) -> Result<Decimal, FetchError> {
        debug!("Requesting exchange rates from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP error: {status}")));
        }

        let text = response.text().await.map_err(transport_error)?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| FetchError::Unexpected(format!("Failed to parse JSON response: {e}")))?;

        let raw = match data.rates.as_ref().and_then(|r| r.get(TARGET_CURRENCY)) {
            None | Some(Value::Null) => return Err(FetchError::RateUnavailable),
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                FetchError::Unexpected(format!("{TARGET_CURRENCY} rate {n} is not a float"))
            })?,
            Some(other) => {
                return Err(FetchError::Unexpected(format!(
                    "{TARGET_CURRENCY} rate has unexpected type: {other}"
                )));
            }
        };

        let rate = normalize_rate(raw)?;
        debug!(%rate, "Received exchange rate");
        Ok(rate)
    }

    fn source_name(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider_for(mock_server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(&format!("{}/v4/latest/USD", mock_server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "base": "USD",
            "rates": {
                "EUR": 0.92,
                "RUB": 75.5
            }
        }"#;
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(mock_response)).await;

        let provider = provider_for(&mock_server);
        let rate = provider.fetch_usd_to_rub().await.unwrap();
        assert_eq!(rate, Decimal::from_str("75.5").unwrap());
        assert!(provider.source_name().ends_with("/v4/latest/USD"));
    }

    #[tokio::test]
    async fn test_rate_rounded_to_four_places() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"rates": {"RUB": 92.123456}}"#),
        )
        .await;

        let rate = provider_for(&mock_server).fetch_usd_to_rub().await.unwrap();
        assert_eq!(rate, Decimal::from_str("92.1235").unwrap());
    }

    #[tokio::test]
    async fn test_missing_rub_rate() {
        for body in [
            r#"{"rates": {}}"#,
            r#"{"rates": {"EUR": 0.92}}"#,
            r#"{"rates": {"RUB": null}}"#,
            r#"{"rates": {"RUB": 0}}"#,
            r#"{"result": "success"}"#,
        ] {
            let mock_server =
                create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;
            let result = provider_for(&mock_server).fetch_usd_to_rub().await;
            assert_eq!(result, Err(FetchError::RateUnavailable), "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = create_mock_server(ResponseTemplate::new(500)).await;

        let result = provider_for(&mock_server).fetch_usd_to_rub().await;
        assert_eq!(
            result,
            Err(FetchError::Transport(
                "HTTP error: 500 Internal Server Error".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        for body in [
            "not json at all",
            r#"{"rates": [75.5]}"#,
        ] {
            let mock_server =
                create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;
            let result = provider_for(&mock_server).fetch_usd_to_rub().await;
            assert!(
                matches!(result, Err(FetchError::Unexpected(_))),
                "body: {body}, got {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_numeric_string_rate_rejected() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"rates": {"RUB": "75.5"}}"#),
        )
        .await;

        match provider_for(&mock_server).fetch_usd_to_rub().await {
            Err(FetchError::Unexpected(message)) => {
                assert!(message.contains("RUB"), "{message}")
            }
            other => panic!("Expected unexpected-format error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"rates": {"RUB": 75.5}}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let provider = ExchangeRateApiProvider::with_timeout(
            &format!("{}/v4/latest/USD", mock_server.uri()),
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(
            provider.fetch_usd_to_rub().await,
            Err(FetchError::TimedOut)
        );
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let uri = {
            let mock_server = MockServer::start().await;
            mock_server.uri()
        };

        let provider = ExchangeRateApiProvider::new(&format!("{uri}/v4/latest/USD")).unwrap();
        let result = provider.fetch_usd_to_rub().await;
        assert!(
            matches!(result, Err(FetchError::Transport(_))),
            "got {result:?}"
        );
    }

    #[test]
    fn test_normalize_rate_bounds() {
        assert_eq!(
            normalize_rate(75.5).unwrap(),
            Decimal::from_str("75.5000").unwrap()
        );
        assert_eq!(normalize_rate(-1.0), Err(FetchError::RateUnavailable));
        assert_eq!(normalize_rate(0.00001), Err(FetchError::RateUnavailable));
        assert!(matches!(
            normalize_rate(1_000_000.0),
            Err(FetchError::Unexpected(_))
        ));
    }
}
