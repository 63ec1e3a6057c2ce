//! Upstream exchange rate abstractions

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ways an upstream rate fetch can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("upstream request timed out")]
    TimedOut,
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("RUB rate missing from upstream response")]
    RateUnavailable,
    #[error("unexpected upstream failure: {0}")]
    Unexpected(String),
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches the current USD to RUB rate, normalized to the stored precision.
    ///
    /// Implementations make a single attempt and never retry.
    async fn fetch_usd_to_rub(&self) -> Result<Decimal, FetchError>;

    /// Human readable location of the upstream, reported back to clients.
    fn source_name(&self) -> &str;
}
