//! Quote records and the storage abstraction they live in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Number of fractional digits kept for a stored rate.
pub const RATE_SCALE: u32 = 4;

/// Largest rate that fits the stored precision (10 significant digits).
pub fn max_rate() -> Decimal {
    Decimal::new(9_999_999_999, RATE_SCALE)
}

/// One observed USD/RUB rate and the moment it was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub rate: Decimal,
    pub captured_at: DateTime<Utc>,
    /// Insertion sequence assigned by the store, used to order equal timestamps.
    pub seq: u64,
}

impl Display for QuoteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "USD/RUB: {} at {}",
            self.rate,
            self.captured_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("failed to encode quote record: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("malformed sequence counter of {0} bytes")]
    CorruptCounter(usize),
    #[error("quote store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only log of quotes.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Persists a new quote and returns the stored record.
    async fn append(
        &self,
        rate: Decimal,
        captured_at: DateTime<Utc>,
    ) -> Result<QuoteRecord, StoreError>;

    /// Returns up to `limit` quotes, newest first. Equal timestamps are ordered
    /// by descending insertion sequence.
    async fn recent(&self, limit: usize) -> Result<Vec<QuoteRecord>, StoreError>;
}
