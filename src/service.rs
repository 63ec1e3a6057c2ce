//! Throttled fetch, persist and history assembly for the current USD/RUB rate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::currency::{FetchError, RateSource};
use crate::core::quote::{QuoteRecord, RateStore};
use crate::core::throttle::{Throttle, ThrottleDecision};

/// Number of quotes returned alongside the current rate.
pub const HISTORY_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub rate: Decimal,
    pub captured_at: DateTime<Utc>,
    /// Newest first, including the quote captured by this call.
    pub history: Vec<QuoteRecord>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("Please wait {remaining_secs:.1} seconds between requests")]
    Throttled { remaining_secs: f64 },
    #[error("External service timeout")]
    UpstreamTimeout,
    #[error("Failed to fetch exchange rate from external service")]
    UpstreamUnavailable(String),
    #[error("Exchange rate for RUB not available")]
    RateUnavailable,
    #[error("Internal server error")]
    Persistence(String),
    #[error("Internal server error")]
    Unexpected(String),
}

impl From<FetchError> for RateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::TimedOut => RateError::UpstreamTimeout,
            FetchError::Transport(detail) => RateError::UpstreamUnavailable(detail),
            FetchError::RateUnavailable => RateError::RateUnavailable,
            FetchError::Unexpected(detail) => RateError::Unexpected(detail),
        }
    }
}

pub struct RateService {
    throttle: Arc<Throttle>,
    source: Arc<dyn RateSource>,
    store: Arc<dyn RateStore>,
}

impl RateService {
    pub fn new(
        throttle: Arc<Throttle>,
        source: Arc<dyn RateSource>,
        store: Arc<dyn RateStore>,
    ) -> Self {
        Self {
            throttle,
            source,
            store,
        }
    }

    /// Fetches, stores and returns the current rate as of `now`.
    ///
    /// The cooldown starts as soon as the throttle admits the call, so a failed
    /// upstream fetch still blocks further fetches until it elapses. Nothing is
    /// stored unless the upstream returned a usable rate.
    pub async fn get_current_rate(&self, now: DateTime<Utc>) -> Result<RateSnapshot, RateError> {
        if let ThrottleDecision::Denied { remaining_secs } = self.throttle.try_acquire(now).await {
            warn!("Request too frequent. Please wait {remaining_secs:.1} seconds");
            return Err(RateError::Throttled { remaining_secs });
        }

        info!("Fetching current USD exchange rate");
        let rate = self.source.fetch_usd_to_rub().await.map_err(|e| {
            error!(stage = "fetch", error = %e, "Upstream rate fetch failed");
            RateError::from(e)
        })?;

        let record = self.store.append(rate, now).await.map_err(|e| {
            error!(stage = "append", error = %e, "Failed to save exchange rate");
            RateError::Persistence(e.to_string())
        })?;
        info!(%rate, seq = record.seq, "Saved exchange rate");

        let history = self.store.recent(HISTORY_LEN).await.map_err(|e| {
            error!(stage = "history", error = %e, "Failed to load recent rates");
            RateError::Persistence(e.to_string())
        })?;

        Ok(RateSnapshot {
            rate,
            captured_at: now,
            history,
            source: self.source.source_name().to_string(),
        })
    }
}
