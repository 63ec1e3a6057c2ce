use crate::core::quote::{QuoteRecord, RateStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Inner {
    next_seq: u64,
    records: BTreeMap<(DateTime<Utc>, u64), Decimal>,
}

/// In-memory quote log, lost on restart.
#[derive(Default)]
pub struct MemoryRateStore {
    inner: Mutex<Inner>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn append(
        &self,
        rate: Decimal,
        captured_at: DateTime<Utc>,
    ) -> Result<QuoteRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.records.insert((captured_at, seq), rate);
        debug!(%rate, seq, "Quote APPEND");
        Ok(QuoteRecord {
            rate,
            captured_at,
            seq,
        })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<QuoteRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .records
            .iter()
            .rev()
            .take(limit)
            .map(|(&(captured_at, seq), &rate)| QuoteRecord {
                rate,
                captured_at,
                seq,
            })
            .collect())
    }
}
