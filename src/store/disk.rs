use crate::core::quote::{QuoteRecord, RateStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const PARTITION: &str = "quotes";
const META_PARTITION: &str = "meta";
const SEQ_KEY: &[u8] = b"last_seq";
const KEY_LEN: usize = 16;

/// Quote log persisted in a fjall partition.
///
/// Keys are `(captured_at micros, seq)` encoded big-endian so the natural key
/// order is chronological with insertion order breaking ties. The highest
/// assigned seq lives in the `meta` partition and is written in the same batch
/// as each quote.
pub struct DiskRateStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    meta: PartitionHandle,
    /// Held across seq assignment and commit so the stored counter never goes backwards.
    last_seq: Mutex<u64>,
}

impl From<fjall::Error> for StoreError {
    fn from(e: fjall::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

fn encode_key(captured_at: DateTime<Utc>, seq: u64) -> Vec<u8> {
    // Flip the sign bit so negative timestamps still sort before positive ones.
    let ts = (captured_at.timestamp_micros() as u64) ^ (1 << 63);
    let mut key = Vec::with_capacity(KEY_LEN);
    key.extend_from_slice(&ts.to_be_bytes());
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn decode_seq(value: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = value
        .try_into()
        .map_err(|_| StoreError::CorruptCounter(value.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

impl DiskRateStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;

        let keyspace = fjall::Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition(META_PARTITION, PartitionCreateOptions::default())?;

        let last_seq = match meta.get(SEQ_KEY)? {
            Some(value) => decode_seq(&value)?,
            None => 0,
        };
        debug!(path = %path.display(), last_seq, "Opened quote store");

        Ok(Self {
            keyspace,
            partition,
            meta,
            last_seq: Mutex::new(last_seq),
        })
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn append(
        &self,
        rate: Decimal,
        captured_at: DateTime<Utc>,
    ) -> Result<QuoteRecord, StoreError> {
        let mut last_seq = self
            .last_seq
            .lock()
            .map_err(|_| StoreError::Unavailable("sequence lock poisoned".to_string()))?;
        let seq = *last_seq + 1;
        let record = QuoteRecord {
            rate,
            captured_at,
            seq,
        };

        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.partition,
            encode_key(captured_at, seq),
            serde_json::to_vec(&record)?,
        );
        batch.insert(&self.meta, SEQ_KEY, seq.to_be_bytes());
        batch.commit()?;
        *last_seq = seq;
        drop(last_seq);

        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(%rate, seq, "Quote APPEND");
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<QuoteRecord>, StoreError> {
        self.partition
            .iter()
            .rev()
            .take(limit)
            .map(|entry| -> Result<QuoteRecord, StoreError> {
                let (_, value) = entry?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }
}
