pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::quote::RateStore;
use anyhow::{Context, Result};
use disk::DiskRateStore;
use memory::MemoryRateStore;
use std::sync::Arc;
use tracing::info;

/// Opens the quote store for the given config.
///
/// With `ephemeral` set, quotes are kept in memory only.
pub fn open_store(config: &AppConfig, ephemeral: bool) -> Result<Arc<dyn RateStore>> {
    if ephemeral {
        info!("Using in-memory quote store");
        return Ok(Arc::new(MemoryRateStore::new()));
    }

    let path = config.data_dir()?.join("quotes");
    let store = DiskRateStore::open(&path)
        .with_context(|| format!("Failed to open quote store at {}", path.display()))?;
    info!("Using quote store at {}", path.display());
    Ok(Arc::new(store))
}
