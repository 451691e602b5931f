//! Persistence for process records.
//!
//! Every backend stores whole records keyed by process id; there is no
//! partial update and no locking. Two concurrent fetch runs against the same
//! id simply race, last writer wins.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tracing::info;

use crate::{
    config::{StoreBackend, StoreConfig},
    error::StoreError,
    model::{ProcessId, ProcessRecord},
};

pub mod file;
pub mod memory;
pub mod redis_store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[async_trait]
pub trait ProcessStore: Send + Sync + Debug {
    /// Load the record for `id`, `None` if nothing was ever saved.
    async fn fetch_record(&self, id: ProcessId) -> Result<Option<ProcessRecord>, StoreError>;

    /// Overwrite the record for `id`.
    async fn save_record(&self, id: ProcessId, record: &ProcessRecord) -> Result<(), StoreError>;
}

/// Build the configured backend.
pub async fn store_from_config(config: &StoreConfig) -> anyhow::Result<Arc<dyn ProcessStore>> {
    let store: Arc<dyn ProcessStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::new(config.resolved_data_dir()?)),
        StoreBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
    };

    info!(backend = %config.backend, "process store ready");
    Ok(store)
}
