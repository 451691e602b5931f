use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    model::{ProcessId, ProcessRecord},
};

use super::ProcessStore;

/// In-process store. Records live as long as the store does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<ProcessId, ProcessRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessStore for MemoryStore {
    async fn fetch_record(&self, id: ProcessId) -> Result<Option<ProcessRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn save_record(&self, id: ProcessId, record: &ProcessRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(id, record.clone());
        Ok(())
    }
}
