use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::{debug, info};

use crate::{
    error::StoreError,
    model::{ProcessId, ProcessRecord},
};

use super::ProcessStore;

/// Redis-backed store. Each record is one JSON string under `process:{id}`.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        info!("Connecting to Redis");
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis connection established");
        Ok(Self { conn })
    }

    pub fn key(id: ProcessId) -> String {
        format!("process:{id}")
    }
}

#[async_trait]
impl ProcessStore for RedisStore {
    async fn fetch_record(&self, id: ProcessId) -> Result<Option<ProcessRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::key(id)).await?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn save_record(&self, id: ProcessId, record: &ProcessRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(Self::key(id), json).await?;
        debug!(process_id = id, "record written to Redis");
        Ok(())
    }
}
