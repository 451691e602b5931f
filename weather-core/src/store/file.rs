use async_trait::async_trait;
use std::{io::ErrorKind, path::PathBuf};
use tokio::fs;
use tracing::debug;

use crate::{
    error::StoreError,
    model::{ProcessId, ProcessRecord},
};

use super::ProcessStore;

/// Stores each record as `<dir>/<id>.json`.
///
/// Writes go to a temp file that is then renamed over the target, so a reader
/// polling progress never sees a half-written document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, id: ProcessId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ProcessStore for FileStore {
    async fn fetch_record(&self, id: ProcessId) -> Result<Option<ProcessRecord>, StoreError> {
        let path = self.record_path(id);

        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_slice(&contents)?))
    }

    async fn save_record(&self, id: ProcessId, record: &ProcessRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.record_path(id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(record)?;

        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), "record written");
        Ok(())
    }
}
