//! Record persistence

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::types::Record;
use crate::error::{DepositError, Result, Step};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self, resource_id: &str) -> Result<Record>;

    async fn save(&self, record: &Record) -> Result<()>;
}

/// Records kept as `{dir}/{resource_id}.json`
pub struct JsonFileRecordStore {
    dir: PathBuf,
}

impl JsonFileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, resource_id: &str) -> Result<PathBuf> {
        let invalid = resource_id.is_empty()
            || resource_id.starts_with('.')
            || resource_id.contains(['/', '\\']);
        if invalid {
            return Err(DepositError::ValidationFailure(format!(
                "'{}' is not a usable resource identifier",
                resource_id
            )));
        }
        Ok(self.dir.join(format!("{}.json", resource_id)))
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn load(&self, resource_id: &str) -> Result<Record> {
        let path = self.path_for(resource_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DepositError::NotFound {
                    step: Step::LoadRecord,
                    detail: format!("no record at '{}'", path.display()),
                })
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw).map_err(|e| {
            DepositError::ValidationFailure(format!("'{}' is not a record: {}", path.display(), e))
        })
    }

    async fn save(&self, record: &Record) -> Result<()> {
        let path = self.path_for(&record.file_identifier)?;
        let mut json = serde_json::to_string_pretty(record).map_err(|e| {
            DepositError::ValidationFailure(format!("record cannot be serialised: {}", e))
        })?;
        json.push('\n');

        // Write next to the target and rename so readers never see a partial record.
        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", record.file_identifier, uuid::Uuid::new_v4()));
        tokio::fs::write(&temp, json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::info!(resource_id = %record.file_identifier, path = %path.display(), "Record saved");
        Ok(())
    }
}
