//! Chunked uploader
//!
//! Drives one resumable upload session from start to finish. Chunks go out
//! strictly in order; the first failed chunk aborts the transfer and the
//! session is left for the server to expire.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncReadExt;

use super::plan::ChunkPlan;
use crate::error::{DepositError, Result};
use crate::hash;
use crate::store::{ChunkOutcome, DriveItem, RemoteStore};

pub struct ChunkedUploader {
    store: Arc<dyn RemoteStore>,
    chunk_size: u64,
}

impl ChunkedUploader {
    pub fn new(store: Arc<dyn RemoteStore>, chunk_size: u64) -> Self {
        Self { store, chunk_size }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Upload `path` as `name` inside the container `parent_id`
    pub async fn upload(&self, parent_id: &str, name: &str, path: &Path) -> Result<DriveItem> {
        let mut file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        let plan = ChunkPlan::new(total, self.chunk_size);

        let session = self.store.create_upload_session(parent_id, name).await?;
        tracing::info!(
            file_name = %name,
            file_size = total,
            chunks = plan.full_chunks(),
            "Opened upload session"
        );

        let mut completed = None;
        for index in 0..plan.iterations() {
            let mut chunk = Vec::with_capacity(self.chunk_size as usize);
            (&mut file)
                .take(self.chunk_size)
                .read_to_end(&mut chunk)
                .await?;
            if chunk.is_empty() {
                break;
            }

            let range = match plan.range(index) {
                Some(range) if range.len() == chunk.len() as u64 => range,
                _ => {
                    return Err(DepositError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("'{}' changed size during upload", path.display()),
                    )))
                }
            };

            tracing::debug!(
                file_name = %name,
                chunk = index,
                range = %range.content_range(),
                "Uploading chunk"
            );

            match self.store.put_chunk(&session, &range, chunk).await? {
                ChunkOutcome::Completed(item) => completed = Some(item),
                ChunkOutcome::Accepted {
                    next_expected_ranges,
                } => {
                    tracing::debug!(next = ?next_expected_ranges, "Chunk accepted");
                }
            }
        }

        let item = completed.ok_or_else(|| DepositError::IncompleteUpload(name.to_string()))?;
        tracing::info!(file_name = %name, item_id = %item.id, "Upload complete");
        Ok(item)
    }

    /// Upload, then check the server-reported hash against the local file
    pub async fn upload_verified(
        &self,
        parent_id: &str,
        name: &str,
        path: &Path,
    ) -> Result<DriveItem> {
        let item = self.upload(parent_id, name, path).await?;

        let local = hash::hash_file(path).await?;
        let remote = item.quick_xor_hash().unwrap_or_default();
        if local != remote {
            tracing::warn!(file_name = %name, local = %local, remote = %remote, "Hash mismatch");
            return Err(DepositError::IntegrityMismatch {
                file: name.to_string(),
                local,
                remote: remote.to_string(),
            });
        }

        tracing::debug!(file_name = %name, hash = %local, "Hash verified");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let data: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_submits_ranges_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "a.bin", 500_000);
        let store = Arc::new(MemoryStore::new());
        let container = store.seed_container("res-1");

        let uploader = ChunkedUploader::new(store.clone(), 327_680);
        let item = uploader
            .upload_verified(&container.id, "a.bin", &path)
            .await
            .unwrap();

        assert_eq!(
            store.content_ranges(),
            vec!["bytes 0-327679/500000", "bytes 327680-499999/500000"]
        );
        assert_eq!(store.content(&item.id).unwrap(), std::fs::read(&path).unwrap());
        assert_eq!(item.parent_id(), Some(container.id.as_str()));
    }

    #[tokio::test]
    async fn test_upload_small_file_single_chunk() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "small.pdf", 10);
        let store = Arc::new(MemoryStore::new());
        let container = store.seed_container("res-1");

        let uploader = ChunkedUploader::new(store.clone(), 327_680);
        uploader
            .upload_verified(&container.id, "small.pdf", &path)
            .await
            .unwrap();

        assert_eq!(store.content_ranges(), vec!["bytes 0-9/10"]);
    }

    #[tokio::test]
    async fn test_upload_exact_multiple_has_no_trailing_chunk() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "exact.bin", 300);
        let store = Arc::new(MemoryStore::new());
        let container = store.seed_container("res-1");

        let uploader = ChunkedUploader::new(store.clone(), 100);
        uploader
            .upload_verified(&container.id, "exact.bin", &path)
            .await
            .unwrap();

        assert_eq!(
            store.content_ranges(),
            vec!["bytes 0-99/300", "bytes 100-199/300", "bytes 200-299/300"]
        );
        assert_eq!(store.calls("put_chunk"), 3);
    }

    #[tokio::test]
    async fn test_empty_file_never_completes() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "empty.bin", 0);
        let store = Arc::new(MemoryStore::new());
        let container = store.seed_container("res-1");

        let uploader = ChunkedUploader::new(store.clone(), 327_680);
        let result = uploader.upload(&container.id, "empty.bin", &path).await;

        assert!(matches!(result, Err(DepositError::IncompleteUpload(_))));
        assert_eq!(store.calls("put_chunk"), 0);
    }

    #[tokio::test]
    async fn test_chunk_failure_aborts_transfer() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "a.bin", 250);
        let store = Arc::new(MemoryStore::new());
        let container = store.seed_container("res-1");
        store.fail_on("put_chunk");

        let uploader = ChunkedUploader::new(store.clone(), 100);
        let result = uploader.upload(&container.id, "a.bin", &path).await;

        assert!(matches!(result, Err(DepositError::RemoteFailure { .. })));
        assert_eq!(store.calls("put_chunk"), 1);
    }

    #[tokio::test]
    async fn test_hash_mismatch_is_integrity_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_file(&temp_dir, "a.bin", 1_000);
        let store = Arc::new(MemoryStore::new());
        let container = store.seed_container("res-1");
        store.override_hash("AAAAAAAAAAAAAAAAAAAAAAAAAAA=");

        let uploader = ChunkedUploader::new(store.clone(), 327_680);
        let result = uploader.upload_verified(&container.id, "a.bin", &path).await;

        match result {
            Err(DepositError::IntegrityMismatch { file, remote, .. }) => {
                assert_eq!(file, "a.bin");
                assert_eq!(remote, "AAAAAAAAAAAAAAAAAAAAAAAAAAA=");
            }
            other => panic!("expected integrity mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let store = Arc::new(MemoryStore::new());
        let uploader = ChunkedUploader::new(store.clone(), 327_680);

        let result = uploader
            .upload("F1", "a.bin", Path::new("/nonexistent/a.bin"))
            .await;

        assert!(matches!(result, Err(DepositError::Io(_))));
        assert_eq!(store.total_calls(), 0);
    }
}
