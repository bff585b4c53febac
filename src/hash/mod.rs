//! Content hashing
//!
//! Local files are hashed with the same digest the drive reports for stored
//! items, so an upload can be verified end to end.

mod quickxor;

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::error::Result;

pub use quickxor::{hash_bytes, QuickXorHasher, DIGEST_LEN};

/// Files are read in blocks of this size while hashing
pub const HASH_BLOCK_SIZE: usize = 1024 * 1024;

/// Stream a file through QuickXorHash and return the base64 digest
pub async fn hash_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = QuickXorHasher::new();
    let mut buffer = vec![0u8; HASH_BLOCK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize_base64())
}

/// Compare a local file against a digest reported by the store
pub async fn verify_file(path: &Path, remote_hash: &str) -> Result<bool> {
    Ok(hash_file(path).await? == remote_hash)
}
