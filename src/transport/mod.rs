//! Chunked Upload Transport
//!
//! Resumable, range-addressed uploads into the remote store:
//! - [`ChunkPlan`] computes the byte ranges for a file
//! - [`ChunkedUploader`] submits them in order and verifies the result

mod plan;
mod uploader;

pub use plan::{ByteRange, ChunkPlan};
pub use uploader::ChunkedUploader;
