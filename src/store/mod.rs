//! Remote Store
//!
//! The drive that holds containers and uploaded artefacts. Components talk to
//! it through [`RemoteStore`] so the pipeline can run against the real drive
//! API ([`GraphClient`]) or an in-memory fake in tests.

mod graph;
pub mod types;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::config::HttpConfig;
use crate::error::{DepositError, Result, Step};
use crate::transport::ByteRange;

pub use graph::GraphClient;
pub use types::{
    ChunkOutcome, DriveItem, Fields, Lookup, Permission, SharingLink, UploadSession,
};

/// Operations the deposit pipeline needs from the remote drive
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Look up a top-level container by name
    async fn find_container(&self, name: &str) -> Result<Lookup<DriveItem>>;

    /// Look up an item by name inside a container
    async fn find_child(&self, parent_id: &str, name: &str) -> Result<Lookup<DriveItem>>;

    async fn get_item(&self, item_id: &str) -> Result<DriveItem>;

    /// Create a top-level container, failing if the name is already taken
    async fn create_container(&self, name: &str) -> Result<DriveItem>;

    /// Open a resumable upload session for `name` inside `parent_id`
    async fn create_upload_session(&self, parent_id: &str, name: &str) -> Result<UploadSession>;

    /// Submit one byte range of an open session
    async fn put_chunk(
        &self,
        session: &UploadSession,
        range: &ByteRange,
        bytes: Vec<u8>,
    ) -> Result<ChunkOutcome>;

    /// Set descriptive fields on an item's list entry
    async fn set_fields(&self, item_id: &str, fields: &Fields) -> Result<()>;

    async fn list_permissions(&self, item_id: &str) -> Result<Vec<Permission>>;

    /// Grant read access to principals, sign-in required, without notification
    async fn invite(&self, item_id: &str, principals: &[String]) -> Result<Vec<Permission>>;

    /// Create an organisation-scoped view link
    async fn create_link(&self, item_id: &str) -> Result<Permission>;
}

/// Build the shared HTTP client with the configured timeouts
pub fn build_http_client(config: &HttpConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Pass successful responses through; map everything else to an error for `step`
pub(crate) async fn ensure_success(
    step: Step,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(step = %step, status = status.as_u16(), body = %body, "Remote call rejected");
    Err(DepositError::from_status(step, status.as_u16(), body))
}
