//! Lookup Registrar
//!
//! Registers deposited artefacts with the lookup index that backs the stable
//! download endpoint. Each registration is one signed POST and is never
//! retried locally.

mod client;
pub mod media;
pub mod sigv4;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use client::LookupClient;
pub use media::media_type_for;

/// Entry mapping an artefact to where it can be fetched from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupItem {
    pub resource_id: String,
    pub artefact_id: String,
    pub media_type: String,
    pub origin_uri: String,
}

#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(&self, item: &LookupItem) -> Result<()>;
}
