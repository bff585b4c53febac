//! Artefact Deposit
//!
//! Deposits the artefacts listed in a metadata record into a cloud drive and
//! registers each one with a lookup index, so that a stable download URL
//! resolves to the stored object.
//!
//! # Modules
//!
//! - `auth`: bearer token providers
//! - `hash`: QuickXorHash content digests
//! - `store`: remote drive operations and the Graph client
//! - `transport`: chunked, resumable uploads
//! - `provision`: idempotent container creation
//! - `permissions`: access grants and organisation links
//! - `lookup`: signed registration with the lookup index
//! - `record`: metadata record model, validation and persistence
//! - `deposit`: the per-resource orchestrator

pub mod auth;
pub mod config;
pub mod deposit;
pub mod error;
pub mod hash;
pub mod lookup;
pub mod permissions;
pub mod provision;
pub mod record;
pub mod store;
pub mod transport;

pub use config::Config;
pub use deposit::{DepositReport, Depositor};
pub use error::{DepositError, Result};
