//! Metadata record model
//!
//! Only the parts of a record the pipeline reads or rewrites are typed. Every
//! other key is carried through the `extra` maps untouched, so loading and
//! saving a record never drops content.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DepositError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub file_identifier: String,

    #[serde(default)]
    pub identification: Identification,

    #[serde(default)]
    pub distribution: Vec<DistributionOption>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<ConstraintPermission>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintPermission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One artefact listed by the record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionOption {
    #[serde(default)]
    pub format: Href,

    #[serde(default)]
    pub transfer_option: TransferOption,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferOption {
    #[serde(default)]
    pub online_resource: Href,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Href {
    #[serde(default)]
    pub href: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DistributionOption {
    pub fn format_uri(&self) -> &str {
        &self.format.href
    }

    pub fn transfer_href(&self) -> &str {
        &self.transfer_option.online_resource.href
    }

    pub fn set_transfer_href(&mut self, href: String) {
        self.transfer_option.online_resource.href = href;
    }
}

// ============================================================================
// Access Policy
// ============================================================================

/// Who a resource's artefacts are shared with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Publish an organisation-wide view link
    Broadcast,
    /// Grant read access to these user or group object ids
    Principals(Vec<String>),
    /// No sharing beyond the drive's defaults
    Private,
}

impl AccessPolicy {
    pub fn principals(&self) -> Option<&[String]> {
        match self {
            AccessPolicy::Principals(ids) => Some(ids),
            _ => None,
        }
    }
}

impl Constraint {
    /// Derive the access policy from the first permission entry
    pub fn access_policy(&self, broadcast_alias: &str) -> Result<AccessPolicy> {
        let Some(permission) = self.permissions.first() else {
            return Ok(AccessPolicy::Private);
        };

        if let Some(aliases) = permission.alias.as_ref().filter(|a| !a.is_empty()) {
            if aliases.iter().any(|a| a == broadcast_alias) {
                return Ok(AccessPolicy::Broadcast);
            }
            return Err(DepositError::ValidationFailure(format!(
                "unsupported permission alias {:?}",
                aliases
            )));
        }

        match &permission.object_id {
            Some(ids) if !ids.is_empty() => Ok(AccessPolicy::Principals(ids.clone())),
            _ => Ok(AccessPolicy::Private),
        }
    }
}

// ============================================================================
// Transfer References
// ============================================================================

/// What a distribution option's transfer href points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferReference {
    /// Not yet deposited: a local `file://` URI
    Local(PathBuf),
    /// Deposited: the stable download URL ends with this artefact id
    Deposited(String),
}

impl TransferReference {
    pub fn classify(href: &str, download_prefix: &str) -> Result<Self> {
        if let Some(artefact_id) = href.strip_prefix(download_prefix) {
            if artefact_id.is_empty() || artefact_id.contains('/') {
                return Err(DepositError::ValidationFailure(format!(
                    "download reference '{}' has no artefact id",
                    href
                )));
            }
            return Ok(TransferReference::Deposited(artefact_id.to_string()));
        }

        match href.strip_prefix("file://") {
            Some(path) if !path.is_empty() => Ok(TransferReference::Local(PathBuf::from(path))),
            _ => Err(DepositError::ValidationFailure(format!(
                "transfer reference '{}' is neither a local file nor a deposit",
                href
            ))),
        }
    }
}
