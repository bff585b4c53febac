//! Remote store types
//!
//! Wire shapes for the drive API, trimmed to the fields the pipeline reads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Items
// ============================================================================

/// A file or folder entry in the drive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFacet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<ItemReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Hashes>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hashes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_xor_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
}

impl DriveItem {
    /// Server-computed QuickXorHash, if the item is a file
    pub fn quick_xor_hash(&self) -> Option<&str> {
        self.file
            .as_ref()
            .and_then(|f| f.hashes.as_ref())
            .and_then(|h| h.quick_xor_hash.as_deref())
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_reference
            .as_ref()
            .and_then(|p| p.id.as_deref())
    }

    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

/// Outcome of a lookup that may legitimately miss
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// Descriptive list-item fields attached to items
pub type Fields = BTreeMap<String, String>;

// ============================================================================
// Upload Sessions
// ============================================================================

/// Server-side resumable upload session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub upload_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
}

/// Result of submitting one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// More bytes expected
    Accepted { next_expected_ranges: Vec<String> },
    /// The final chunk committed the file
    Completed(DriveItem),
}

// ============================================================================
// Permissions
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<SharingLink>,

    #[serde(default, rename = "grantedToV2", skip_serializing_if = "Option::is_none")]
    pub granted_to: Option<SharePointIdentitySet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingLink {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePointIdentitySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Identity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Permission {
    /// True when the grant names `principal` as a user or a group
    pub fn is_granted_to(&self, principal: &str) -> bool {
        let Some(granted) = &self.granted_to else {
            return false;
        };
        [&granted.user, &granted.group]
            .into_iter()
            .flatten()
            .any(|identity| identity.id.as_deref() == Some(principal))
    }

    /// Organisation-scoped view link, if this permission is one
    pub fn organization_view_url(&self) -> Option<&str> {
        let link = self.link.as_ref()?;
        let is_view = link.link_type.as_deref() == Some("view");
        let is_org = link.scope.as_deref() == Some("organization");
        if is_view && is_org {
            link.web_url.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_item_from_graph_json() {
        let item: DriveItem = serde_json::from_str(
            r#"{
                "id": "01ABC",
                "name": "report.pdf",
                "webUrl": "https://tenant.sharepoint.com/report.pdf",
                "size": 1024,
                "file": {
                    "mimeType": "application/pdf",
                    "hashes": { "quickXorHash": "aCgDG9jwBhDc4Q1yawMZAAAAAAA=" }
                },
                "parentReference": { "id": "01PARENT", "driveId": "b!drive" }
            }"#,
        )
        .unwrap();

        assert_eq!(item.quick_xor_hash(), Some("aCgDG9jwBhDc4Q1yawMZAAAAAAA="));
        assert_eq!(item.parent_id(), Some("01PARENT"));
        assert!(!item.is_folder());
    }

    #[test]
    fn test_permission_matches_user_and_group() {
        let user: Permission = serde_json::from_str(
            r#"{"id": "p1", "roles": ["read"], "grantedToV2": {"user": {"id": "u-1", "displayName": "Ann"}}}"#,
        )
        .unwrap();
        let group: Permission = serde_json::from_str(
            r#"{"id": "p2", "roles": ["read"], "grantedToV2": {"group": {"id": "g-1"}}}"#,
        )
        .unwrap();

        assert!(user.is_granted_to("u-1"));
        assert!(!user.is_granted_to("g-1"));
        assert!(group.is_granted_to("g-1"));
        assert!(!Permission::default().is_granted_to("u-1"));
    }

    #[test]
    fn test_organization_view_link() {
        let link: Permission = serde_json::from_str(
            r#"{"id": "l1", "roles": ["read"], "link": {"type": "view", "scope": "organization", "webUrl": "https://share/x"}}"#,
        )
        .unwrap();
        let anonymous: Permission = serde_json::from_str(
            r#"{"id": "l2", "link": {"type": "view", "scope": "anonymous", "webUrl": "https://share/y"}}"#,
        )
        .unwrap();

        assert_eq!(link.organization_view_url(), Some("https://share/x"));
        assert_eq!(anonymous.organization_view_url(), None);
    }
}
