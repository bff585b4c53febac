//! In-memory drive used by the pipeline tests
//!
//! Records every call so tests can assert how often each remote operation ran,
//! and computes real QuickXorHash digests for committed uploads.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::types::{
    ChunkOutcome, DriveItem, FileFacet, Fields, Hashes, Identity, ItemReference, Lookup,
    Permission, SharePointIdentitySet, SharingLink, UploadSession,
};
use super::RemoteStore;
use crate::error::{DepositError, Result, Step};
use crate::hash::hash_bytes;
use crate::transport::ByteRange;

struct PendingUpload {
    parent_id: String,
    name: String,
    received: Vec<u8>,
}

#[derive(Default)]
struct State {
    items: HashMap<String, DriveItem>,
    contents: HashMap<String, Vec<u8>>,
    sessions: HashMap<String, PendingUpload>,
    fields: HashMap<String, Fields>,
    permissions: HashMap<String, Vec<Permission>>,
    calls: Vec<&'static str>,
    content_ranges: Vec<String>,
    failing: HashSet<&'static str>,
    hash_override: Option<String>,
    hide_grants: bool,
    next_id: u64,
}

impl State {
    fn record(&mut self, op: &'static str, step: Step) -> Result<()> {
        self.calls.push(op);
        if self.failing.contains(op) {
            return Err(DepositError::from_status(step, 500, format!("{} failed", op)));
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn child(&self, parent_id: Option<&str>, name: &str) -> Option<DriveItem> {
        self.items
            .values()
            .find(|item| item.name == name && item.parent_id() == parent_id)
            .cloned()
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the drive already holds a container
    pub fn seed_container(&self, name: &str) -> DriveItem {
        let mut state = self.state.lock();
        let item = DriveItem {
            id: state.next_id("F"),
            name: name.to_string(),
            web_url: Some(format!("https://drive.test/{}", name)),
            folder: Some(serde_json::json!({})),
            ..Default::default()
        };
        state.items.insert(item.id.clone(), item.clone());
        item
    }

    /// Pretend a file already exists inside a container
    pub fn seed_file(&self, parent_id: &str, name: &str, data: &[u8]) -> DriveItem {
        let mut state = self.state.lock();
        let item = file_item(state.next_id("I"), parent_id, name, hash_bytes(data));
        state.contents.insert(item.id.clone(), data.to_vec());
        state.items.insert(item.id.clone(), item.clone());
        item
    }

    pub fn fail_on(&self, op: &'static str) {
        self.state.lock().failing.insert(op);
    }

    /// Report this digest for every committed upload instead of the real one
    pub fn override_hash(&self, hash: &str) {
        self.state.lock().hash_override = Some(hash.to_string());
    }

    /// Accept invitations without the grants ever showing up in listings
    pub fn hide_grants(&self) {
        self.state.lock().hide_grants = true;
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn content_ranges(&self) -> Vec<String> {
        self.state.lock().content_ranges.clone()
    }

    pub fn fields(&self, item_id: &str) -> Option<Fields> {
        self.state.lock().fields.get(item_id).cloned()
    }

    pub fn permissions(&self, item_id: &str) -> Vec<Permission> {
        self.state
            .lock()
            .permissions
            .get(item_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn content(&self, item_id: &str) -> Option<Vec<u8>> {
        self.state.lock().contents.get(item_id).cloned()
    }

    pub fn container(&self, name: &str) -> Option<DriveItem> {
        self.state.lock().child(None, name)
    }
}

fn file_item(id: String, parent_id: &str, name: &str, hash: String) -> DriveItem {
    DriveItem {
        web_url: Some(format!("https://drive.test/{}/{}", parent_id, name)),
        file: Some(FileFacet {
            mime_type: None,
            hashes: Some(Hashes {
                quick_xor_hash: Some(hash),
            }),
        }),
        parent_reference: Some(ItemReference {
            id: Some(parent_id.to_string()),
            drive_id: Some("memory".to_string()),
        }),
        id,
        name: name.to_string(),
        folder: None,
    }
}

fn missing(step: Step, what: &str) -> DepositError {
    DepositError::NotFound {
        step,
        detail: format!("no item '{}'", what),
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn find_container(&self, name: &str) -> Result<Lookup<DriveItem>> {
        let mut state = self.state.lock();
        state.record("find_container", Step::LookupContainer)?;
        Ok(match state.child(None, name) {
            Some(item) => Lookup::Found(item),
            None => Lookup::NotFound,
        })
    }

    async fn find_child(&self, parent_id: &str, name: &str) -> Result<Lookup<DriveItem>> {
        let mut state = self.state.lock();
        state.record("find_child", Step::LookupArtefact)?;
        Ok(match state.child(Some(parent_id), name) {
            Some(item) => Lookup::Found(item),
            None => Lookup::NotFound,
        })
    }

    async fn get_item(&self, item_id: &str) -> Result<DriveItem> {
        let mut state = self.state.lock();
        state.record("get_item", Step::LookupArtefact)?;
        state
            .items
            .get(item_id)
            .cloned()
            .ok_or_else(|| missing(Step::LookupArtefact, item_id))
    }

    async fn create_container(&self, name: &str) -> Result<DriveItem> {
        let mut state = self.state.lock();
        state.record("create_container", Step::CreateContainer)?;
        if state.child(None, name).is_some() {
            return Err(DepositError::from_status(
                Step::CreateContainer,
                409,
                format!("'{}' already exists", name),
            ));
        }

        let item = DriveItem {
            id: state.next_id("F"),
            name: name.to_string(),
            web_url: Some(format!("https://drive.test/{}", name)),
            folder: Some(serde_json::json!({})),
            ..Default::default()
        };
        state.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn create_upload_session(&self, parent_id: &str, name: &str) -> Result<UploadSession> {
        let mut state = self.state.lock();
        state.record("create_upload_session", Step::OpenUploadSession)?;
        if !state.items.contains_key(parent_id) {
            return Err(missing(Step::OpenUploadSession, parent_id));
        }
        if state.child(Some(parent_id), name).is_some() {
            return Err(DepositError::from_status(
                Step::OpenUploadSession,
                409,
                format!("'{}' already exists", name),
            ));
        }

        let upload_url = format!("https://upload.test/{}", state.next_id("S"));
        state.sessions.insert(
            upload_url.clone(),
            PendingUpload {
                parent_id: parent_id.to_string(),
                name: name.to_string(),
                received: Vec::new(),
            },
        );
        Ok(UploadSession {
            upload_url,
            expiration_date_time: None,
            next_expected_ranges: vec!["0-".to_string()],
        })
    }

    async fn put_chunk(
        &self,
        session: &UploadSession,
        range: &ByteRange,
        bytes: Vec<u8>,
    ) -> Result<ChunkOutcome> {
        let mut state = self.state.lock();
        state.record("put_chunk", Step::UploadChunk)?;
        state.content_ranges.push(range.content_range());

        let Some(pending) = state.sessions.get_mut(&session.upload_url) else {
            return Err(missing(Step::UploadChunk, &session.upload_url));
        };
        if range.start != pending.received.len() as u64 || range.len() != bytes.len() as u64 {
            return Err(DepositError::from_status(
                Step::UploadChunk,
                416,
                format!(
                    "range {} does not follow {} received bytes",
                    range.content_range(),
                    pending.received.len()
                ),
            ));
        }
        pending.received.extend_from_slice(&bytes);

        let received = pending.received.len() as u64;
        if received < range.total {
            return Ok(ChunkOutcome::Accepted {
                next_expected_ranges: vec![format!("{}-", received)],
            });
        }

        let Some(pending) = state.sessions.remove(&session.upload_url) else {
            return Err(missing(Step::UploadChunk, &session.upload_url));
        };
        let hash = state
            .hash_override
            .clone()
            .unwrap_or_else(|| hash_bytes(&pending.received));
        let item = file_item(state.next_id("I"), &pending.parent_id, &pending.name, hash);
        state.contents.insert(item.id.clone(), pending.received);
        state.items.insert(item.id.clone(), item.clone());
        Ok(ChunkOutcome::Completed(item))
    }

    async fn set_fields(&self, item_id: &str, fields: &Fields) -> Result<()> {
        let mut state = self.state.lock();
        state.record("set_fields", Step::TagArtefact)?;
        if !state.items.contains_key(item_id) {
            return Err(missing(Step::TagArtefact, item_id));
        }
        state
            .fields
            .entry(item_id.to_string())
            .or_default()
            .extend(fields.clone());
        Ok(())
    }

    async fn list_permissions(&self, item_id: &str) -> Result<Vec<Permission>> {
        let mut state = self.state.lock();
        state.record("list_permissions", Step::ReadPermissions)?;
        Ok(state.permissions.get(item_id).cloned().unwrap_or_default())
    }

    async fn invite(&self, item_id: &str, principals: &[String]) -> Result<Vec<Permission>> {
        let mut state = self.state.lock();
        state.record("invite", Step::InvitePrincipal)?;

        let mut granted = Vec::new();
        for principal in principals {
            let permission = Permission {
                id: state.next_id("P"),
                roles: vec!["read".to_string()],
                link: None,
                granted_to: Some(SharePointIdentitySet {
                    user: Some(Identity {
                        id: Some(principal.clone()),
                        display_name: None,
                    }),
                    group: None,
                }),
            };
            granted.push(permission);
        }

        if !state.hide_grants {
            state
                .permissions
                .entry(item_id.to_string())
                .or_default()
                .extend(granted.iter().cloned());
        }
        Ok(granted)
    }

    async fn create_link(&self, item_id: &str) -> Result<Permission> {
        let mut state = self.state.lock();
        state.record("create_link", Step::PublishLink)?;

        let id = state.next_id("L");
        let permission = Permission {
            roles: vec!["read".to_string()],
            link: Some(SharingLink {
                link_type: Some("view".to_string()),
                scope: Some("organization".to_string()),
                web_url: Some(format!("https://share.test/{}", id)),
            }),
            granted_to: None,
            id,
        };
        state
            .permissions
            .entry(item_id.to_string())
            .or_default()
            .push(permission.clone());
        Ok(permission)
    }
}
