//! Container Provisioner
//!
//! Makes sure the container for a resource exists exactly once:
//! - an existing container is returned untouched
//! - a missing one is created (conflict policy "fail"), tagged, and shared
//!
//! Calls for the same name are serialised through a per-name lock so two
//! callers in one process cannot both reach the creation step. A lock entry
//! lives only while some caller is using it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, Step};
use crate::store::{DriveItem, Fields, Lookup, RemoteStore};

/// Placeholder artefact id used when tagging a container
pub const CONTAINER_ARTEFACT_ID: &str = "-";

/// Fields a resource container is tagged with on creation
pub fn container_fields(resource_id: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("resource_id".to_string(), resource_id.to_string());
    fields.insert("artefact_id".to_string(), CONTAINER_ARTEFACT_ID.to_string());
    fields
}

#[derive(Debug, Clone)]
pub struct ProvisionedContainer {
    pub item: DriveItem,
    /// True when this call created the container
    pub created: bool,
}

pub struct ContainerProvisioner {
    store: Arc<dyn RemoteStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContainerProvisioner {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Drop the lock entry for `name` once no other caller holds it
    fn release(&self, name: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(name).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(name);
        }
    }

    /// Look up `name`, creating and tagging it if it does not exist yet
    ///
    /// Principals, when given, receive a read-only, sign-in-required grant on
    /// a newly created container without being notified.
    pub async fn ensure_container(
        &self,
        name: &str,
        metadata: &Fields,
        principals: Option<&[String]>,
    ) -> Result<ProvisionedContainer> {
        let lock = self.lock_for(name);
        let result = {
            let _guard = lock.lock().await;
            self.provision(name, metadata, principals).await
        };
        self.release(name, lock);
        result
    }

    async fn provision(
        &self,
        name: &str,
        metadata: &Fields,
        principals: Option<&[String]>,
    ) -> Result<ProvisionedContainer> {
        if let Lookup::Found(item) = self.store.find_container(name).await? {
            tracing::info!(container = %name, item_id = %item.id, "Container already exists");
            return Ok(ProvisionedContainer {
                item,
                created: false,
            });
        }

        tracing::info!(container = %name, "Creating container");
        let item = self.store.create_container(name).await?;

        tracing::debug!(container = %name, fields = ?metadata, "Tagging container");
        self.store
            .set_fields(&item.id, metadata)
            .await
            .map_err(|e| e.at(Step::TagContainer))?;

        if let Some(principals) = principals.filter(|p| !p.is_empty()) {
            tracing::info!(
                container = %name,
                principals = principals.len(),
                "Sharing container"
            );
            // One invitation carries every principal; grants on artefacts go one by one.
            self.store
                .invite(&item.id, principals)
                .await
                .map_err(|e| e.at(Step::ShareContainer))?;
        }

        Ok(ProvisionedContainer {
            item,
            created: true,
        })
    }
}
