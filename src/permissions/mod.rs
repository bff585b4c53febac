//! Permission Propagator
//!
//! Idempotent access grants for deposited artefacts.
//!
//! # Policies
//!
//! - **Named principals**: read access is granted on the container holding the
//!   artefact, never per object. Existing grants are detected by principal id
//!   (user or group) and skipped, and every new grant is confirmed by reading
//!   the permissions back.
//! - **Broadcast**: an organisation-scoped view link on the object itself. An
//!   existing link is reused.

use std::sync::Arc;

use crate::error::{DepositError, Result, Step};
use crate::store::{DriveItem, Permission, RemoteStore};

pub struct PermissionPropagator {
    store: Arc<dyn RemoteStore>,
}

impl PermissionPropagator {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Item grants are applied to: folders themselves, files their parent
    fn grant_target(item: &DriveItem) -> Result<String> {
        if item.is_folder() {
            return Ok(item.id.clone());
        }
        item.parent_id()
            .map(str::to_string)
            .ok_or_else(|| DepositError::NotFound {
                step: Step::ReadPermissions,
                detail: format!("item {} has no parent container", item.id),
            })
    }

    async fn permissions(&self, item_id: &str) -> Result<Vec<Permission>> {
        self.store.list_permissions(item_id).await
    }

    /// Grant read access to each principal, returning the ones newly granted
    pub async fn grant(&self, item_id: &str, principals: &[String]) -> Result<Vec<String>> {
        let item = self
            .store
            .get_item(item_id)
            .await
            .map_err(|e| e.at(Step::ReadPermissions))?;
        let target = Self::grant_target(&item)?;

        let mut granted = Vec::new();
        for principal in principals {
            let existing = self.permissions(&target).await?;
            if existing.iter().any(|p| p.is_granted_to(principal)) {
                tracing::debug!(principal = %principal, container = %target, "Already granted");
                continue;
            }

            tracing::info!(principal = %principal, container = %target, "Granting read access");
            self.store
                .invite(&target, std::slice::from_ref(principal))
                .await?;

            let confirmed = self.permissions(&target).await?;
            if !confirmed.iter().any(|p| p.is_granted_to(principal)) {
                return Err(DepositError::GrantNotObservable {
                    principal: principal.clone(),
                    item_id: target,
                });
            }
            granted.push(principal.clone());
        }

        Ok(granted)
    }

    /// Organisation view link for an object, creating one if none exists
    pub async fn publish(&self, item_id: &str) -> Result<String> {
        let existing = self
            .permissions(item_id)
            .await
            .map_err(|e| e.at(Step::PublishLink))?;
        if let Some(url) = existing.iter().find_map(|p| p.organization_view_url()) {
            tracing::debug!(item_id = %item_id, url = %url, "Reusing organisation link");
            return Ok(url.to_string());
        }

        let link = self.store.create_link(item_id).await?;
        let url = link
            .link
            .and_then(|l| l.web_url)
            .ok_or_else(|| DepositError::RemoteFailure {
                step: Step::PublishLink,
                status: None,
                detail: format!("link for item {} has no webUrl", item_id),
            })?;

        tracing::info!(item_id = %item_id, url = %url, "Published organisation link");
        Ok(url)
    }
}
