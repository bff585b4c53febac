//! Deposit Orchestrator
//!
//! Sequences the pipeline for every artefact of a resource:
//!
//! 1. Load and validate the record, derive the access policy
//! 2. Ensure the resource container exists (once per resource)
//! 3. Per artefact: skip if already deposited, otherwise upload and verify
//!    (or adopt an identical file left by an earlier run), tag, grant or publish access, register, and rewrite the transfer href
//! 4. Re-validate the mutated record and save it only if it is still valid
//!
//! Artefacts fail independently; one failure never stops its siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use super::types::{ArtefactOutcome, ArtefactState, DepositReport};
use crate::config::DepositConfig;
use crate::error::{DepositError, Result, Step};
use crate::hash::hash_file;
use crate::lookup::{media_type_for, LookupItem, Registrar};
use crate::permissions::PermissionPropagator;
use crate::provision::{container_fields, ContainerProvisioner};
use crate::record::{AccessPolicy, DistributionOption, RecordStore, RecordValidator, TransferReference};
use crate::store::{DriveItem, Fields, Lookup, RemoteStore};
use crate::transport::ChunkedUploader;

/// Context shared by every artefact of one resource
struct ResourceContext<'a> {
    resource_id: &'a str,
    container_id: &'a str,
    policy: &'a AccessPolicy,
}

pub struct Depositor {
    store: Arc<dyn RemoteStore>,
    provisioner: ContainerProvisioner,
    uploader: ChunkedUploader,
    permissions: PermissionPropagator,
    registrar: Arc<dyn Registrar>,
    records: Arc<dyn RecordStore>,
    validator: Arc<dyn RecordValidator>,
    config: DepositConfig,
}

impl Depositor {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        registrar: Arc<dyn Registrar>,
        records: Arc<dyn RecordStore>,
        validator: Arc<dyn RecordValidator>,
        config: DepositConfig,
    ) -> Self {
        Self {
            provisioner: ContainerProvisioner::new(store.clone()),
            uploader: ChunkedUploader::new(store.clone(), config.chunk_size),
            permissions: PermissionPropagator::new(store.clone()),
            store,
            registrar,
            records,
            validator,
            config,
        }
    }

    /// Deposit every artefact listed by the record for `resource_id`
    ///
    /// Returns per-artefact outcomes. Fails as a whole only when the record
    /// cannot be loaded, the container cannot be provisioned, or the record is
    /// invalid before or after depositing; an invalid record is never saved.
    pub async fn deposit_resource(&self, resource_id: &str) -> Result<DepositReport> {
        tracing::info!(resource_id = %resource_id, "Depositing resource artefacts");

        let mut record = self.records.load(resource_id).await?;
        if record.file_identifier != resource_id {
            return Err(DepositError::ValidationFailure(format!(
                "record for '{}' has file_identifier '{}'",
                resource_id, record.file_identifier
            )));
        }
        self.validator.validate(&record)?;

        let policy = record
            .identification
            .constraints
            .first()
            .ok_or_else(|| {
                DepositError::ValidationFailure(format!("record '{}' has no constraints", resource_id))
            })?
            .access_policy(&self.config.broadcast_alias)?;
        tracing::debug!(resource_id = %resource_id, policy = ?policy, "Access policy");

        let container = self
            .provisioner
            .ensure_container(resource_id, &container_fields(resource_id), policy.principals())
            .await?;

        let context = ResourceContext {
            resource_id,
            container_id: &container.item.id,
            policy: &policy,
        };

        let total = record.distribution.len();
        let mut artefacts = Vec::with_capacity(total);
        for (index, option) in record.distribution.iter_mut().enumerate() {
            tracing::info!(
                resource_id = %resource_id,
                artefact = index + 1,
                total,
                "Processing distribution option"
            );
            let outcome = self.deposit_artefact(&context, index, option).await;
            artefacts.push(outcome);
        }

        if let Err(e) = self.validator.validate(&record) {
            tracing::error!(resource_id = %resource_id, error = %e, "Deposited record is invalid, not saving");
            return Err(e);
        }
        self.records.save(&record).await?;

        let report = DepositReport {
            resource_id: resource_id.to_string(),
            artefacts,
        };
        tracing::info!(
            resource_id = %resource_id,
            artefacts = report.artefacts.len(),
            failed = report.failed(),
            "Deposit finished"
        );
        Ok(report)
    }

    async fn deposit_artefact(
        &self,
        context: &ResourceContext<'_>,
        index: usize,
        option: &mut DistributionOption,
    ) -> ArtefactOutcome {
        let reference = match TransferReference::classify(
            option.transfer_href(),
            &self.config.download_prefix(),
        ) {
            Ok(reference) => reference,
            Err(e) => return ArtefactOutcome::failed(index, None, ArtefactState::NotStarted, &e),
        };

        let path = match reference {
            TransferReference::Deposited(artefact_id) => {
                tracing::info!(artefact_id = %artefact_id, "Artefact already deposited");
                return ArtefactOutcome::already_deposited(index, artefact_id);
            }
            TransferReference::Local(path) => path,
        };

        let artefact_id = Uuid::new_v4().to_string();
        let mut state = ArtefactState::NotStarted;

        match self
            .deposit_local(context, &artefact_id, &path, option.format_uri(), &mut state)
            .await
        {
            Ok(()) => {
                option.set_transfer_href(self.config.download_url(&artefact_id));
                tracing::info!(
                    resource_id = %context.resource_id,
                    artefact_id = %artefact_id,
                    "Artefact deposited"
                );
                ArtefactOutcome::deposited(index, artefact_id)
            }
            Err(e) => {
                tracing::warn!(
                    resource_id = %context.resource_id,
                    artefact_id = %artefact_id,
                    state = ?state,
                    error = %e,
                    "Artefact deposit failed"
                );
                ArtefactOutcome::failed(index, Some(artefact_id), state, &e)
            }
        }
    }

    /// Upload a local artefact and register it, tracking progress in `state`
    async fn deposit_local(
        &self,
        context: &ResourceContext<'_>,
        artefact_id: &str,
        path: &Path,
        format_uri: &str,
        state: &mut ArtefactState,
    ) -> Result<()> {
        let (path, name) = resolve_artefact(path).await?;
        let media_type = media_type_for(format_uri)?;

        let item = match self.store.find_child(context.container_id, &name).await? {
            Lookup::Found(existing) => adopt_existing(context, &name, &path, existing).await?,
            Lookup::NotFound => {
                *state = ArtefactState::Uploading;
                self.uploader
                    .upload_verified(context.container_id, &name, &path)
                    .await?
            }
        };

        *state = ArtefactState::Tagging;
        let mut fields = Fields::new();
        fields.insert("resource_id".to_string(), context.resource_id.to_string());
        fields.insert("artefact_id".to_string(), artefact_id.to_string());
        self.store.set_fields(&item.id, &fields).await?;

        *state = ArtefactState::PermissionGranting;
        let origin_uri = match context.policy {
            AccessPolicy::Broadcast => self.permissions.publish(&item.id).await?,
            AccessPolicy::Principals(principals) => {
                self.permissions.grant(&item.id, principals).await?;
                item_url(&item)?
            }
            AccessPolicy::Private => item_url(&item)?,
        };

        *state = ArtefactState::Registering;
        let lookup = LookupItem {
            resource_id: context.resource_id.to_string(),
            artefact_id: artefact_id.to_string(),
            media_type: media_type.to_string(),
            origin_uri,
        };
        self.registrar.register(&lookup).await?;

        *state = ArtefactState::Deposited;
        Ok(())
    }
}

/// Canonical path and file name of a local artefact
async fn resolve_artefact(path: &Path) -> Result<(PathBuf, String)> {
    let not_found = |detail: String| DepositError::NotFound {
        step: Step::ResolveArtefact,
        detail,
    };

    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| not_found(format!("artefact path '{}': {}", path.display(), e)))?;
    let metadata = tokio::fs::metadata(&resolved).await?;
    if !metadata.is_file() {
        return Err(not_found(format!("'{}' is not a file", resolved.display())));
    }

    let name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| not_found(format!("'{}' has no file name", resolved.display())))?;
    Ok((resolved, name))
}

/// Reuse a file left in the container by an earlier interrupted run
///
/// Only a file with the same content is adopted; anything else under the
/// same name is a conflict.
async fn adopt_existing(
    context: &ResourceContext<'_>,
    name: &str,
    path: &Path,
    existing: DriveItem,
) -> Result<DriveItem> {
    let local = hash_file(path).await?;
    if existing.quick_xor_hash() == Some(local.as_str()) {
        tracing::info!(
            resource_id = %context.resource_id,
            file_name = %name,
            item_id = %existing.id,
            "Artefact already uploaded, resuming"
        );
        return Ok(existing);
    }

    Err(DepositError::Conflict {
        step: Step::LookupArtefact,
        detail: format!(
            "'{}' already exists in container {} as item {} with different content (local {}, remote {})",
            name,
            context.container_id,
            existing.id,
            local,
            existing.quick_xor_hash().unwrap_or("none")
        ),
    })
}

fn item_url(item: &DriveItem) -> Result<String> {
    item.web_url.clone().ok_or_else(|| DepositError::RemoteFailure {
        step: Step::UploadChunk,
        status: None,
        detail: format!("uploaded item {} has no webUrl", item.id),
    })
}
