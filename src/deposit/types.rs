//! Deposit outcome types

use serde::Serialize;

use crate::error::{DepositError, ErrorKind};

/// Where an artefact is in the deposit state machine
///
/// `NotStarted → AlreadyDeposited`, or
/// `NotStarted → Uploading → Tagging → PermissionGranting → Registering → Deposited`.
/// A failure in any step ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtefactState {
    NotStarted,
    AlreadyDeposited,
    Uploading,
    Tagging,
    PermissionGranting,
    Registering,
    Deposited,
    Failed,
}

impl ArtefactState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ArtefactState::AlreadyDeposited | ArtefactState::Deposited | ArtefactState::Failed
        )
    }
}

/// Result of depositing one distribution option
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtefactOutcome {
    /// Position in the record's distribution list
    pub index: usize,

    pub artefact_id: Option<String>,

    pub existing_deposit: bool,

    pub status: ArtefactState,

    /// State the artefact was in when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_during: Option<ArtefactState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtefactOutcome {
    pub fn deposited(index: usize, artefact_id: String) -> Self {
        Self {
            index,
            artefact_id: Some(artefact_id),
            existing_deposit: false,
            status: ArtefactState::Deposited,
            failed_during: None,
            error_kind: None,
            error: None,
        }
    }

    pub fn already_deposited(index: usize, artefact_id: String) -> Self {
        Self {
            index,
            artefact_id: Some(artefact_id),
            existing_deposit: true,
            status: ArtefactState::AlreadyDeposited,
            failed_during: None,
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(
        index: usize,
        artefact_id: Option<String>,
        during: ArtefactState,
        error: &DepositError,
    ) -> Self {
        Self {
            index,
            artefact_id,
            existing_deposit: false,
            status: ArtefactState::Failed,
            failed_during: Some(during),
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ArtefactState::Failed
    }
}

/// Per-artefact outcomes for one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReport {
    pub resource_id: String,
    pub artefacts: Vec<ArtefactOutcome>,
}

impl DepositReport {
    pub fn failed(&self) -> usize {
        self.artefacts.iter().filter(|a| a.is_failed()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}
