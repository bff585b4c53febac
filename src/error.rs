//! Error types for the deposit pipeline

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Pipeline-wide result type
pub type Result<T> = std::result::Result<T, DepositError>;

/// The pipeline step a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Authenticate,
    LookupContainer,
    CreateContainer,
    TagContainer,
    ShareContainer,
    ResolveArtefact,
    LookupArtefact,
    OpenUploadSession,
    UploadChunk,
    VerifyHash,
    TagArtefact,
    ReadPermissions,
    InvitePrincipal,
    PublishLink,
    RegisterLookup,
    LoadRecord,
    ValidateRecord,
    SaveRecord,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Authenticate => "authenticate",
            Step::LookupContainer => "look up container",
            Step::CreateContainer => "create container",
            Step::TagContainer => "tag container",
            Step::ShareContainer => "share container",
            Step::ResolveArtefact => "resolve artefact",
            Step::LookupArtefact => "look up artefact",
            Step::OpenUploadSession => "open upload session",
            Step::UploadChunk => "upload chunk",
            Step::VerifyHash => "verify hash",
            Step::TagArtefact => "tag artefact",
            Step::ReadPermissions => "read permissions",
            Step::InvitePrincipal => "invite principal",
            Step::PublishLink => "publish link",
            Step::RegisterLookup => "register lookup",
            Step::LoadRecord => "load record",
            Step::ValidateRecord => "validate record",
            Step::SaveRecord => "save record",
        };
        f.write_str(name)
    }
}

/// Deposit error type
#[derive(Error, Debug)]
pub enum DepositError {
    #[error("Not found during {step}: {detail}")]
    NotFound { step: Step, detail: String },

    #[error("Conflict during {step}: {detail}")]
    Conflict { step: Step, detail: String },

    #[error("Hash mismatch for '{file}': local {local}, remote {remote}")]
    IntegrityMismatch {
        file: String,
        local: String,
        remote: String,
    },

    #[error("Record validation failed: {0}")]
    ValidationFailure(String),

    #[error("No media type mapping for format '{0}'")]
    MappingFailure(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Remote call failed during {step}{}: {detail}", status_suffix(.status))]
    RemoteFailure {
        step: Step,
        status: Option<u16>,
        detail: String,
    },

    #[error("Permission for '{principal}' granted but not observable on item {item_id}")]
    GrantNotObservable { principal: String, item_id: String },

    #[error("Upload of '{0}' finished without the store returning a completed item")]
    IncompleteUpload(String),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

/// Coarse error classification used in outcome reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    IntegrityMismatch,
    ValidationFailure,
    MappingFailure,
    Unauthenticated,
    RemoteFailure,
    Io,
}

impl DepositError {
    /// Wrap a transport-level error with the step it happened in
    pub fn remote(step: Step, err: impl fmt::Display) -> Self {
        DepositError::RemoteFailure {
            step,
            status: None,
            detail: err.to_string(),
        }
    }

    /// Map a non-success HTTP status to the matching error variant
    pub fn from_status(step: Step, status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 => DepositError::Unauthenticated(format!("{} rejected the credential: {}", step, detail)),
            404 => DepositError::NotFound { step, detail },
            409 => DepositError::Conflict { step, detail },
            _ => DepositError::RemoteFailure {
                step,
                status: Some(status),
                detail,
            },
        }
    }

    /// Re-label a step-scoped error with the step the caller was performing
    pub fn at(self, step: Step) -> Self {
        match self {
            DepositError::NotFound { detail, .. } => DepositError::NotFound { step, detail },
            DepositError::Conflict { detail, .. } => DepositError::Conflict { step, detail },
            DepositError::RemoteFailure { status, detail, .. } => DepositError::RemoteFailure {
                step,
                status,
                detail,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DepositError::NotFound { .. } => ErrorKind::NotFound,
            DepositError::Conflict { .. } => ErrorKind::Conflict,
            DepositError::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            DepositError::ValidationFailure(_) => ErrorKind::ValidationFailure,
            DepositError::MappingFailure(_) => ErrorKind::MappingFailure,
            DepositError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            DepositError::RemoteFailure { .. }
            | DepositError::GrantNotObservable { .. }
            | DepositError::IncompleteUpload(_)
            | DepositError::Signing(_) => ErrorKind::RemoteFailure,
            DepositError::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            DepositError::from_status(Step::LookupContainer, 404, "missing"),
            DepositError::NotFound { step: Step::LookupContainer, .. }
        ));
        assert!(matches!(
            DepositError::from_status(Step::CreateContainer, 409, "exists"),
            DepositError::Conflict { .. }
        ));
        assert!(matches!(
            DepositError::from_status(Step::UploadChunk, 401, "expired"),
            DepositError::Unauthenticated(_)
        ));
        assert!(matches!(
            DepositError::from_status(Step::UploadChunk, 503, "busy"),
            DepositError::RemoteFailure { status: Some(503), .. }
        ));
    }

    #[test]
    fn test_remote_failure_names_step() {
        let err = DepositError::from_status(Step::PublishLink, 500, "boom");
        assert_eq!(
            err.to_string(),
            "Remote call failed during publish link (HTTP 500): boom"
        );

        let err = DepositError::remote(Step::RegisterLookup, "connection reset");
        assert_eq!(
            err.to_string(),
            "Remote call failed during register lookup: connection reset"
        );
    }

    #[test]
    fn test_at_relabels_step() {
        let err = DepositError::from_status(Step::LookupArtefact, 500, "boom").at(Step::TagContainer);
        assert!(matches!(
            err,
            DepositError::RemoteFailure { step: Step::TagContainer, status: Some(500), .. }
        ));

        let err = DepositError::MappingFailure("x".to_string()).at(Step::TagContainer);
        assert!(matches!(err, DepositError::MappingFailure(_)));
    }

    #[test]
    fn test_kind_classification() {
        let err = DepositError::GrantNotObservable {
            principal: "p".to_string(),
            item_id: "i".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert_eq!(
            DepositError::MappingFailure("x".to_string()).kind(),
            ErrorKind::MappingFailure
        );
    }
}
