//! Record validation

use super::types::{Record, TransferReference};
use crate::error::{DepositError, Result};

/// Checks a record before it is deposited and again before it is saved
pub trait RecordValidator: Send + Sync {
    fn validate(&self, record: &Record) -> Result<()>;
}

/// Structural checks for the parts of a record the pipeline relies on
pub struct StructuralValidator {
    download_prefix: String,
}

impl StructuralValidator {
    pub fn new(download_prefix: impl Into<String>) -> Self {
        Self {
            download_prefix: download_prefix.into(),
        }
    }
}

impl RecordValidator for StructuralValidator {
    fn validate(&self, record: &Record) -> Result<()> {
        if record.file_identifier.trim().is_empty() {
            return Err(DepositError::ValidationFailure(
                "record has no file_identifier".to_string(),
            ));
        }

        if record.identification.constraints.is_empty() {
            return Err(DepositError::ValidationFailure(format!(
                "record '{}' has no identification.constraints",
                record.file_identifier
            )));
        }

        for (index, option) in record.distribution.iter().enumerate() {
            if option.format_uri().is_empty() {
                return Err(DepositError::ValidationFailure(format!(
                    "distribution[{}] has no format.href",
                    index
                )));
            }
            TransferReference::classify(option.transfer_href(), &self.download_prefix).map_err(
                |e| DepositError::ValidationFailure(format!("distribution[{}]: {}", index, e)),
            )?;
        }

        Ok(())
    }
}
