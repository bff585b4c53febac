//! Metadata records
//!
//! Typed access to the record a deposit reads from and writes back to, plus
//! the validation and persistence seams the orchestrator depends on.

mod store;
mod types;
mod validate;

pub use store::{JsonFileRecordStore, RecordStore};
pub use types::{
    AccessPolicy, Constraint, ConstraintPermission, DistributionOption, Href, Identification,
    Record, TransferOption, TransferReference,
};
pub use validate::{RecordValidator, StructuralValidator};
