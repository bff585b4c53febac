//! Deposit pipeline entry point

mod orchestrator;
mod types;

pub use orchestrator::Depositor;
pub use types::{ArtefactOutcome, ArtefactState, DepositReport};
