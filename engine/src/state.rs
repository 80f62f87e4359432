//! Lifecycle state of an operation record.

use serde::{Deserialize, Serialize};

use multisig_ledger::OperationRecord;

/// Status of an operation record relative to the wallet threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Below threshold, not executed.
    Pending,
    /// Quorum reached, awaiting execution.
    Ready,
    /// Executed. Terminal.
    Executed,
}

impl TransactionStatus {
    /// Derive the status of a record.
    pub fn of(record: &OperationRecord, threshold: usize) -> Self {
        if record.executed() {
            TransactionStatus::Executed
        } else if record.confirmation_count() >= threshold {
            TransactionStatus::Ready
        } else {
            TransactionStatus::Pending
        }
    }

    /// Check if this is a final state.
    pub fn is_final(&self) -> bool {
        matches!(self, TransactionStatus::Executed)
    }

    /// Check if the record may be executed.
    pub fn is_executable(&self) -> bool {
        matches!(self, TransactionStatus::Ready)
    }
}
