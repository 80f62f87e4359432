//! Error types for multisig wallet operations.

use crate::{Address, Amount, TxIndex};
use thiserror::Error;

/// Main error type for wallet operations.
///
/// Every error aborts the whole call; no partial state is ever left behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    /// Empty owner list or threshold outside `1..=owners`.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The null identity was supplied as an owner.
    #[error("invalid owner: {0}")]
    InvalidOwner(Address),

    /// An owner appears more than once.
    #[error("owner not unique: {0}")]
    DuplicateOwner(Address),

    /// Caller is not a committee member.
    #[error("not owner: {0}")]
    Unauthorized(Address),

    /// No record at this index.
    #[error("tx does not exist: {0}")]
    NotFound(TxIndex),

    /// Record is terminal.
    #[error("tx already executed: {0}")]
    AlreadyExecuted(TxIndex),

    /// Owner already confirmed this record.
    #[error("tx already confirmed: {index} by {owner}")]
    AlreadyConfirmed { index: TxIndex, owner: Address },

    /// Owner has no confirmation on this record to revoke.
    #[error("tx not confirmed: {index} by {owner}")]
    NotConfirmed { index: TxIndex, owner: Address },

    /// Quorum not reached.
    #[error("cannot execute tx {index}: {have} of {need} confirmations")]
    InsufficientConfirmations {
        index: TxIndex,
        have: usize,
        need: usize,
    },

    /// The external effect of execution failed; the call was rolled back.
    #[error("tx failed: {index}: {reason}")]
    ExecutionFailed { index: TxIndex, reason: String },

    /// Treasury cannot cover a release.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    /// Amount arithmetic would overflow.
    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// Call data exceeds the configured limit.
    #[error("Payload too large: {len} bytes exceeds {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

impl MultisigError {
    /// Check if this error can only arise while constructing a wallet.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MultisigError::InvalidConfiguration(_)
                | MultisigError::InvalidOwner(_)
                | MultisigError::DuplicateOwner(_)
        )
    }

    /// Get error code for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            MultisigError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            MultisigError::InvalidOwner(_) => "INVALID_OWNER",
            MultisigError::DuplicateOwner(_) => "DUPLICATE_OWNER",
            MultisigError::Unauthorized(_) => "UNAUTHORIZED",
            MultisigError::NotFound(_) => "NOT_FOUND",
            MultisigError::AlreadyExecuted(_) => "ALREADY_EXECUTED",
            MultisigError::AlreadyConfirmed { .. } => "ALREADY_CONFIRMED",
            MultisigError::NotConfirmed { .. } => "NOT_CONFIRMED",
            MultisigError::InsufficientConfirmations { .. } => "INSUFFICIENT_CONFIRMATIONS",
            MultisigError::ExecutionFailed { .. } => "EXECUTION_FAILED",
            MultisigError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            MultisigError::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
            MultisigError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }
}

/// Result type alias for wallet operations.
pub type Result<T> = std::result::Result<T, MultisigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_revert_reasons() {
        let err = MultisigError::InvalidConfiguration("owners required".to_string());
        assert!(err.to_string().contains("owners required"));

        let err = MultisigError::DuplicateOwner(Address::derive("a"));
        assert!(err.to_string().starts_with("owner not unique"));

        let err = MultisigError::InvalidOwner(Address::ZERO);
        assert!(err.to_string().starts_with("invalid owner"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MultisigError::Unauthorized(Address::ZERO).error_code(),
            "UNAUTHORIZED"
        );
        assert_eq!(
            MultisigError::NotFound(TxIndex::new(3)).error_code(),
            "NOT_FOUND"
        );
        assert!(MultisigError::DuplicateOwner(Address::ZERO).is_configuration_error());
        assert!(!MultisigError::AlreadyExecuted(TxIndex::new(0)).is_configuration_error());
    }
}
