//! Multisig Ledger
//!
//! State components of the wallet: the immutable owner committee, the
//! treasury balance and the append-only ledger of proposed operations.

pub mod registry;
pub mod treasury;
pub mod confirmations;
pub mod journal;

pub use registry::OwnerRegistry;
pub use treasury::{BalanceChange, BalanceChangeType, BalanceReference, Treasury};
pub use confirmations::ConfirmationSet;
pub use journal::{OperationRecord, TransactionLedger};
