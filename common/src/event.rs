//! Facts emitted by the wallet for log and indexing consumers.

use crate::{Address, Amount, TxIndex};
use serde::{Deserialize, Serialize};

/// An observable fact produced by a committed wallet operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum WalletEvent {
    /// Inbound value accepted.
    Deposit {
        from: Address,
        amount: Amount,
        resulting_balance: Amount,
    },
    /// New operation record proposed.
    SubmitTransaction {
        index: TxIndex,
        caller: Address,
        target: Address,
        value: Amount,
        payload: Vec<u8>,
    },
    /// Owner confirmed a record.
    ConfirmTransaction {
        index: TxIndex,
        caller: Address,
        new_count: usize,
    },
    /// Owner withdrew a confirmation.
    RevokeConfirmation {
        index: TxIndex,
        caller: Address,
        new_count: usize,
    },
    /// Record executed.
    ExecuteTransaction { index: TxIndex, caller: Address },
}

impl WalletEvent {
    /// Short name of the fact.
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::Deposit { .. } => "Deposit",
            WalletEvent::SubmitTransaction { .. } => "SubmitTransaction",
            WalletEvent::ConfirmTransaction { .. } => "ConfirmTransaction",
            WalletEvent::RevokeConfirmation { .. } => "RevokeConfirmation",
            WalletEvent::ExecuteTransaction { .. } => "ExecuteTransaction",
        }
    }

    /// Record index the fact refers to, if any.
    pub fn index(&self) -> Option<TxIndex> {
        match self {
            WalletEvent::Deposit { .. } => None,
            WalletEvent::SubmitTransaction { index, .. }
            | WalletEvent::ConfirmTransaction { index, .. }
            | WalletEvent::RevokeConfirmation { index, .. }
            | WalletEvent::ExecuteTransaction { index, .. } => Some(*index),
        }
    }
}

/// A committed fact with its position in the wallet's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, starting at 0.
    pub sequence: u64,
    /// The fact.
    pub event: WalletEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = WalletEvent::ConfirmTransaction {
            index: TxIndex::new(0),
            caller: Address::derive("bob"),
            new_count: 1,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "ConfirmTransaction");
        assert_eq!(value["index"], 0);
        assert_eq!(value["new_count"], 1);
    }

    #[test]
    fn test_event_index() {
        let deposit = WalletEvent::Deposit {
            from: Address::ZERO,
            amount: Amount::new(1),
            resulting_balance: Amount::new(1),
        };
        assert_eq!(deposit.index(), None);
        assert_eq!(deposit.name(), "Deposit");

        let execute = WalletEvent::ExecuteTransaction {
            index: TxIndex::new(4),
            caller: Address::derive("a"),
        };
        assert_eq!(execute.index(), Some(TxIndex::new(4)));
    }
}
