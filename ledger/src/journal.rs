//! Append-only ledger of proposed operations.

use serde::{Deserialize, Serialize};

use multisig_common::{Address, Amount, MultisigError, Result, TxIndex};

use crate::confirmations::ConfirmationSet;
use crate::registry::OwnerRegistry;

/// A proposed transfer or call and its confirmation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Position in the ledger.
    index: TxIndex,
    /// Destination of the call or transfer.
    target: Address,
    /// Value released on execution.
    value: Amount,
    /// Opaque call data.
    payload: Vec<u8>,
    /// Owner slots that confirmed.
    confirmed_by: ConfirmationSet,
    /// Terminal flag.
    executed: bool,
}

impl OperationRecord {
    fn new(index: TxIndex, target: Address, value: Amount, payload: Vec<u8>) -> Self {
        Self {
            index,
            target,
            value,
            payload,
            confirmed_by: ConfirmationSet::new(),
            executed: false,
        }
    }

    pub fn index(&self) -> TxIndex {
        self.index
    }

    pub fn target(&self) -> Address {
        self.target
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn executed(&self) -> bool {
        self.executed
    }

    /// Number of distinct owners that confirmed.
    pub fn confirmation_count(&self) -> usize {
        self.confirmed_by.len()
    }

    /// Check whether the owner at `slot` confirmed.
    pub fn is_confirmed_by(&self, slot: usize) -> bool {
        self.confirmed_by.contains(slot)
    }

    /// Record a confirmation. Returns the new count, or `None` if the slot
    /// had already confirmed.
    pub fn add_confirmation(&mut self, slot: usize) -> Option<usize> {
        self.confirmed_by
            .insert(slot)
            .then(|| self.confirmed_by.len())
    }

    /// Withdraw a confirmation. Returns the new count, or `None` if the slot
    /// had not confirmed.
    pub fn remove_confirmation(&mut self, slot: usize) -> Option<usize> {
        self.confirmed_by
            .remove(slot)
            .then(|| self.confirmed_by.len())
    }

    /// Freeze the record. Returns `false` if it was already executed.
    pub fn mark_executed(&mut self) -> bool {
        !std::mem::replace(&mut self.executed, true)
    }

    /// Addresses of confirming owners, in committee order.
    pub fn confirmed_by(&self, registry: &OwnerRegistry) -> Vec<Address> {
        self.confirmed_by
            .iter()
            .filter_map(|slot| registry.owner_at(slot))
            .collect()
    }
}

/// Ordered store of operation records. Records are never removed or
/// reindexed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionLedger {
    records: Vec<OperationRecord>,
}

impl TransactionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh record and return its index.
    pub fn append(&mut self, target: Address, value: Amount, payload: Vec<u8>) -> TxIndex {
        let index = TxIndex::new(self.records.len() as u64);
        self.records
            .push(OperationRecord::new(index, target, value, payload));
        index
    }

    /// Get a record.
    pub fn get(&self, index: TxIndex) -> Result<&OperationRecord> {
        index
            .as_usize()
            .and_then(|i| self.records.get(i))
            .ok_or(MultisigError::NotFound(index))
    }

    /// Get a record for mutation.
    pub fn get_mut(&mut self, index: TxIndex) -> Result<&mut OperationRecord> {
        index
            .as_usize()
            .and_then(|i| self.records.get_mut(i))
            .ok_or(MultisigError::NotFound(index))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was ever submitted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in index order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationRecord> {
        self.records.iter()
    }
}
