//! The owner committee and its confirmation threshold.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use multisig_common::{Address, MultisigError, Result};

/// Immutable committee of wallet owners.
///
/// Each owner is assigned a slot equal to its position in the construction
/// list; confirmation bitsets are keyed by slot.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerRegistry {
    /// Owners in construction order.
    owners: Vec<Address>,
    /// Owner to slot.
    #[serde(skip)]
    slots: HashMap<Address, usize>,
    /// Confirmations required to execute.
    threshold: usize,
}

impl OwnerRegistry {
    /// Validate and build a committee.
    ///
    /// Checks run in a fixed order: empty list, threshold range, null
    /// identities anywhere in the list, then duplicates.
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self> {
        if owners.is_empty() {
            return Err(MultisigError::InvalidConfiguration(
                "owners required".to_string(),
            ));
        }

        if threshold == 0 || threshold > owners.len() {
            return Err(MultisigError::InvalidConfiguration(format!(
                "invalid number of required confirmations: {} of {} owners",
                threshold,
                owners.len()
            )));
        }

        if let Some(zero) = owners.iter().find(|o| o.is_zero()) {
            return Err(MultisigError::InvalidOwner(*zero));
        }

        let mut slots = HashMap::with_capacity(owners.len());
        for (slot, owner) in owners.iter().enumerate() {
            if slots.insert(*owner, slot).is_some() {
                return Err(MultisigError::DuplicateOwner(*owner));
            }
        }

        debug!(owners = owners.len(), threshold, "Owner registry initialized");

        Ok(Self {
            owners,
            slots,
            threshold,
        })
    }

    /// Check committee membership.
    pub fn is_owner(&self, identity: &Address) -> bool {
        self.slots.contains_key(identity)
    }

    /// Owners in construction order.
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Confirmations required to execute.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Committee size.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Slot of an owner, or `None` for non-members.
    pub fn slot_of(&self, identity: &Address) -> Option<usize> {
        self.slots.get(identity).copied()
    }

    /// Owner at a slot.
    pub fn owner_at(&self, slot: usize) -> Option<Address> {
        self.owners.get(slot).copied()
    }
}
