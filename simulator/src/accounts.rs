//! Simulated external accounts receiving wallet calls.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use multisig_common::{Address, Amount};
use multisig_engine::{AuthorizationEngine, CallHandler, CallRejection, OutboundCall};

/// How an account reacts to an incoming call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountBehavior {
    /// Accept every call.
    #[default]
    Accept,
    /// Reject every call.
    Revert,
    /// Try to execute the same record again before accepting.
    Reenter,
}

/// A simulated account.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedAccount {
    /// Account label.
    pub label: String,
    /// Derived address.
    pub address: Address,
    /// Reaction to calls.
    pub behavior: AccountBehavior,
    /// Value received from the wallet.
    pub received: Amount,
    /// Calls accepted.
    pub calls: u64,
}

impl SimulatedAccount {
    /// Create a new simulated account.
    pub fn new(label: impl Into<String>, behavior: AccountBehavior) -> Self {
        let label = label.into();
        Self {
            address: Address::derive(&label),
            label,
            behavior,
            received: Amount::ZERO,
            calls: 0,
        }
    }
}

/// Registry of simulated accounts. Doubles as the wallet's call handler.
#[derive(Default)]
pub struct AccountBook {
    accounts: RwLock<BTreeMap<String, SimulatedAccount>>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account, returning its address. Re-registering a label
    /// keeps the existing account.
    pub fn register(&self, label: &str, behavior: AccountBehavior) -> Address {
        self.accounts
            .write()
            .entry(label.to_string())
            .or_insert_with(|| SimulatedAccount::new(label, behavior))
            .address
    }

    /// Address of a label. Unknown labels still map to their derived address.
    pub fn address(&self, label: &str) -> Address {
        self.accounts
            .read()
            .get(label)
            .map(|a| a.address)
            .unwrap_or_else(|| Address::derive(label))
    }

    /// Get an account by label.
    pub fn get(&self, label: &str) -> Option<SimulatedAccount> {
        self.accounts.read().get(label).cloned()
    }

    /// All accounts.
    pub fn accounts(&self) -> Vec<SimulatedAccount> {
        self.accounts.read().values().cloned().collect()
    }

    /// Total value received by all registered accounts.
    pub fn total_received(&self) -> Amount {
        self.accounts.read().values().map(|a| a.received).sum()
    }

    fn behavior_of(&self, address: &Address) -> AccountBehavior {
        self.accounts
            .read()
            .values()
            .find(|a| a.address == *address)
            .map(|a| a.behavior)
            .unwrap_or_default()
    }

    fn credit(&self, address: &Address, value: Amount) -> Result<(), CallRejection> {
        let mut accounts = self.accounts.write();
        if let Some(account) = accounts.values_mut().find(|a| a.address == *address) {
            account.received =
                account
                    .received
                    .checked_add(value)
                    .ok_or_else(|| CallRejection::Rejected {
                        target: *address,
                        reason: format!("received total overflows adding {}", value),
                    })?;
            account.calls += 1;
        }
        Ok(())
    }
}

impl CallHandler for AccountBook {
    fn handle_call(
        &self,
        wallet: &mut AuthorizationEngine,
        call: &OutboundCall,
    ) -> Result<(), CallRejection> {
        match self.behavior_of(&call.target) {
            AccountBehavior::Accept => {}
            AccountBehavior::Revert => {
                return Err(CallRejection::Rejected {
                    target: call.target,
                    reason: "account reverts all calls".to_string(),
                });
            }
            AccountBehavior::Reenter => {
                let owner = wallet.owners()[0];
                match wallet.execute(owner, call.index) {
                    Err(e) => debug!(index = %call.index, error = %e, "Re-entrant execution refused"),
                    Ok(()) => warn!(index = %call.index, "Re-entrant execution succeeded"),
                }
            }
        }

        self.credit(&call.target, call.value)
    }
}
