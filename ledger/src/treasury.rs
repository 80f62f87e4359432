//! Wallet holdings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use multisig_common::{Address, Amount, MultisigError, Result, TxIndex};

/// Type of balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceChangeType {
    /// Inbound deposit.
    Credit,
    /// Release by an executed operation.
    Debit,
}

/// What caused a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceReference {
    /// Deposit from an account.
    Deposit(Address),
    /// Execution of a ledger record.
    Execution(TxIndex),
}

/// Balance change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// Change type.
    pub change_type: BalanceChangeType,
    /// Amount changed.
    pub amount: Amount,
    /// Balance before change.
    pub balance_before: Amount,
    /// Balance after change.
    pub balance_after: Amount,
    /// Cause of the change.
    pub reference: BalanceReference,
}

/// Tracked holdings of the wallet.
///
/// Only deposits increase the balance; only engine execution decreases it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Treasury {
    balance: Amount,
    total_deposited: Amount,
    total_released: Amount,
}

impl Treasury {
    /// Create an empty treasury.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holdings.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Sum of all deposits.
    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    /// Sum of all values released by executions.
    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    /// Accept inbound value from any source.
    pub fn deposit(&mut self, from: Address, amount: Amount) -> Result<BalanceChange> {
        let balance_after = self
            .balance
            .checked_add(amount)
            .ok_or(MultisigError::ArithmeticOverflow("treasury balance"))?;
        let total_deposited = self
            .total_deposited
            .checked_add(amount)
            .ok_or(MultisigError::ArithmeticOverflow("treasury deposits"))?;

        let change = BalanceChange {
            change_type: BalanceChangeType::Credit,
            amount,
            balance_before: self.balance,
            balance_after,
            reference: BalanceReference::Deposit(from),
        };

        self.balance = balance_after;
        self.total_deposited = total_deposited;

        debug!(from = %from, amount = %amount, balance = %balance_after, "Treasury credited");
        Ok(change)
    }

    /// Release value for an executed record.
    pub fn withdraw(&mut self, amount: Amount, index: TxIndex) -> Result<BalanceChange> {
        let balance_after =
            self.balance
                .checked_sub(amount)
                .ok_or(MultisigError::InsufficientFunds {
                    required: amount,
                    available: self.balance,
                })?;
        let total_released = self
            .total_released
            .checked_add(amount)
            .ok_or(MultisigError::ArithmeticOverflow("treasury releases"))?;

        let change = BalanceChange {
            change_type: BalanceChangeType::Debit,
            amount,
            balance_before: self.balance,
            balance_after,
            reference: BalanceReference::Execution(index),
        };

        self.balance = balance_after;
        self.total_released = total_released;

        debug!(index = %index, amount = %amount, balance = %balance_after, "Treasury debited");
        Ok(change)
    }

    /// Check balance == deposits - releases.
    pub fn is_consistent(&self) -> bool {
        self.total_deposited.checked_sub(self.total_released) == Some(self.balance)
    }
}
