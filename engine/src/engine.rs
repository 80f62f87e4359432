//! Core authorization engine implementation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use multisig_common::{Address, Amount, EventRecord, MultisigError, Result, TxIndex, WalletEvent};
use multisig_ledger::{OperationRecord, OwnerRegistry, TransactionLedger, Treasury};

use crate::call::{CallHandler, LoggingCallHandler, OutboundCall};
use crate::config::{EngineOptions, WalletConfig};
use crate::event_log::EventLog;
use crate::metrics::{EngineMetrics, SharedMetrics};
use crate::state::TransactionStatus;

/// Read-only view of an operation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    pub index: TxIndex,
    pub target: Address,
    pub value: Amount,
    pub payload: Vec<u8>,
    pub executed: bool,
    pub confirmation_count: usize,
}

impl From<&OperationRecord> for TransactionView {
    fn from(record: &OperationRecord) -> Self {
        Self {
            index: record.index(),
            target: record.target(),
            value: record.value(),
            payload: record.payload().to_vec(),
            executed: record.executed(),
            confirmation_count: record.confirmation_count(),
        }
    }
}

/// Audit view of a record, including who confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSnapshot {
    pub index: TxIndex,
    pub target: Address,
    pub value: Amount,
    pub payload: Vec<u8>,
    pub executed: bool,
    pub confirmation_count: usize,
    pub status: TransactionStatus,
    pub confirmed_by: Vec<Address>,
}

/// Audit view of the whole wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSnapshot {
    pub owners: Vec<Address>,
    pub threshold: usize,
    pub balance: Amount,
    pub transactions: Vec<TransactionSnapshot>,
}

/// Mutable wallet state. Cloned as a checkpoint around execution.
#[derive(Debug, Clone, Default)]
struct WalletState {
    ledger: TransactionLedger,
    treasury: Treasury,
    events: EventLog,
}

/// The M-of-N authorization state machine.
///
/// Every mutating call either completes or leaves the wallet exactly as it
/// was. Calls are serialized by `&mut self`; see [`crate::SharedEngine`] for
/// multi-threaded hosts.
pub struct AuthorizationEngine {
    /// Immutable committee.
    registry: Arc<OwnerRegistry>,
    /// Tunables.
    options: EngineOptions,
    /// Ledger, treasury and events.
    state: WalletState,
    /// Delivers outbound calls.
    call_handler: Arc<dyn CallHandler>,
    /// Counters.
    metrics: SharedMetrics,
    /// Nesting level of in-flight outbound calls.
    call_depth: usize,
}

impl AuthorizationEngine {
    /// Create a wallet whose outbound calls are always accepted.
    pub fn new(config: WalletConfig) -> Result<Self> {
        Self::with_call_handler(config, Arc::new(LoggingCallHandler))
    }

    /// Create a wallet with a custom outbound call handler.
    pub fn with_call_handler(
        config: WalletConfig,
        call_handler: Arc<dyn CallHandler>,
    ) -> Result<Self> {
        let registry = config.validate()?;

        info!(
            owners = registry.len(),
            threshold = registry.threshold(),
            "Wallet initialized"
        );

        Ok(Self {
            registry: Arc::new(registry),
            options: config.options,
            state: WalletState::default(),
            call_handler,
            metrics: Arc::new(EngineMetrics::new()),
            call_depth: 0,
        })
    }

    // --- Queries ---

    /// The committee.
    pub fn registry(&self) -> &Arc<OwnerRegistry> {
        &self.registry
    }

    /// Check committee membership.
    pub fn is_owner(&self, identity: &Address) -> bool {
        self.registry.is_owner(identity)
    }

    /// Owners in construction order.
    pub fn owners(&self) -> &[Address] {
        self.registry.owners()
    }

    /// Confirmations required to execute.
    pub fn threshold(&self) -> usize {
        self.registry.threshold()
    }

    /// Current holdings.
    pub fn balance(&self) -> Amount {
        self.state.treasury.balance()
    }

    /// Treasury totals.
    pub fn treasury(&self) -> &Treasury {
        &self.state.treasury
    }

    /// Get a record.
    pub fn transaction(&self, index: TxIndex) -> Result<TransactionView> {
        self.state.ledger.get(index).map(TransactionView::from)
    }

    /// Number of submitted records.
    pub fn transaction_count(&self) -> usize {
        self.state.ledger.len()
    }

    /// Check whether `owner` confirmed the record. False for non-owners.
    pub fn is_confirmed(&self, index: TxIndex, owner: &Address) -> Result<bool> {
        let record = self.state.ledger.get(index)?;
        Ok(self
            .registry
            .slot_of(owner)
            .map_or(false, |slot| record.is_confirmed_by(slot)))
    }

    /// Lifecycle status of a record.
    pub fn status(&self, index: TxIndex) -> Result<TransactionStatus> {
        let record = self.state.ledger.get(index)?;
        Ok(TransactionStatus::of(record, self.registry.threshold()))
    }

    /// Indices of records not yet executed.
    pub fn pending_transactions(&self) -> Vec<TxIndex> {
        self.state
            .ledger
            .iter()
            .filter(|r| !r.executed())
            .map(|r| r.index())
            .collect()
    }

    /// All committed facts.
    pub fn events(&self) -> &[EventRecord] {
        self.state.events.records()
    }

    /// Committed facts with `sequence >= from`.
    pub fn events_since(&self, from: u64) -> &[EventRecord] {
        self.state.events.since(from)
    }

    /// Engine counters.
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Audit view of the whole wallet.
    pub fn snapshot(&self) -> WalletSnapshot {
        let threshold = self.registry.threshold();

        WalletSnapshot {
            owners: self.registry.owners().to_vec(),
            threshold,
            balance: self.balance(),
            transactions: self
                .state
                .ledger
                .iter()
                .map(|record| TransactionSnapshot {
                    index: record.index(),
                    target: record.target(),
                    value: record.value(),
                    payload: record.payload().to_vec(),
                    executed: record.executed(),
                    confirmation_count: record.confirmation_count(),
                    status: TransactionStatus::of(record, threshold),
                    confirmed_by: record.confirmed_by(&self.registry),
                })
                .collect(),
        }
    }

    // --- Mutations ---

    /// Accept inbound value from any source. Returns the resulting balance.
    #[instrument(skip(self))]
    pub fn deposit(&mut self, from: Address, amount: Amount) -> Result<Amount> {
        let credited = self.state.treasury.deposit(from, amount);
        let change = self.reject(credited)?;

        self.state.events.push(WalletEvent::Deposit {
            from,
            amount,
            resulting_balance: change.balance_after,
        });
        self.metrics.deposit_accepted();

        info!(balance = %change.balance_after, "Deposit received");
        Ok(change.balance_after)
    }

    /// Propose a transfer or call. The submitter does not auto-confirm.
    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub fn submit(
        &mut self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: Vec<u8>,
    ) -> Result<TxIndex> {
        let checked = self.check_submission(&caller, &payload);
        self.reject(checked)?;

        let index = self.state.ledger.append(target, value, payload.clone());
        self.state.events.push(WalletEvent::SubmitTransaction {
            index,
            caller,
            target,
            value,
            payload,
        });
        self.metrics.transaction_submitted();

        info!(index = %index, "Transaction submitted");
        Ok(index)
    }

    /// Confirm a record. Returns the new confirmation count.
    #[instrument(skip(self))]
    pub fn confirm(&mut self, caller: Address, index: TxIndex) -> Result<usize> {
        let confirmed = self.apply_confirm(caller, index);
        let new_count = self.reject(confirmed)?;

        self.metrics.confirmation_recorded();
        info!(new_count, "Transaction confirmed");
        Ok(new_count)
    }

    /// Withdraw a confirmation. Returns the new confirmation count.
    #[instrument(skip(self))]
    pub fn revoke(&mut self, caller: Address, index: TxIndex) -> Result<usize> {
        let revoked = self.apply_revoke(caller, index);
        let new_count = self.reject(revoked)?;

        self.metrics.confirmation_revoked();
        info!(new_count, "Confirmation revoked");
        Ok(new_count)
    }

    /// Execute a record that reached quorum.
    ///
    /// The record is marked executed before the treasury is debited and the
    /// call is delivered, so a destination calling back into the wallet sees
    /// it as executed. If the effect fails, all changes made during this call
    /// are rolled back and `ExecutionFailed` is returned.
    #[instrument(skip(self), fields(depth = self.call_depth))]
    pub fn execute(&mut self, caller: Address, index: TxIndex) -> Result<()> {
        let prepared = self.prepare_execution(caller, index);
        let call = self.reject(prepared)?;

        let checkpoint = self.state.clone();
        match self.perform_execution(caller, call) {
            Ok(()) => {
                self.metrics.execution_succeeded();
                info!("Transaction executed");
                Ok(())
            }
            Err(e) => {
                self.state = checkpoint;
                self.metrics.execution_failed();
                warn!(error = %e, "Execution failed, state rolled back");
                Err(e)
            }
        }
    }

    // --- Private methods ---

    fn authorize(&self, caller: &Address) -> Result<usize> {
        self.registry
            .slot_of(caller)
            .ok_or(MultisigError::Unauthorized(*caller))
    }

    fn reject<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.metrics.call_rejected();
            warn!(error = %e, code = e.error_code(), "Call rejected");
        }
        result
    }

    fn check_submission(&self, caller: &Address, payload: &[u8]) -> Result<()> {
        self.authorize(caller)?;

        if payload.len() > self.options.max_payload_len {
            return Err(MultisigError::PayloadTooLarge {
                len: payload.len(),
                max: self.options.max_payload_len,
            });
        }

        Ok(())
    }

    fn apply_confirm(&mut self, caller: Address, index: TxIndex) -> Result<usize> {
        let slot = self.authorize(&caller)?;
        let record = self.state.ledger.get_mut(index)?;

        if record.executed() {
            return Err(MultisigError::AlreadyExecuted(index));
        }

        let new_count = record
            .add_confirmation(slot)
            .ok_or(MultisigError::AlreadyConfirmed {
                index,
                owner: caller,
            })?;

        self.state.events.push(WalletEvent::ConfirmTransaction {
            index,
            caller,
            new_count,
        });
        Ok(new_count)
    }

    fn apply_revoke(&mut self, caller: Address, index: TxIndex) -> Result<usize> {
        let slot = self.authorize(&caller)?;
        let record = self.state.ledger.get_mut(index)?;

        if record.executed() {
            return Err(MultisigError::AlreadyExecuted(index));
        }

        let new_count = record
            .remove_confirmation(slot)
            .ok_or(MultisigError::NotConfirmed {
                index,
                owner: caller,
            })?;

        self.state.events.push(WalletEvent::RevokeConfirmation {
            index,
            caller,
            new_count,
        });
        Ok(new_count)
    }

    fn prepare_execution(&self, caller: Address, index: TxIndex) -> Result<OutboundCall> {
        self.authorize(&caller)?;
        let record = self.state.ledger.get(index)?;

        if record.executed() {
            return Err(MultisigError::AlreadyExecuted(index));
        }

        let have = record.confirmation_count();
        let need = self.registry.threshold();
        if have < need {
            return Err(MultisigError::InsufficientConfirmations { index, have, need });
        }

        Ok(OutboundCall {
            index,
            target: record.target(),
            value: record.value(),
            payload: record.payload().to_vec(),
        })
    }

    fn perform_execution(&mut self, caller: Address, call: OutboundCall) -> Result<()> {
        let index = call.index;

        // Mark before any effect.
        let fresh = self.state.ledger.get_mut(index)?.mark_executed();
        debug_assert!(fresh, "record {} executed twice", index);
        self.state
            .events
            .push(WalletEvent::ExecuteTransaction { index, caller });

        self.state
            .treasury
            .withdraw(call.value, index)
            .map_err(|e| MultisigError::ExecutionFailed {
                index,
                reason: e.to_string(),
            })?;

        let handler = Arc::clone(&self.call_handler);
        self.call_depth += 1;
        let delivered = handler.handle_call(self, &call);
        self.call_depth -= 1;

        delivered.map_err(|rejection| MultisigError::ExecutionFailed {
            index,
            reason: rejection.to_string(),
        })
    }
}
