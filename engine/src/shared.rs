//! Thread-safe handle serializing calls into one engine.

use std::sync::Arc;

use parking_lot::Mutex;

use multisig_common::{Address, Amount, Result, TxIndex};

use crate::engine::{AuthorizationEngine, TransactionView, WalletSnapshot};
use crate::metrics::MetricsSnapshot;

/// Cloneable handle to a wallet shared between threads.
///
/// Each method holds the lock for the whole call, so calls never interleave.
/// Call handlers must re-enter through the `&mut AuthorizationEngine` they
/// are given, never through this handle.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<AuthorizationEngine>>,
}

impl SharedEngine {
    /// Wrap an engine.
    pub fn new(engine: AuthorizationEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run a closure with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut AuthorizationEngine) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }

    pub fn deposit(&self, from: Address, amount: Amount) -> Result<Amount> {
        self.inner.lock().deposit(from, amount)
    }

    pub fn submit(
        &self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: Vec<u8>,
    ) -> Result<TxIndex> {
        self.inner.lock().submit(caller, target, value, payload)
    }

    pub fn confirm(&self, caller: Address, index: TxIndex) -> Result<usize> {
        self.inner.lock().confirm(caller, index)
    }

    pub fn revoke(&self, caller: Address, index: TxIndex) -> Result<usize> {
        self.inner.lock().revoke(caller, index)
    }

    pub fn execute(&self, caller: Address, index: TxIndex) -> Result<()> {
        self.inner.lock().execute(caller, index)
    }

    pub fn balance(&self) -> Amount {
        self.inner.lock().balance()
    }

    pub fn transaction(&self, index: TxIndex) -> Result<TransactionView> {
        self.inner.lock().transaction(index)
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.lock().transaction_count()
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.lock().metrics().snapshot()
    }
}
