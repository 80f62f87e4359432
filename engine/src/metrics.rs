//! Metrics collection for wallet monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Engine metrics. Counters are not rolled back with failed calls.
pub struct EngineMetrics {
    /// Deposits accepted.
    pub deposits: AtomicU64,
    /// Records submitted.
    pub submissions: AtomicU64,
    /// Confirmations recorded.
    pub confirmations: AtomicU64,
    /// Confirmations revoked.
    pub revocations: AtomicU64,
    /// Successful executions.
    pub executions_succeeded: AtomicU64,
    /// Executions rolled back because the effect failed.
    pub executions_failed: AtomicU64,
    /// Calls refused by a precondition.
    pub rejected_calls: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            deposits: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
            confirmations: AtomicU64::new(0),
            revocations: AtomicU64::new(0),
            executions_succeeded: AtomicU64::new(0),
            executions_failed: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
        }
    }

    pub fn deposit_accepted(&self) {
        self.deposits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transaction_submitted(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn confirmation_recorded(&self) {
        self.confirmations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn confirmation_revoked(&self) {
        self.revocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn execution_succeeded(&self) {
        self.executions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn execution_failed(&self) {
        self.executions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn call_rejected(&self) {
        self.rejected_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            deposits: self.deposits.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
            revocations: self.revocations.load(Ordering::Relaxed),
            executions_succeeded: self.executions_succeeded.load(Ordering::Relaxed),
            executions_failed: self.executions_failed.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP multisig_deposits_total Total deposits accepted
# TYPE multisig_deposits_total counter
multisig_deposits_total {}

# HELP multisig_submissions_total Total transactions submitted
# TYPE multisig_submissions_total counter
multisig_submissions_total {}

# HELP multisig_confirmations_total Total confirmations recorded
# TYPE multisig_confirmations_total counter
multisig_confirmations_total {}

# HELP multisig_revocations_total Total confirmations revoked
# TYPE multisig_revocations_total counter
multisig_revocations_total {}

# HELP multisig_executions_succeeded_total Total successful executions
# TYPE multisig_executions_succeeded_total counter
multisig_executions_succeeded_total {}

# HELP multisig_executions_failed_total Total executions rolled back
# TYPE multisig_executions_failed_total counter
multisig_executions_failed_total {}

# HELP multisig_rejected_calls_total Total calls refused by a precondition
# TYPE multisig_rejected_calls_total counter
multisig_rejected_calls_total {}
"#,
            snapshot.deposits,
            snapshot.submissions,
            snapshot.confirmations,
            snapshot.revocations,
            snapshot.executions_succeeded,
            snapshot.executions_failed,
            snapshot.rejected_calls,
        )
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub deposits: u64,
    pub submissions: u64,
    pub confirmations: u64,
    pub revocations: u64,
    pub executions_succeeded: u64,
    pub executions_failed: u64,
    pub rejected_calls: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<EngineMetrics>;
