//! Append-only stream of committed wallet facts.

use tracing::debug;

use multisig_common::{EventRecord, WalletEvent};

/// Facts emitted by the wallet, in emission order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fact and return its sequence number.
    pub fn push(&mut self, event: WalletEvent) -> u64 {
        let sequence = self.records.len() as u64;
        debug!(sequence, event = event.name(), "Event emitted");
        self.records.push(EventRecord { sequence, event });
        sequence
    }

    /// All records.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= from`.
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
