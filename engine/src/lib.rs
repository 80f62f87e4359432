//! Multisig Authorization Engine
//!
//! A fixed committee of owners must jointly approve every outgoing transfer
//! or call. Proposals are confirmed by distinct owners and can only execute,
//! exactly once, after reaching the configured threshold.

pub mod engine;
pub mod config;
pub mod call;
pub mod event_log;
pub mod state;
pub mod metrics;
pub mod shared;

pub use engine::{AuthorizationEngine, TransactionSnapshot, TransactionView, WalletSnapshot};
pub use config::{EngineOptions, WalletConfig};
pub use call::{CallHandler, CallRejection, LoggingCallHandler, OutboundCall};
pub use state::TransactionStatus;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use shared::SharedEngine;
