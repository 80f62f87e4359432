//! Outbound effect of an executed operation.

use thiserror::Error;

use multisig_common::{Address, Amount, MultisigError, TxIndex};

use crate::engine::AuthorizationEngine;

/// A transfer or call released by an executed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    /// Record being executed.
    pub index: TxIndex,
    /// Destination.
    pub target: Address,
    /// Value already debited from the treasury.
    pub value: Amount,
    /// Call data forwarded to the target.
    pub payload: Vec<u8>,
}

/// Why the destination did not accept a call.
#[derive(Debug, Error)]
pub enum CallRejection {
    /// Destination refused the call.
    #[error("target {target} rejected call: {reason}")]
    Rejected { target: Address, reason: String },

    /// A wallet call made by the destination failed.
    #[error("nested wallet call failed: {0}")]
    Nested(#[from] MultisigError),
}

/// Delivers outbound calls to their destination.
///
/// The handler is given the engine itself so a destination may call back
/// into the wallet while the call is in flight. Anything it changes is
/// rolled back together with the execution if the handler returns an error.
pub trait CallHandler: Send + Sync {
    /// Deliver a call.
    fn handle_call(
        &self,
        wallet: &mut AuthorizationEngine,
        call: &OutboundCall,
    ) -> Result<(), CallRejection>;
}

/// Default handler: every destination accepts.
pub struct LoggingCallHandler;

impl CallHandler for LoggingCallHandler {
    fn handle_call(
        &self,
        _wallet: &mut AuthorizationEngine,
        call: &OutboundCall,
    ) -> Result<(), CallRejection> {
        tracing::info!(
            index = %call.index,
            target = %call.target,
            value = %call.value,
            payload_len = call.payload.len(),
            "Outbound call delivered"
        );
        Ok(())
    }
}
