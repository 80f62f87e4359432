//! Wallet configuration.

use serde::{Deserialize, Serialize};

use multisig_common::{Address, MultisigError, Result};
use multisig_ledger::OwnerRegistry;

/// Default limit on submitted call data.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 128 * 1024;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Largest payload accepted by `submit`, in bytes.
    pub max_payload_len: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

/// Construction parameters of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Committee members, in enumeration order.
    pub owners: Vec<Address>,
    /// Confirmations required to execute.
    pub threshold: usize,
    /// Engine tunables.
    #[serde(default)]
    pub options: EngineOptions,
}

impl WalletConfig {
    /// Create a configuration with default options.
    pub fn new(owners: Vec<Address>, threshold: usize) -> Self {
        Self {
            owners,
            threshold,
            options: EngineOptions::default(),
        }
    }

    /// Replace the engine options.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// `MULTISIG_OWNERS` is a comma separated list of hex addresses,
    /// `MULTISIG_THRESHOLD` the confirmation count and the optional
    /// `MULTISIG_MAX_PAYLOAD_LEN` overrides the payload limit.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let owners = lookup("MULTISIG_OWNERS")
            .ok_or_else(|| invalid("MULTISIG_OWNERS is not set"))?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Address>()
                    .map_err(|e| invalid(format!("MULTISIG_OWNERS entry {}: {}", s, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let threshold = lookup("MULTISIG_THRESHOLD")
            .ok_or_else(|| invalid("MULTISIG_THRESHOLD is not set"))?
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(format!("MULTISIG_THRESHOLD: {}", e)))?;

        let mut options = EngineOptions::default();
        if let Some(len) = lookup("MULTISIG_MAX_PAYLOAD_LEN") {
            options.max_payload_len = len
                .trim()
                .parse()
                .map_err(|e| invalid(format!("MULTISIG_MAX_PAYLOAD_LEN: {}", e)))?;
        }

        Ok(Self {
            owners,
            threshold,
            options,
        })
    }

    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| invalid(format!("config JSON: {}", e)))
    }

    /// Validate configuration and build the owner registry.
    pub fn validate(&self) -> Result<OwnerRegistry> {
        OwnerRegistry::new(self.owners.clone(), self.threshold)
    }
}

fn invalid(message: impl Into<String>) -> MultisigError {
    MultisigError::InvalidConfiguration(message.into())
}
