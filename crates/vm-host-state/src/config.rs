//! Host configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use vm_host_state::config::HostConfig;
//!
//! let config = HostConfig::default()
//!     .with_max_call_depth(16)
//!     .with_same_context_failure_penalty(50_000);
//! config.validate()?;
//! ```

use crate::domain::value_objects::Bytes;
use crate::errors::ConfigError;
use crate::host::gas::GasSchedule;
use serde::{Deserialize, Serialize};

/// Default reserved key prefix.
pub const DEFAULT_RESERVED_PREFIX: &[u8] = b"RESERVED";

/// Default protected key prefix.
pub const DEFAULT_PROTECTED_PREFIX: &[u8] = b"PROTECTED";

/// Default maximum nested call depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Execution host configuration
///
/// - Reserved keys can never be written by contracts
/// - Protected keys can only be written by privileged built-ins
/// - Failure penalties cap what a failed child costs its caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Storage keys with this prefix are always rejected.
    pub reserved_key_prefix: Bytes,
    /// Storage keys with this prefix are rejected while protection is on.
    pub protected_key_prefix: Bytes,
    /// Maximum depth of nested calls; the top-level call is depth 0.
    pub max_call_depth: usize,
    /// Gas a failed same-context child costs its caller, at most the gas it was given.
    pub same_context_failure_penalty: u64,
    /// Gas a failed different-context child costs its caller, at most the gas it was given.
    pub dest_context_failure_penalty: u64,
    /// Operation costs.
    pub gas_schedule: GasSchedule,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            reserved_key_prefix: Bytes::from(DEFAULT_RESERVED_PREFIX),
            protected_key_prefix: Bytes::from(DEFAULT_PROTECTED_PREFIX),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            same_context_failure_penalty: u64::MAX,
            dest_context_failure_penalty: u64::MAX,
            gas_schedule: GasSchedule::default(),
        }
    }
}

impl HostConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, or the validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reserved_key_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix("reserved"));
        }
        if self.protected_key_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix("protected"));
        }

        // Overlap would make a protected key unwritable even for built-ins.
        let reserved = self.reserved_key_prefix.as_slice();
        let protected = self.protected_key_prefix.as_slice();
        if reserved.starts_with(protected) || protected.starts_with(reserved) {
            return Err(ConfigError::OverlappingPrefixes);
        }

        if self.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }

        Ok(())
    }

    /// Builder-style method to set the reserved key prefix
    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: &[u8]) -> Self {
        self.reserved_key_prefix = Bytes::from(prefix);
        self
    }

    /// Builder-style method to set the protected key prefix
    #[must_use]
    pub fn with_protected_prefix(mut self, prefix: &[u8]) -> Self {
        self.protected_key_prefix = Bytes::from(prefix);
        self
    }

    /// Builder-style method to set the maximum call depth
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Builder-style method to set the same-context failure penalty
    #[must_use]
    pub fn with_same_context_failure_penalty(mut self, gas: u64) -> Self {
        self.same_context_failure_penalty = gas;
        self
    }

    /// Builder-style method to set the different-context failure penalty
    #[must_use]
    pub fn with_dest_context_failure_penalty(mut self, gas: u64) -> Self {
        self.dest_context_failure_penalty = gas;
        self
    }

    /// Builder-style method to set the gas schedule
    #[must_use]
    pub fn with_gas_schedule(mut self, schedule: GasSchedule) -> Self {
        self.gas_schedule = schedule;
        self
    }

    /// Returns true if `key` starts with the reserved prefix.
    #[must_use]
    pub fn is_reserved_key(&self, key: &[u8]) -> bool {
        key.starts_with(self.reserved_key_prefix.as_slice())
    }

    /// Returns `key` under the protected prefix.
    #[must_use]
    pub fn protected_key(&self, key: &[u8]) -> Bytes {
        let mut full = self.protected_key_prefix.clone().into_vec();
        full.extend_from_slice(key);
        Bytes::from_vec(full)
    }
}
