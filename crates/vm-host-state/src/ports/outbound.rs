//! # Driven Ports (SPI - Outbound)
//!
//! These are the interfaces the host depends on:
//! - Blockchain data (committed storage, accounts, address derivation)
//! - Gas metering
//! - The contract code executor (the WASM interpreter in production)
//!
//! - Dependencies point INWARD (adapters implement these traits)
//! - All calls are synchronous; a transaction never waits on I/O

use crate::domain::entities::{AccountInfo, CallInput};
use crate::domain::value_objects::{Address, Bytes, CodeMetadata, U256};
use crate::errors::{LookupError, VmError};
use crate::host::gas::Operation;
use crate::host::ExecutionHost;

// =============================================================================
// BLOCKCHAIN LOOKUP
// =============================================================================

/// Read-only view of committed blockchain state.
///
/// ## Implementation Notes
///
/// Implementations must be deterministic for the duration of a transaction:
/// the host may read the same key several times and expects the same answer.
pub trait BlockchainLookup: Send + Sync {
    /// Committed storage value of `key` under `address`.
    ///
    /// # Returns
    ///
    /// * `Bytes` - Stored value (empty if never written)
    fn get_storage_data(&self, address: &Address, key: &[u8]) -> Result<Bytes, LookupError>;

    /// Account data.
    ///
    /// # Returns
    ///
    /// * `Some(AccountInfo)` - If the account exists
    /// * `None` - If it does not
    fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LookupError>;

    /// Address of a contract deployed by `creator` at `nonce`.
    fn new_address(&self, creator: &Address, nonce: u64) -> Result<Address, LookupError>;

    /// Committed balance. Zero for unknown accounts.
    fn get_balance(&self, address: &Address) -> Result<U256, LookupError> {
        Ok(self
            .get_account(address)?
            .map(|account| account.balance)
            .unwrap_or_default())
    }

    /// Contract code. Empty for plain or unknown accounts.
    fn get_code(&self, address: &Address) -> Result<Bytes, LookupError> {
        Ok(self
            .get_account(address)?
            .map(|account| account.code)
            .unwrap_or_default())
    }

    /// Code metadata. Default (no capability) for unknown accounts.
    fn get_code_metadata(&self, address: &Address) -> Result<CodeMetadata, LookupError> {
        Ok(self
            .get_account(address)?
            .map(|account| account.code_metadata)
            .unwrap_or_default())
    }
}

// =============================================================================
// METERING
// =============================================================================

/// Gas accounting for the current call frame.
pub trait Metering {
    /// Cost of a named operation.
    fn cost_of(&self, op: Operation) -> u64;

    /// Debits `amount` from the current frame.
    ///
    /// # Errors
    ///
    /// Returns `VmError::OutOfGas` and debits nothing when `amount` exceeds
    /// the gas left.
    fn use_gas(&mut self, amount: u64) -> Result<(), VmError>;

    /// Gas left in the current frame.
    fn gas_left(&self) -> u64;

    /// Records released gas, returned to the sender as a refund.
    fn free_gas(&mut self, amount: u64);
}

// =============================================================================
// CONTRACT EXECUTOR
// =============================================================================

/// Runs contract code for one call frame.
///
/// The executor calls back into `host` for every effect: storage, transfers,
/// logs, finish data and nested calls. Returning `Err` fails the frame; the
/// host rolls back its effects.
pub trait ContractExecutor: Send + Sync {
    /// Executes `input.function` of `input.code`.
    ///
    /// # Errors
    ///
    /// `FunctionNotFound` / `ContractNotFound` for unknown entry points,
    /// `UserError` for a guest-signalled error, or any host function error
    /// the guest chose to propagate.
    fn execute(&self, host: &mut ExecutionHost<'_>, input: &CallInput) -> Result<(), VmError>;
}
