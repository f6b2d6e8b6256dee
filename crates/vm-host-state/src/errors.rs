//! # Error Types
//!
//! All error types for host-side contract execution.

use crate::domain::entities::ReturnCode;
use thiserror::Error;

// =============================================================================
// VM ERRORS
// =============================================================================

/// Errors that can end a call frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Execution ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// The called function does not exist in the contract.
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    /// The called account holds no code.
    #[error("contract not found")]
    ContractNotFound,

    /// Guest code signalled an error.
    #[error("user error: {0}")]
    UserError(String),

    /// A transfer exceeded the sender's balance.
    #[error("insufficient funds")]
    OutOfFunds,

    /// A state-changing operation was attempted in a read-only call.
    #[error("write operation in read-only call")]
    WriteInReadOnly,

    /// Storage write rejected.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Blockchain lookup failed.
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Call depth exceeded maximum.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded {
        /// Depth that was attempted.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Internal error (should not happen in production).
    #[error("internal error: {0}")]
    Internal(String),
}

impl VmError {
    /// Returns true if this error aborts the whole transaction rather than one frame.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CallDepthExceeded { .. })
    }

    /// Return code reported for this error.
    #[must_use]
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Self::OutOfGas | Self::Storage(StorageError::OutOfGas) => ReturnCode::OutOfGas,
            Self::FunctionNotFound(_) => ReturnCode::FunctionNotFound,
            Self::ContractNotFound => ReturnCode::ContractNotFound,
            Self::UserError(_) | Self::WriteInReadOnly | Self::Storage(_) => ReturnCode::UserError,
            Self::OutOfFunds => ReturnCode::OutOfFunds,
            Self::CallDepthExceeded { .. } => ReturnCode::CallStackOverflow,
            Self::Lookup(_) | Self::Internal(_) => ReturnCode::ExecutionFailed,
        }
    }
}

// =============================================================================
// STORAGE ERRORS
// =============================================================================

/// Errors from storage writes. Local and recoverable.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Key starts with the reserved system prefix.
    #[error("cannot write to reserved key")]
    ReservedKey,

    /// Key starts with the protected prefix while protection is enabled.
    #[error("cannot write to protected key")]
    ProtectedKey,

    /// Not enough gas for the write.
    #[error("not enough gas to store")]
    OutOfGas,
}

// =============================================================================
// LOOKUP ERRORS
// =============================================================================

/// Errors from the blockchain lookup collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The account does not exist.
    #[error("account not found")]
    AccountNotFound,

    /// The data source is not reachable.
    #[error("blockchain data unavailable")]
    Unavailable,

    /// Other lookup error.
    #[error("lookup error: {0}")]
    Other(String),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors from [`crate::config::HostConfig::validate`] and loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A key prefix is empty.
    #[error("{0} key prefix must not be empty")]
    EmptyPrefix(&'static str),

    /// One prefix is a prefix of the other.
    #[error("reserved and protected key prefixes overlap")]
    OverlappingPrefixes,

    /// Maximum call depth is zero.
    #[error("max_call_depth must be greater than zero")]
    ZeroCallDepth,

    /// The configuration document could not be parsed.
    #[error("invalid config document: {0}")]
    Parse(String),
}

// =============================================================================
// SERVICE ERRORS
// =============================================================================

/// Errors returned by the execution service before a transaction runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The transaction is malformed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The service configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// TESTS
// =============================================================================
