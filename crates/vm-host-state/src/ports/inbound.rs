//! # Driving Ports (API - Inbound)
//!
//! The interface exposed to the system that submits transactions and
//! commits their outputs.
//!
//! - These traits define the public API of the host
//! - Adapters (the service) implement them

use crate::domain::entities::{TransactionInput, TransactionOutput};
use crate::domain::invariants::InvariantCheckResult;
use crate::errors::ServiceError;
use serde::Serialize;
use uuid::Uuid;

// =============================================================================
// EXECUTION REPORT
// =============================================================================

/// Result of executing one transaction through the API.
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionReport {
    /// Identifier of this execution, also attached to its tracing span.
    pub execution_id: Uuid,
    /// The transaction output to commit.
    pub output: TransactionOutput,
    /// Gas consumed (`gas_limit - gas_remaining`).
    pub gas_used: u64,
    /// Output invariant check.
    #[serde(skip)]
    pub invariants: InvariantCheckResult,
}

impl ExecutionReport {
    /// Returns true if the transaction succeeded and every invariant holds.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.output.is_success() && self.invariants.is_valid()
    }
}

// =============================================================================
// TRANSACTION API
// =============================================================================

/// Primary API for executing transactions.
pub trait TransactionApi {
    /// Executes a single transaction.
    ///
    /// Execution failures (out of gas, user errors, depth overflow) are
    /// reported in the output's return code, not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidTransaction` for malformed input that is
    /// never handed to the host.
    fn execute_transaction(&self, tx: &TransactionInput) -> Result<ExecutionReport, ServiceError>;

    /// Executes transactions in order, independently of each other.
    ///
    /// Each transaction sees only committed state; outputs are not applied
    /// between them.
    fn execute_batch(&self, txs: &[TransactionInput]) -> Vec<Result<ExecutionReport, ServiceError>> {
        txs.iter().map(|tx| self.execute_transaction(tx)).collect()
    }
}
