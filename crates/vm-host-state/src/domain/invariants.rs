//! # Domain Invariants
//!
//! Properties every transaction output must satisfy before it is committed.
//! The service checks them after each execution; a violation means a host
//! bug, never a guest error.
//!
//! - Gas: an output never returns more gas than the transaction provided
//! - Clean failure: a failed output carries no effects and no gas
//! - Query purity: a query never changes storage or balances
//! - Conservation: balance deltas sum to zero
//! - Reserved keys: no storage update lands under the reserved prefix

use crate::config::HostConfig;
use crate::domain::entities::{TransactionInput, TransactionKind, TransactionOutput};
use crate::domain::value_objects::BalanceDelta;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Gas remaining never exceeds the transaction's gas limit.
#[must_use]
pub fn check_gas_limit_invariant(tx: &TransactionInput, output: &TransactionOutput) -> bool {
    output.gas_remaining <= tx.gas_limit
}

/// A failed output is empty: no accounts, finish data or logs, and no gas back.
#[must_use]
pub fn check_clean_failure_invariant(output: &TransactionOutput) -> bool {
    if output.is_success() {
        return true;
    }
    output.output_accounts.is_empty()
        && output.finish_data.is_empty()
        && output.logs.is_empty()
        && output.gas_remaining == 0
        && output.gas_refund == 0
}

/// A query never produces storage updates, balance changes or code.
#[must_use]
pub fn check_query_purity_invariant(tx: &TransactionInput, output: &TransactionOutput) -> bool {
    if tx.kind != TransactionKind::Query {
        return true;
    }
    output.output_accounts.values().all(|account| {
        account.storage_updates.is_empty()
            && account.balance_delta.is_zero()
            && account.code.is_none()
    })
}

/// Value moves between accounts; none is created or destroyed.
#[must_use]
pub fn check_balance_conservation_invariant(output: &TransactionOutput) -> bool {
    output
        .output_accounts
        .values()
        .fold(BalanceDelta::ZERO, |sum, account| sum.add(account.balance_delta))
        .is_zero()
}

/// Returns the number of storage updates under the reserved prefix.
#[must_use]
pub fn count_reserved_key_updates(output: &TransactionOutput, config: &HostConfig) -> usize {
    output
        .output_accounts
        .values()
        .flat_map(|account| account.storage_updates.keys())
        .filter(|key| config.is_reserved_key(key.as_slice()))
        .count()
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(
    tx: &TransactionInput,
    output: &TransactionOutput,
    config: &HostConfig,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_gas_limit_invariant(tx, output) {
        violations.push(InvariantViolation::GasLimitExceeded {
            remaining: output.gas_remaining,
            limit: tx.gas_limit,
        });
    }

    if !check_clean_failure_invariant(output) {
        violations.push(InvariantViolation::FailureNotClean {
            accounts: output.output_accounts.len(),
            logs: output.logs.len(),
        });
    }

    if !check_query_purity_invariant(tx, output) {
        violations.push(InvariantViolation::QueryModifiedState);
    }

    if !check_balance_conservation_invariant(output) {
        violations.push(InvariantViolation::BalanceNotConserved);
    }

    let reserved = count_reserved_key_updates(output, config);
    if reserved > 0 {
        violations.push(InvariantViolation::ReservedKeyWritten { count: reserved });
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    #[default]
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Violations found, empty when valid.
    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        match self {
            Self::Valid => &[],
            Self::Invalid(violations) => violations,
        }
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More gas returned than provided.
    GasLimitExceeded { remaining: u64, limit: u64 },
    /// A failed output still carries effects.
    FailureNotClean { accounts: usize, logs: usize },
    /// A query changed storage, balances or code.
    QueryModifiedState,
    /// Balance deltas do not sum to zero.
    BalanceNotConserved,
    /// Storage updates under the reserved prefix.
    ReservedKeyWritten { count: usize },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GasLimitExceeded { remaining, limit } => {
                write!(f, "gas remaining {remaining} exceeds limit {limit}")
            }
            Self::FailureNotClean { accounts, logs } => {
                write!(f, "failed output not clean: {accounts} accounts, {logs} logs")
            }
            Self::QueryModifiedState => write!(f, "query modified state"),
            Self::BalanceNotConserved => write!(f, "balance deltas do not sum to zero"),
            Self::ReservedKeyWritten { count } => {
                write!(f, "{count} storage updates under the reserved prefix")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
