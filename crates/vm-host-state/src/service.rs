//! # Execution Service
//!
//! Inbound facade over the execution host. Owns the configuration and the
//! collaborators, runs one transaction at a time on a fresh host, checks the
//! output invariants and keeps execution statistics.
//!
//! The service never applies outputs; committing them is the caller's job.

use crate::config::HostConfig;
use crate::domain::entities::{TransactionInput, TransactionKind};
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};
use crate::errors::ServiceError;
use crate::host::ExecutionHost;
use crate::ports::inbound::{ExecutionReport, TransactionApi};
use crate::ports::outbound::{BlockchainLookup, ContractExecutor};

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Default per-transaction gas ceiling.
pub const DEFAULT_MAX_GAS_LIMIT: u64 = 1_500_000_000;

/// Execution service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Host configuration used for every transaction.
    pub host: HostConfig,
    /// Largest gas limit a transaction may ask for.
    pub max_gas_limit: u64,
    /// Run output invariant checks after each execution.
    pub check_invariants: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            max_gas_limit: DEFAULT_MAX_GAS_LIMIT,
            check_invariants: true,
        }
    }
}

impl ServiceConfig {
    /// Replaces the host configuration.
    #[must_use]
    pub fn with_host(mut self, host: HostConfig) -> Self {
        self.host = host;
        self
    }

    /// Sets the per-transaction gas ceiling.
    #[must_use]
    pub fn with_max_gas_limit(mut self, gas: u64) -> Self {
        self.max_gas_limit = gas;
        self
    }
}

/// Statistics for the execution service.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Total transactions executed.
    pub transactions_executed: u64,
    /// Transactions that returned `ReturnCode::Ok`.
    pub successful_executions: u64,
    /// Transactions that failed (user error, out of gas, etc.).
    pub failed_executions: u64,
    /// Total gas consumed.
    pub total_gas_used: u64,
    /// Average execution time in microseconds.
    pub avg_execution_time_us: u64,
    /// Transactions rejected before execution.
    pub rejected_transactions: u64,
    /// Outputs that broke at least one invariant.
    pub invariant_violations: u64,
}

/// The main execution service.
pub struct ExecutionService<L: BlockchainLookup, E: ContractExecutor> {
    /// Service configuration.
    config: ServiceConfig,
    /// Committed blockchain state.
    lookup: Arc<L>,
    /// Contract code executor.
    executor: Arc<E>,
    /// Service statistics.
    stats: RwLock<ServiceStats>,
}

impl<L: BlockchainLookup, E: ContractExecutor> ExecutionService<L, E> {
    /// Create a new execution service.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Config` if the host configuration is invalid.
    pub fn new(lookup: L, executor: E, config: ServiceConfig) -> Result<Self, ServiceError> {
        Self::with_shared(Arc::new(lookup), Arc::new(executor), config)
    }

    /// Create a service over collaborators shared with the caller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Config` if the host configuration is invalid.
    pub fn with_shared(
        lookup: Arc<L>,
        executor: Arc<E>,
        config: ServiceConfig,
    ) -> Result<Self, ServiceError> {
        config.host.validate()?;
        info!(
            max_call_depth = config.host.max_call_depth,
            max_gas_limit = config.max_gas_limit,
            "execution service ready"
        );
        Ok(Self {
            config,
            lookup,
            executor,
            stats: RwLock::new(ServiceStats::default()),
        })
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Committed blockchain state the service reads.
    #[must_use]
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Get current service statistics.
    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rejects transactions that must never reach the host.
    fn validate(&self, tx: &TransactionInput) -> Result<(), ServiceError> {
        if tx.gas_limit > self.config.max_gas_limit {
            return Err(ServiceError::InvalidTransaction(format!(
                "gas limit {} above maximum {}",
                tx.gas_limit, self.config.max_gas_limit
            )));
        }
        if !tx.kind.has_value() && !tx.value.is_zero() {
            return Err(ServiceError::InvalidTransaction(format!(
                "{:?} transaction cannot carry value",
                tx.kind
            )));
        }
        if tx.kind.has_function() && tx.function.is_empty() {
            return Err(ServiceError::InvalidTransaction("missing function name".into()));
        }
        if tx.kind == TransactionKind::Deploy && tx.code.is_empty() {
            return Err(ServiceError::InvalidTransaction("deploy without code".into()));
        }
        Ok(())
    }

    fn record(&self, f: impl FnOnce(&mut ServiceStats)) {
        f(&mut self.stats.write().unwrap_or_else(PoisonError::into_inner));
    }
}

// =============================================================================
// TransactionApi Implementation
// =============================================================================

impl<L: BlockchainLookup, E: ContractExecutor> TransactionApi for ExecutionService<L, E> {
    #[instrument(skip_all, fields(execution_id = tracing::field::Empty, kind = ?tx.kind))]
    fn execute_transaction(&self, tx: &TransactionInput) -> Result<ExecutionReport, ServiceError> {
        let execution_id = Uuid::new_v4();
        tracing::Span::current().record("execution_id", tracing::field::display(execution_id));

        if let Err(err) = self.validate(tx) {
            warn!(error = %err, "transaction rejected");
            self.record(|stats| stats.rejected_transactions += 1);
            return Err(err);
        }

        let start = Instant::now();
        let host = ExecutionHost::new(
            &self.config.host,
            &*self.lookup,
            &*self.executor,
            tx.gas_limit,
        );
        let output = host.run_transaction(tx);
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        let gas_used = tx.gas_limit.saturating_sub(output.gas_remaining);

        let invariants = if self.config.check_invariants {
            check_all_invariants(tx, &output, &self.config.host)
        } else {
            InvariantCheckResult::Valid
        };
        for violation in invariants.violations() {
            error!(%violation, "output invariant violated");
        }

        self.record(|stats| {
            stats.transactions_executed += 1;
            if output.is_success() {
                stats.successful_executions += 1;
            } else {
                stats.failed_executions += 1;
            }
            stats.total_gas_used = stats.total_gas_used.saturating_add(gas_used);
            if !invariants.is_valid() {
                stats.invariant_violations += 1;
            }
            let total = stats.transactions_executed;
            stats.avg_execution_time_us =
                (stats.avg_execution_time_us * (total - 1) + elapsed_us) / total;
        });

        debug!(
            return_code = output.return_code.as_str(),
            gas_used,
            accounts = output.output_accounts.len(),
            logs = output.logs.len(),
            "transaction executed"
        );

        Ok(ExecutionReport {
            execution_id,
            output,
            gas_used,
            invariants,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
