//! # VM Host State - Contract Execution Host
//!
//! Host-side state management for a contract virtual machine. Guest code runs
//! in a pluggable executor and reaches the outside world only through the
//! host functions of [`host::ExecutionHost`].
//!
//! ## Purpose
//!
//! Stages storage writes with per-byte gas accounting, keeps a stack of
//! snapshots so nested calls can be rolled back or merged, and aggregates
//! every effect of a transaction into a single [`domain::TransactionOutput`].
//! Committed state is never modified; the caller applies the output.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Gas remaining never exceeds the limit | `domain/invariants.rs` - `check_gas_limit_invariant()` |
//! | Failed outputs carry no effects | `domain/invariants.rs` - `check_clean_failure_invariant()` |
//! | Queries never change state | `domain/invariants.rs` - `check_query_purity_invariant()` |
//! | Balance deltas sum to zero | `domain/invariants.rs` - `check_balance_conservation_invariant()` |
//! | Reserved keys are never written | `host/storage.rs` - `StorageContext::set_storage()` |
//! | Call depth is bounded | `host/mod.rs` - `ExecutionHost::execute_nested()` |
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Storage Context | `host/storage.rs` | Staged writes, status, gas, protection |
//! | State Stack | `host/state_stack.rs` | LIFO of snapshots |
//! | Output Accumulator | `host/output.rs` | Per-account effects, logs, finish data |
//! | Gas Meter | `host/metering.rs` | Per-frame gas accounting |
//! | Gas Schedule | `host/gas.rs` | Operation costs and write cost formula |
//! | Execution Host | `host/mod.rs` | Host functions and nested calls |
//! | Execution Service | `service.rs` | Validation, invariants, statistics |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `BlockchainLookup` | Committed storage, accounts, new addresses |
//! | `ContractExecutor` | Runs guest code for one call frame |
//!
//! ## Usage Example
//!
//! ```ignore
//! use vm_host_state::prelude::*;
//!
//! let service = ExecutionService::new(world, executor, ServiceConfig::default())?;
//! let report = service.execute_transaction(&TransactionInput::call(user, contract, "run", 100_000))?;
//!
//! if report.is_success() {
//!     println!("Gas used: {}", report.gas_used);
//!     println!("Finish: {:?}", report.output.finish_strings());
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod host;
pub mod ports;
pub mod service;


// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccountInfo, CallFrame, CallInput, CallMode, CallOutcome, LogEntry, NestedCall,
        OutputAccount, ReturnCode, StorageStatus, StorageUpdate, TransactionInput,
        TransactionKind, TransactionOutput, FAILURE_MARKER, SUCCESS_MARKER,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        Address, BalanceDelta, Bytes, CodeMetadata, StorageKey, StorageValue, U256,
    };

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::{ExecutionReport, TransactionApi};
    pub use crate::ports::outbound::{BlockchainLookup, ContractExecutor, Metering};

    // Host
    pub use crate::host::gas::{GasSchedule, Operation};
    pub use crate::host::output::OutputContext;
    pub use crate::host::state_stack::StateStack;
    pub use crate::host::storage::StorageContext;
    pub use crate::host::{ExecutionHost, CODE_METADATA_KEY};

    // Config and errors
    pub use crate::config::HostConfig;
    pub use crate::errors::{ConfigError, LookupError, ServiceError, StorageError, VmError};

    // Adapters
    pub use crate::adapters::{InMemoryWorld, ScriptedContract, ScriptedExecutor};

    // Service
    pub use crate::service::{ExecutionService, ServiceConfig, ServiceStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Component name.
pub const COMPONENT_NAME: &str = "VM Host State";

// =============================================================================
// TESTS
// =============================================================================
