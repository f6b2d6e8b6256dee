//! # Scripted Executor
//!
//! A [`ContractExecutor`] backed by Rust closures instead of compiled code.
//! Contracts are registered under their code bytes, so deployed and upgraded
//! code resolves the same way as pre-existing accounts.

use crate::domain::entities::{CallInput, TransactionInput};
use crate::domain::value_objects::Bytes;
use crate::errors::VmError;
use crate::host::ExecutionHost;
use crate::ports::outbound::ContractExecutor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Entry point of a scripted contract.
pub type ScriptedFunction =
    Arc<dyn Fn(&mut ExecutionHost<'_>, &CallInput) -> Result<(), VmError> + Send + Sync>;

/// A contract made of named closures.
#[derive(Clone, Default)]
pub struct ScriptedContract {
    functions: HashMap<String, ScriptedFunction>,
}

impl ScriptedContract {
    /// Creates a contract with no functions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named entry point.
    #[must_use]
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&mut ExecutionHost<'_>, &CallInput) -> Result<(), VmError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    /// Returns true if the contract exports `name`.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl fmt::Debug for ScriptedContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ScriptedContract")
            .field("functions", &names)
            .finish()
    }
}

/// Executor resolving contracts by code bytes.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    contracts: HashMap<Bytes, ScriptedContract>,
}

impl ScriptedExecutor {
    /// Creates an executor with no contracts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contract` as the behaviour of `code`.
    pub fn register(&mut self, code: impl Into<Bytes>, contract: ScriptedContract) {
        self.contracts.insert(code.into(), contract);
    }

    /// Number of registered contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl ContractExecutor for ScriptedExecutor {
    fn execute(&self, host: &mut ExecutionHost<'_>, input: &CallInput) -> Result<(), VmError> {
        let contract = self
            .contracts
            .get(input.code.as_slice())
            .ok_or(VmError::ContractNotFound)?;

        match contract.functions.get(&input.function) {
            Some(function) => {
                trace!(function = %input.function, depth = input.depth, "scripted call");
                function(host, input)
            }
            // Contracts without a constructor deploy as-is.
            None if input.function == TransactionInput::INIT_FUNCTION => Ok(()),
            None => Err(VmError::FunctionNotFound(input.function.clone())),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
