//! # Execution Host
//!
//! Per-transaction orchestrator. Owns the storage context, the output
//! accumulator and the gas meter, drives the contract executor, and exposes
//! the host functions guest code calls.
//!
//! ## Nested calls
//!
//! | Mode | Entry | Success | Failure |
//! |------|-------|---------|---------|
//! | same context | storage `push_state`, output `push_state` | `pop_discard` both, `"succ"` | `pop_set_active_state` both, penalty, `"fail"` |
//! | dest context | storage `push_state` + switch address, output `push_isolated_state` | storage `pop_discard`, output `pop_merge_active_state`, `"succ"` | `pop_set_active_state` both, penalty, `"fail"` |
//!
//! Exceeding the call depth limit is fatal: it is recorded on the host and
//! the transaction fails even if guest code ignores the error.

pub mod gas;
pub mod metering;
pub mod output;
pub mod state_stack;
pub mod storage;

use crate::config::HostConfig;
use crate::domain::entities::{
    CallFrame, CallInput, CallMode, CallOutcome, CallPhase, NestedCall, ReturnCode,
    StorageStatus, TransactionInput, TransactionKind, TransactionOutput, FAILURE_MARKER, SUCCESS_MARKER,
};
use crate::domain::value_objects::{Address, Bytes, CodeMetadata, U256};
use crate::errors::{ConfigError, VmError};
use crate::ports::outbound::{BlockchainLookup, ContractExecutor, Metering};
use gas::{compile_cost, Operation, TOPIC_CHARGE_LEN};
use metering::GasMeter;
use output::OutputContext;
use storage::StorageContext;
use tracing::{debug, error, info, instrument, trace, warn};

/// Storage key, under the protected prefix, holding a contract's code metadata.
pub const CODE_METADATA_KEY: &[u8] = b"codeMetadata";

/// Host state of one transaction.
pub struct ExecutionHost<'a> {
    config: &'a HostConfig,
    lookup: &'a dyn BlockchainLookup,
    executor: &'a dyn ContractExecutor,
    storage: StorageContext<'a>,
    output: OutputContext<'a>,
    meter: GasMeter,
    depth: usize,
    fatal: Option<VmError>,
}

impl<'a> ExecutionHost<'a> {
    /// Creates a host for one transaction with `gas_limit` gas.
    ///
    /// `config` must already pass [`HostConfig::validate`]; an empty reserved
    /// prefix would reject every write. Use [`ExecutionHost::try_new`] for an
    /// unchecked configuration.
    #[must_use]
    pub fn new(
        config: &'a HostConfig,
        lookup: &'a dyn BlockchainLookup,
        executor: &'a dyn ContractExecutor,
        gas_limit: u64,
    ) -> Self {
        debug_assert!(config.validate().is_ok(), "host config must be validated");
        Self {
            config,
            lookup,
            executor,
            storage: StorageContext::new(lookup, config),
            output: OutputContext::new(lookup),
            meter: GasMeter::new(config.gas_schedule.clone(), gas_limit),
            depth: 0,
            fatal: None,
        }
    }

    /// Validates `config`, then creates a host as [`ExecutionHost::new`] does.
    ///
    /// # Errors
    ///
    /// Returns the first rule `config` violates.
    pub fn try_new(
        config: &'a HostConfig,
        lookup: &'a dyn BlockchainLookup,
        executor: &'a dyn ContractExecutor,
        gas_limit: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config, lookup, executor, gas_limit))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Host configuration.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        self.config
    }

    /// Account whose storage the running call uses.
    #[must_use]
    pub fn address(&self) -> Address {
        self.storage.address()
    }

    /// Nesting depth of the running call; 0 for the top-level call.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Gas left in the running call.
    #[must_use]
    pub fn gas_left(&self) -> u64 {
        self.meter.gas_left()
    }

    /// Storage context.
    #[must_use]
    pub fn storage(&self) -> &StorageContext<'a> {
        &self.storage
    }

    /// Output accumulator.
    #[must_use]
    pub fn output(&self) -> &OutputContext<'a> {
        &self.output
    }

    /// Gas meter.
    #[must_use]
    pub fn meter(&self) -> &GasMeter {
        &self.meter
    }

    /// Burns `amount` gas from the running call.
    ///
    /// # Errors
    ///
    /// Returns `VmError::OutOfGas` if the call cannot afford it.
    pub fn use_gas(&mut self, amount: u64) -> Result<(), VmError> {
        self.meter.use_gas(amount)
    }

    fn charge(&mut self, base: Operation, per_byte: Operation, len: u64) -> Result<(), VmError> {
        let cost = self
            .meter
            .cost_of(base)
            .saturating_add(self.meter.cost_of(per_byte).saturating_mul(len));
        self.meter.use_gas(cost)
    }

    // =========================================================================
    // HOST FUNCTIONS
    // =========================================================================

    /// Writes `value` under `key` in the running call's storage.
    ///
    /// # Errors
    ///
    /// Rejected keys and missing gas surface as `VmError::Storage` / `VmError::OutOfGas`.
    pub fn storage_store(&mut self, key: &[u8], value: &[u8]) -> Result<StorageStatus, VmError> {
        let cost = self.meter.cost_of(Operation::StorageStore);
        self.meter.use_gas(cost)?;
        Ok(self.storage.set_storage(key, value, &mut self.meter)?)
    }

    /// Reads `key` from the running call's storage. Empty when absent.
    ///
    /// # Errors
    ///
    /// Returns `VmError::OutOfGas` if the read cannot be paid for.
    pub fn storage_load(&mut self, key: &[u8]) -> Result<Bytes, VmError> {
        let value = self.storage.get_storage(key);
        self.charge(Operation::StorageLoad, Operation::DataCopyPerByte, value.len() as u64)?;
        Ok(value)
    }

    /// Reads `key` from a foreign account, `None` if it is not readable.
    ///
    /// # Errors
    ///
    /// Returns `VmError::OutOfGas` if the read cannot be paid for.
    pub fn storage_load_from_address(
        &mut self,
        address: &Address,
        key: &[u8],
    ) -> Result<Option<Bytes>, VmError> {
        let value = self.storage.get_storage_from_address(address, key);
        let len = value.as_ref().map_or(0, Bytes::len);
        self.charge(Operation::GetStorageFromAddress, Operation::DataCopyPerByte, len as u64)?;
        Ok(value)
    }

    /// Appends a finish data block.
    ///
    /// # Errors
    ///
    /// Returns `VmError::OutOfGas` if the data cannot be paid for.
    pub fn finish(&mut self, data: impl Into<Bytes>) -> Result<(), VmError> {
        let data = data.into();
        self.charge(Operation::Finish, Operation::StorePerByte, data.len() as u64)?;
        self.output.finish(data);
        Ok(())
    }

    /// Sends `value` from the running call's account to `destination`.
    ///
    /// # Errors
    ///
    /// - `WriteInReadOnly` in a read-only call
    /// - `OutOfFunds` when the balance is short
    /// - `UserError` when `destination` is a contract that is not payable
    pub fn transfer_value(
        &mut self,
        destination: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), VmError> {
        if self.storage.is_read_only() {
            return Err(VmError::WriteInReadOnly);
        }
        self.charge(Operation::TransferValue, Operation::StorePerByte, data.len() as u64)?;
        let sender = self.storage.address();
        self.move_value(sender, destination, value, data)
    }

    /// Emits a log entry from the running call's account.
    ///
    /// # Errors
    ///
    /// Returns `VmError::OutOfGas` if the log cannot be paid for.
    pub fn write_log(
        &mut self,
        identifier: impl Into<Bytes>,
        topics: Vec<Bytes>,
        data: impl Into<Bytes>,
    ) -> Result<(), VmError> {
        let identifier = identifier.into();
        let data = data.into();
        let charged_len = (topics.len() as u64)
            .saturating_mul(TOPIC_CHARGE_LEN)
            .saturating_add(data.len() as u64);
        self.charge(Operation::Log, Operation::StorePerByte, charged_len)?;
        let address = self.storage.address();
        self.output.write_log(address, identifier, topics, data);
        Ok(())
    }

    /// Replaces the running contract's code and metadata.
    ///
    /// Privileged built-in: the metadata is written under the protected prefix
    /// with protection lifted for the duration of the write.
    ///
    /// # Errors
    ///
    /// - `WriteInReadOnly` in a read-only call
    /// - `UserError` when the contract is not upgradeable
    pub fn upgrade_contract(&mut self, code: Bytes, metadata: CodeMetadata) -> Result<(), VmError> {
        if self.storage.is_read_only() {
            return Err(VmError::WriteInReadOnly);
        }
        let address = self.storage.address();
        if !self.lookup.get_code_metadata(&address)?.upgradeable {
            return Err(VmError::UserError("contract is not upgradeable".into()));
        }
        self.charge(Operation::UpgradeContract, Operation::CompilePerByte, code.len() as u64)?;

        let key = self.config.protected_key(CODE_METADATA_KEY);
        let was_protected = self.storage.is_protection_enabled();
        self.storage.disable_storage_protection();
        let written = self
            .storage
            .set_storage(key.as_slice(), &metadata.to_bytes(), &mut self.meter);
        if was_protected {
            self.storage.enable_storage_protection();
        }
        written?;

        info!(%address, code_len = code.len(), "contract upgraded");
        self.output.deploy_code(address, code, metadata);
        Ok(())
    }

    /// Runs `call` in the caller's account scope.
    ///
    /// # Errors
    ///
    /// Child failures are reported as `Ok(CallOutcome::Failed { .. })`. An
    /// `Err` means the caller itself cannot go on: it could not pay for the
    /// call, or the call depth limit was exceeded.
    pub fn execute_on_same_context(&mut self, call: NestedCall) -> Result<CallOutcome, VmError> {
        self.execute_nested(CallMode::SameContext, call)
    }

    /// Runs `call` in the callee's own account scope.
    ///
    /// # Errors
    ///
    /// See [`ExecutionHost::execute_on_same_context`].
    pub fn execute_on_dest_context(&mut self, call: NestedCall) -> Result<CallOutcome, VmError> {
        self.execute_nested(CallMode::DestinationContext, call)
    }

    // =========================================================================
    // TRANSACTION
    // =========================================================================

    /// Executes one top-level transaction and builds its output.
    ///
    /// The output is either a full success or a clean failure with no effects.
    #[instrument(name = "transaction", skip_all, fields(kind = ?tx.kind, sender = %tx.sender))]
    pub fn run_transaction(mut self, tx: &TransactionInput) -> TransactionOutput {
        let result = match tx.kind {
            TransactionKind::Transfer => self.move_value(tx.sender, tx.recipient, tx.value, &[]),
            TransactionKind::Call | TransactionKind::Query | TransactionKind::Deploy => {
                self.run_top_level(tx)
            }
        };

        if let Some(fatal) = self.fatal.take() {
            error!(error = %fatal, "transaction aborted");
            return OutputContext::failure_output(fatal.return_code(), fatal.to_string());
        }
        if let Err(err) = result {
            warn!(error = %err, "transaction failed");
            return OutputContext::failure_output(err.return_code(), err.to_string());
        }

        let gas_remaining = self.meter.gas_left();
        let gas_refund = self.meter.gas_freed();
        debug!(gas_remaining, gas_refund, "transaction succeeded");
        self.output.finalize(&self.storage, gas_remaining, gas_refund)
    }

    fn run_top_level(&mut self, tx: &TransactionInput) -> Result<(), VmError> {
        let value = if tx.kind.has_value() { tx.value } else { U256::zero() };
        let (callee, code) = if tx.kind == TransactionKind::Deploy {
            let address = self.lookup.new_address(&tx.sender, tx.nonce)?;
            self.output
                .deploy_code(address, tx.code.clone(), tx.code_metadata);
            (address, tx.code.clone())
        } else {
            (tx.recipient, self.lookup.get_code(&tx.recipient)?)
        };
        if code.is_empty() {
            return Err(VmError::ContractNotFound);
        }

        self.storage.set_address(callee);
        self.storage.set_read_only(tx.kind == TransactionKind::Query);

        if tx.kind == TransactionKind::Deploy {
            self.output.transfer(tx.sender, callee, value, &[])?;
        } else {
            self.move_value(tx.sender, callee, value, &[])?;
        }
        self.use_gas(compile_cost(&self.config.gas_schedule, code.len()))?;

        let input = CallInput {
            caller: tx.sender,
            callee,
            value,
            function: tx.function.clone(),
            arguments: tx.arguments.clone(),
            gas_provided: self.meter.gas_provided(),
            code,
            depth: 0,
        };
        let executor = self.executor;
        executor.execute(self, &input)
    }

    // =========================================================================
    // NESTED CALLS
    // =========================================================================

    #[instrument(name = "nested_call", level = "debug", skip_all, fields(mode = mode.as_str(), callee = %call.callee))]
    fn execute_nested(&mut self, mode: CallMode, call: NestedCall) -> Result<CallOutcome, VmError> {
        if let Some(fatal) = &self.fatal {
            return Err(fatal.clone());
        }

        let depth = self.depth + 1;
        if depth > self.config.max_call_depth {
            let err = VmError::CallDepthExceeded {
                depth,
                max: self.config.max_call_depth,
            };
            error!(depth, "call depth limit exceeded");
            self.fatal = Some(err.clone());
            return Err(err);
        }

        let base = match mode {
            CallMode::SameContext => Operation::ExecuteOnSameContext,
            CallMode::DestinationContext => Operation::ExecuteOnDestContext,
        };
        let cost = self.meter.cost_of(base);
        self.meter.use_gas(cost)?;
        let gas_provided = call.gas_limit.min(self.meter.gas_left());

        // Entered
        let mut phase = CallPhase::Entered;
        let parent_frame = self.storage.call_frame().clone();
        let caller = parent_frame.address;
        self.meter.push_frame(gas_provided);
        self.storage.push_state();
        match mode {
            CallMode::SameContext => self.output.push_state(),
            CallMode::DestinationContext => {
                self.output.push_isolated_state();
                self.storage.set_address(call.callee);
            }
        }
        self.depth = depth;

        let result = self.run_child(caller, &call, gas_provided, &mut phase);

        self.depth = depth - 1;
        let child_gas = self.meter.pop_frame().unwrap_or_default();

        if let Some(fatal) = self.fatal.clone() {
            self.storage.pop_set_active_state();
            self.output.pop_set_active_state();
            return Err(fatal);
        }

        match result {
            Ok(()) => {
                advance(&mut phase, CallPhase::Succeeded);
                self.storage.pop_discard();
                self.storage.restore_call_frame(parent_frame);
                match mode {
                    CallMode::SameContext => self.output.pop_discard(),
                    CallMode::DestinationContext => self.output.pop_merge_active_state(),
                }
                self.meter.use_gas(child_gas.used)?;
                self.meter.free_gas(child_gas.freed);
                self.output.finish(Bytes::from(SUCCESS_MARKER));
                advance(&mut phase, CallPhase::Returned);

                debug!(gas_used = child_gas.used, "nested call succeeded");
                Ok(CallOutcome::Succeeded {
                    gas_used: child_gas.used,
                })
            }
            Err(err) => {
                advance(&mut phase, failure_phase(&err));
                self.storage.pop_set_active_state();
                self.output.pop_set_active_state();

                let penalty = match mode {
                    CallMode::SameContext => self.config.same_context_failure_penalty,
                    CallMode::DestinationContext => self.config.dest_context_failure_penalty,
                };
                let gas_charged = child_gas.used.max(penalty.min(child_gas.provided));
                self.meter.use_gas(gas_charged)?;
                self.output.finish(Bytes::from(FAILURE_MARKER));
                advance(&mut phase, CallPhase::Returned);

                debug!(error = %err, gas_charged, "nested call failed");
                Ok(CallOutcome::Failed {
                    return_code: err.return_code(),
                    message: err.to_string(),
                    gas_charged,
                })
            }
        }
    }

    fn run_child(
        &mut self,
        caller: Address,
        call: &NestedCall,
        gas_provided: u64,
        phase: &mut CallPhase,
    ) -> Result<(), VmError> {
        if !call.value.is_zero() && self.storage.is_read_only() {
            return Err(VmError::WriteInReadOnly);
        }
        self.move_value(caller, call.callee, call.value, &[])?;

        let code = self.lookup.get_code(&call.callee)?;
        if code.is_empty() {
            return Err(VmError::ContractNotFound);
        }
        self.use_gas(compile_cost(&self.config.gas_schedule, code.len()))?;

        let input = CallInput {
            caller,
            callee: call.callee,
            value: call.value,
            function: call.function.clone(),
            arguments: call.arguments.clone(),
            gas_provided,
            code,
            depth: self.depth,
        };
        advance(phase, CallPhase::Executing);
        let executor = self.executor;
        executor.execute(self, &input)
    }

    /// Records a value transfer after checking the receiver accepts it.
    fn move_value(
        &mut self,
        sender: Address,
        receiver: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), VmError> {
        if !value.is_zero() && sender != receiver {
            if let Some(account) = self.lookup.get_account(&receiver)? {
                if account.is_contract() && !account.code_metadata.payable {
                    return Err(VmError::UserError("receiver is not payable".into()));
                }
            }
        }
        self.output.transfer(sender, receiver, value, data)
    }

    /// Call frame of the running call.
    #[must_use]
    pub fn call_frame(&self) -> &CallFrame {
        self.storage.call_frame()
    }
}

/// Phase a child call ends in when it returns `err`.
fn failure_phase(err: &VmError) -> CallPhase {
    if err.return_code() == ReturnCode::OutOfGas {
        CallPhase::OutOfGas
    } else {
        CallPhase::Failed
    }
}

fn advance(phase: &mut CallPhase, next: CallPhase) {
    debug_assert!(
        phase.can_transition_to(next),
        "illegal call phase transition {phase:?} -> {next:?}"
    );
    trace!(from = ?*phase, to = ?next, "call phase");
    *phase = next;
}

// =============================================================================
// TESTS
// =============================================================================
