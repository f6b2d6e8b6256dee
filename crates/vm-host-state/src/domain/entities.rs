//! # Core Domain Entities
//!
//! Main business entities for host-side contract execution: storage updates,
//! call frames, per-account output and the transaction output record.

use crate::domain::value_objects::{
    Address, BalanceDelta, Bytes, CodeMetadata, StorageKey, StorageValue, U256,
};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

/// Finish marker appended by the host after a nested call succeeds.
pub const SUCCESS_MARKER: &[u8] = b"succ";

/// Finish marker appended by the host after a nested call fails.
pub const FAILURE_MARKER: &[u8] = b"fail";

// =============================================================================
// STORAGE
// =============================================================================

/// Classification of a single storage write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageStatus {
    /// The new value equals the current one (including empty → empty),
    /// or the write was skipped because the call is read-only.
    Unchanged,
    /// Both old and new values are non-empty and differ.
    Modified,
    /// No prior value; the new value is non-empty.
    Added,
    /// A prior value was replaced by an empty one.
    Deleted,
}

impl StorageStatus {
    /// Classifies a write of `new` over `old`.
    #[must_use]
    pub fn classify(old: &[u8], new: &[u8]) -> Self {
        if old == new {
            Self::Unchanged
        } else if old.is_empty() {
            Self::Added
        } else if new.is_empty() {
            Self::Deleted
        } else {
            Self::Modified
        }
    }
}

/// Net effect of all writes to one key of one account in the current transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUpdate {
    /// Storage key.
    pub key: StorageKey,
    /// Latest staged value (empty means deleted).
    pub value: StorageValue,
}

impl StorageUpdate {
    /// Creates a new storage update.
    #[must_use]
    pub fn new(key: StorageKey, value: StorageValue) -> Self {
        Self { key, value }
    }
}

/// Staged updates of one account, keyed by storage key.
pub type AccountStorage = BTreeMap<StorageKey, StorageUpdate>;

/// Staged updates of all accounts touched by the transaction.
pub type AccountStorageMap = BTreeMap<Address, AccountStorage>;

// =============================================================================
// CALL FRAME
// =============================================================================

/// Implicit state of the currently executing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFrame {
    /// Account whose storage is read and written.
    pub address: Address,
    /// Protected-prefix keys are rejected while this is set.
    pub protection_enabled: bool,
    /// Writes are silently skipped while this is set.
    pub read_only: bool,
}

impl Default for CallFrame {
    fn default() -> Self {
        Self {
            address: Address::ZERO,
            protection_enabled: true,
            read_only: false,
        }
    }
}

/// Isolation model of a nested call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallMode {
    /// The callee runs in the caller's account scope and shares its live state.
    SameContext,
    /// The callee runs in its own account scope on an isolated output frame.
    DestinationContext,
}

impl CallMode {
    /// Short label used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SameContext => "same_context",
            Self::DestinationContext => "dest_context",
        }
    }
}

/// Lifecycle of one call frame.
///
/// `Entered → Executing → (Succeeded | Failed | OutOfGas) → Returned`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallPhase {
    /// State has been pushed.
    Entered,
    /// Guest code is running.
    Executing,
    /// Guest code returned normally.
    Succeeded,
    /// Guest code signalled an error.
    Failed,
    /// Guest code exhausted its gas.
    OutOfGas,
    /// State has been popped. Terminal.
    Returned,
}

impl CallPhase {
    /// Returns true if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: CallPhase) -> bool {
        matches!(
            (self, next),
            (Self::Entered, Self::Executing)
                | (Self::Entered, Self::Failed)
                | (Self::Entered, Self::OutOfGas)
                | (Self::Executing, Self::Succeeded)
                | (Self::Executing, Self::Failed)
                | (Self::Executing, Self::OutOfGas)
                | (Self::Succeeded, Self::Returned)
                | (Self::Failed, Self::Returned)
                | (Self::OutOfGas, Self::Returned)
        )
    }
}

/// What a nested call reports back to its caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The child completed; its effects are kept.
    Succeeded {
        /// Gas the parent was charged for the child.
        gas_used: u64,
    },
    /// The child failed or ran out of gas; its effects were rolled back.
    Failed {
        /// Return code describing the failure.
        return_code: ReturnCode,
        /// Human readable failure message.
        message: String,
        /// Gas the parent was charged for the child, penalty included.
        gas_charged: u64,
    },
}

impl CallOutcome {
    /// Returns true for a successful call.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

// =============================================================================
// INPUTS
// =============================================================================

/// Kind of top-level transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Deploys a new contract and runs its `init` function.
    Deploy,
    /// Calls a function of an existing contract.
    Call,
    /// Off-chain, read-only call without a value.
    Query,
    /// Plain value transfer; no code is executed.
    Transfer,
}

impl TransactionKind {
    /// Whether the transaction carries a meaningful sender.
    #[must_use]
    pub const fn has_sender(&self) -> bool {
        !matches!(self, Self::Query)
    }

    /// Whether the transaction targets an existing account.
    #[must_use]
    pub const fn has_receiver(&self) -> bool {
        !matches!(self, Self::Deploy)
    }

    /// Whether the transaction names a function to run.
    #[must_use]
    pub const fn has_function(&self) -> bool {
        matches!(self, Self::Call | Self::Query)
    }

    /// Whether the transaction may transfer value.
    #[must_use]
    pub const fn has_value(&self) -> bool {
        !matches!(self, Self::Query)
    }

    /// Whether contract code runs.
    #[must_use]
    pub const fn is_smart_contract_tx(&self) -> bool {
        !matches!(self, Self::Transfer)
    }
}

/// A top-level transaction handed to the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Sender account.
    pub sender: Address,
    /// Receiver account. Ignored for deployments.
    pub recipient: Address,
    /// Sender nonce; used to derive deployment addresses.
    pub nonce: u64,
    /// Value moved from sender to recipient.
    pub value: U256,
    /// Function to call (`init` for deployments).
    pub function: String,
    /// Call arguments.
    pub arguments: Vec<Bytes>,
    /// Contract code, for deployments.
    pub code: Bytes,
    /// Metadata of the deployed code.
    pub code_metadata: CodeMetadata,
    /// Gas available to the whole transaction.
    pub gas_limit: u64,
}

impl TransactionInput {
    /// Name of the function run on deployment.
    pub const INIT_FUNCTION: &'static str = "init";

    /// A contract call.
    #[must_use]
    pub fn call(sender: Address, recipient: Address, function: &str, gas_limit: u64) -> Self {
        Self {
            kind: TransactionKind::Call,
            sender,
            recipient,
            nonce: 0,
            value: U256::zero(),
            function: function.to_string(),
            arguments: Vec::new(),
            code: Bytes::new(),
            code_metadata: CodeMetadata::default(),
            gas_limit,
        }
    }

    /// A read-only query.
    #[must_use]
    pub fn query(recipient: Address, function: &str, gas_limit: u64) -> Self {
        Self {
            kind: TransactionKind::Query,
            sender: Address::ZERO,
            ..Self::call(Address::ZERO, recipient, function, gas_limit)
        }
    }

    /// A contract deployment.
    #[must_use]
    pub fn deploy(sender: Address, nonce: u64, code: Bytes, metadata: CodeMetadata, gas_limit: u64) -> Self {
        Self {
            kind: TransactionKind::Deploy,
            nonce,
            code,
            code_metadata: metadata,
            ..Self::call(sender, Address::ZERO, Self::INIT_FUNCTION, gas_limit)
        }
    }

    /// A plain value transfer.
    #[must_use]
    pub fn transfer(sender: Address, recipient: Address, value: U256) -> Self {
        Self {
            kind: TransactionKind::Transfer,
            value,
            ..Self::call(sender, recipient, "", 0)
        }
    }

    /// Sets the transferred value.
    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the call arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<Bytes>) -> Self {
        self.arguments = arguments;
        self
    }
}

/// Input of one call frame, top-level or nested, as seen by the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallInput {
    /// Account that initiated this call.
    pub caller: Address,
    /// Account whose code runs.
    pub callee: Address,
    /// Value moved from caller to callee.
    pub value: U256,
    /// Function to run.
    pub function: String,
    /// Call arguments.
    pub arguments: Vec<Bytes>,
    /// Gas made available to the frame.
    pub gas_provided: u64,
    /// Code of the callee.
    pub code: Bytes,
    /// Call depth, 0 for the top-level call.
    pub depth: usize,
}

/// A nested call requested by running guest code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestedCall {
    /// Contract to call.
    pub callee: Address,
    /// Value to send along.
    pub value: U256,
    /// Function to run.
    pub function: String,
    /// Call arguments.
    pub arguments: Vec<Bytes>,
    /// Gas the caller is willing to give.
    pub gas_limit: u64,
}

impl NestedCall {
    /// A call of `function` on `callee` with no value and no arguments.
    #[must_use]
    pub fn new(callee: Address, function: &str, gas_limit: u64) -> Self {
        Self {
            callee,
            value: U256::zero(),
            function: function.to_string(),
            arguments: Vec::new(),
            gas_limit,
        }
    }

    /// Sets the transferred value.
    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the call arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<Bytes>) -> Self {
        self.arguments = arguments;
        self
    }
}

// =============================================================================
// ACCOUNT INFO (for BlockchainLookup port)
// =============================================================================

/// On-chain account data returned by the blockchain lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Committed balance.
    pub balance: U256,
    /// Account nonce.
    pub nonce: u64,
    /// Contract code (empty for plain accounts).
    pub code: Bytes,
    /// Contract capability flags.
    pub code_metadata: CodeMetadata,
}

impl AccountInfo {
    /// A plain account with a balance.
    #[must_use]
    pub fn new_user(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// A contract account.
    #[must_use]
    pub fn new_contract(code: Bytes, metadata: CodeMetadata, balance: U256) -> Self {
        Self {
            balance,
            nonce: 0,
            code,
            code_metadata: metadata,
        }
    }

    /// Returns true if the account holds code.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Outcome code of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnCode {
    /// Execution completed.
    #[default]
    Ok,
    /// The called function does not exist.
    FunctionNotFound,
    /// The called account holds no code.
    ContractNotFound,
    /// Guest code signalled an error.
    UserError,
    /// Gas was exhausted.
    OutOfGas,
    /// A transfer exceeded the sender's balance.
    OutOfFunds,
    /// The nested call depth limit was exceeded.
    CallStackOverflow,
    /// Any other execution failure.
    ExecutionFailed,
}

impl ReturnCode {
    /// Canonical message for the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::FunctionNotFound => "function not found",
            Self::ContractNotFound => "contract not found",
            Self::UserError => "user error",
            Self::OutOfGas => "out of gas",
            Self::OutOfFunds => "out of funds",
            Self::CallStackOverflow => "call stack overflow",
            Self::ExecutionFailed => "execution failed",
        }
    }
}

/// Log entry emitted by a contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emitting account.
    pub address: Address,
    /// Event identifier (endpoint name).
    pub identifier: Bytes,
    /// Indexed topics.
    pub topics: Vec<Bytes>,
    /// Non-indexed payload.
    pub data: Bytes,
}

impl LogEntry {
    /// Creates a new log entry.
    #[must_use]
    pub fn new(address: Address, identifier: Bytes, topics: Vec<Bytes>, data: Bytes) -> Self {
        Self {
            address,
            identifier,
            topics,
            data,
        }
    }
}

/// Aggregated effect of a transaction on one account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputAccount {
    /// Account address.
    pub address: Address,
    /// Sum of all transfers in and out.
    pub balance_delta: BalanceDelta,
    /// Net storage updates keyed by storage key.
    pub storage_updates: AccountStorage,
    /// Deployed or upgraded code.
    pub code: Option<Bytes>,
    /// Metadata of the deployed or upgraded code.
    pub code_metadata: Option<CodeMetadata>,
    /// Data attached to the last transfer into this account.
    pub call_data: Bytes,
}

impl OutputAccount {
    /// Creates an empty output account.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Folds a later output of the same account into this one.
    ///
    /// Balance deltas add up, storage updates and code are last-writer-wins.
    pub fn merge(&mut self, later: OutputAccount) {
        self.balance_delta = self.balance_delta.add(later.balance_delta);
        self.storage_updates.extend(later.storage_updates);
        if later.code.is_some() {
            self.code = later.code;
            self.code_metadata = later.code_metadata;
        }
        if !later.call_data.is_empty() {
            self.call_data = later.call_data;
        }
    }

    /// Returns true when the account carries no effect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance_delta.is_zero()
            && self.storage_updates.is_empty()
            && self.code.is_none()
            && self.call_data.is_empty()
    }
}

/// The result of one transaction, consumed by the caller that commits it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Outcome code.
    pub return_code: ReturnCode,
    /// Outcome message (empty on success).
    pub return_message: String,
    /// Per-account effects.
    pub output_accounts: BTreeMap<Address, OutputAccount>,
    /// Ordered result data blocks.
    pub finish_data: Vec<Bytes>,
    /// Gas left after execution.
    pub gas_remaining: u64,
    /// Gas returned for released storage bytes.
    pub gas_refund: u64,
    /// Emitted logs, in emission order.
    pub logs: Vec<LogEntry>,
}

impl TransactionOutput {
    /// A clean failure: no effects, no gas left.
    #[must_use]
    pub fn failure(return_code: ReturnCode, message: impl Into<String>) -> Self {
        Self {
            return_code,
            return_message: message.into(),
            ..Self::default()
        }
    }

    /// Returns true if the transaction completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.return_code == ReturnCode::Ok
    }

    /// Output account of `address`, if the transaction touched it.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&OutputAccount> {
        self.output_accounts.get(address)
    }

    /// Finish data as UTF-8 strings (lossy), handy for assertions and logs.
    #[must_use]
    pub fn finish_strings(&self) -> Vec<String> {
        self.finish_data
            .iter()
            .map(|data| String::from_utf8_lossy(data.as_slice()).into_owned())
            .collect()
    }

    /// Keccak-256 digest over the logs, in emission order.
    #[must_use]
    pub fn logs_hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        for log in &self.logs {
            hasher.update(log.address.as_bytes());
            hash_chunk(&mut hasher, log.identifier.as_slice());
            hasher.update((log.topics.len() as u64).to_be_bytes());
            for topic in &log.topics {
                hash_chunk(&mut hasher, topic.as_slice());
            }
            hash_chunk(&mut hasher, log.data.as_slice());
        }
        hasher.finalize().into()
    }

    /// Encodes the output as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the output types never produce one in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Length-prefixed hash update, so adjacent chunks cannot collide.
fn hash_chunk(hasher: &mut Keccak256, chunk: &[u8]) {
    hasher.update((chunk.len() as u64).to_be_bytes());
    hasher.update(chunk);
}

// =============================================================================
// TESTS
// =============================================================================
