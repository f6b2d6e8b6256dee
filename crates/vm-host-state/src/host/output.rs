//! # Output Accumulator
//!
//! Builds the transaction output incrementally as calls complete: balance
//! deltas and code per account, ordered finish data and logs.
//!
//! ## Frames
//!
//! - `push_state` parks a copy of the current frame; the child keeps writing
//!   into the live frame (same-context calls).
//! - `push_isolated_state` parks the current frame and gives the child an
//!   empty one (different-context calls). `pop_merge_active_state` folds the
//!   child's frame back into the parent on success.
//! - `pop_set_active_state` restores the parked frame, dropping the child's effects.
//!
//! Storage updates live in the storage context and are collected by `finalize`.

use crate::domain::entities::{LogEntry, OutputAccount, ReturnCode, TransactionOutput};
use crate::domain::value_objects::{Address, BalanceDelta, Bytes, CodeMetadata, U256};
use crate::errors::VmError;
use crate::host::state_stack::StateStack;
use crate::host::storage::StorageContext;
use crate::ports::outbound::BlockchainLookup;
use std::collections::BTreeMap;
use tracing::debug;

/// How a frame was started relative to the frame parked below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FrameOrigin {
    /// Copy of the parent; already contains everything the parent saw.
    #[default]
    Shared,
    /// Fresh frame; the parent's effects live only in the parked frame.
    Isolated,
}

/// Output effects gathered by one frame.
#[derive(Clone, Debug, Default)]
struct OutputFrame {
    accounts: BTreeMap<Address, OutputAccount>,
    finish_data: Vec<Bytes>,
    logs: Vec<LogEntry>,
}

impl OutputFrame {
    fn account_mut(&mut self, address: Address) -> &mut OutputAccount {
        self.accounts
            .entry(address)
            .or_insert_with(|| OutputAccount::new(address))
    }

    fn delta_of(&self, address: &Address) -> BalanceDelta {
        self.accounts
            .get(address)
            .map_or(BalanceDelta::ZERO, |account| account.balance_delta)
    }

    fn merge(&mut self, child: OutputFrame) {
        for (address, account) in child.accounts {
            self.account_mut(address).merge(account);
        }
        self.finish_data.extend(child.finish_data);
        self.logs.extend(child.logs);
    }
}

#[derive(Clone, Debug)]
struct ParkedFrame {
    frame: OutputFrame,
    origin: FrameOrigin,
}

/// Output accumulator of one transaction.
pub struct OutputContext<'a> {
    lookup: &'a dyn BlockchainLookup,
    frame: OutputFrame,
    origin: FrameOrigin,
    stack: StateStack<ParkedFrame>,
}

impl<'a> OutputContext<'a> {
    /// Creates an empty accumulator reading committed balances through `lookup`.
    #[must_use]
    pub fn new(lookup: &'a dyn BlockchainLookup) -> Self {
        Self {
            lookup,
            frame: OutputFrame::default(),
            origin: FrameOrigin::Shared,
            stack: StateStack::new(),
        }
    }

    // =========================================================================
    // BALANCES
    // =========================================================================

    /// Adds `delta` to the balance delta of `address`.
    pub fn add_to_balance(&mut self, address: Address, delta: BalanceDelta) {
        let account = self.frame.account_mut(address);
        account.balance_delta = account.balance_delta.add(delta);
    }

    /// Balance delta of `address` visible to the running call.
    #[must_use]
    pub fn visible_delta(&self, address: &Address) -> BalanceDelta {
        let mut delta = self.frame.delta_of(address);
        let mut origin = self.origin;
        for parked in self.stack.iter_from_top() {
            if origin == FrameOrigin::Isolated {
                delta = delta.add(parked.frame.delta_of(address));
            }
            origin = parked.origin;
        }
        delta
    }

    /// Committed balance of `address` plus every visible delta.
    ///
    /// # Errors
    ///
    /// Returns `VmError::Lookup` when the committed balance cannot be read.
    pub fn effective_balance(&self, address: &Address) -> Result<U256, VmError> {
        let committed = self.lookup.get_balance(address)?;
        // Unchecked `add_to_balance` debits may overdraw; that reads as zero.
        Ok(self
            .visible_delta(address)
            .apply_to(committed)
            .unwrap_or_default())
    }

    /// Moves `value` from `sender` to `receiver`, attaching `data` to the receiver.
    ///
    /// A zero-value transfer without data records nothing.
    ///
    /// # Errors
    ///
    /// Returns `VmError::OutOfFunds` when the sender's effective balance is
    /// below `value`; nothing is recorded then.
    pub fn transfer(
        &mut self,
        sender: Address,
        receiver: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), VmError> {
        if value.is_zero() && data.is_empty() {
            return Ok(());
        }
        if !value.is_zero() && self.effective_balance(&sender)? < value {
            return Err(VmError::OutOfFunds);
        }

        self.add_to_balance(sender, BalanceDelta::debit(value));
        self.add_to_balance(receiver, BalanceDelta::credit(value));
        if !data.is_empty() {
            self.frame.account_mut(receiver).call_data = Bytes::from(data);
        }
        debug!(%sender, %receiver, %value, "transfer");
        Ok(())
    }

    // =========================================================================
    // DATA
    // =========================================================================

    /// Appends a finish data block.
    pub fn finish(&mut self, data: Bytes) {
        self.frame.finish_data.push(data);
    }

    /// Finish data of the current frame.
    #[must_use]
    pub fn finish_data(&self) -> &[Bytes] {
        &self.frame.finish_data
    }

    /// Appends a log entry.
    pub fn write_log(&mut self, address: Address, identifier: Bytes, topics: Vec<Bytes>, data: Bytes) {
        self.frame
            .logs
            .push(LogEntry::new(address, identifier, topics, data));
    }

    /// Logs of the current frame.
    #[must_use]
    pub fn logs(&self) -> &[LogEntry] {
        &self.frame.logs
    }

    /// Records deployed or upgraded code for `address`.
    pub fn deploy_code(&mut self, address: Address, code: Bytes, metadata: CodeMetadata) {
        let account = self.frame.account_mut(address);
        account.code = Some(code);
        account.code_metadata = Some(metadata);
    }

    /// Output account of `address` in the current frame.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&OutputAccount> {
        self.frame.accounts.get(address)
    }

    // =========================================================================
    // STATE STACK
    // =========================================================================

    /// Parks a copy of the current frame; the child shares the live frame.
    pub fn push_state(&mut self) {
        self.stack.push(ParkedFrame {
            frame: self.frame.clone(),
            origin: self.origin,
        });
        self.origin = FrameOrigin::Shared;
    }

    /// Parks the current frame and starts an empty one.
    pub fn push_isolated_state(&mut self) {
        self.stack.push(ParkedFrame {
            frame: std::mem::take(&mut self.frame),
            origin: self.origin,
        });
        self.origin = FrameOrigin::Isolated;
    }

    /// Restores the parked frame, dropping the child's effects. No-op if empty.
    pub fn pop_set_active_state(&mut self) {
        if let Some(parked) = self.stack.pop() {
            self.frame = parked.frame;
            self.origin = parked.origin;
        }
    }

    /// Drops the parked frame, keeping the live one. No-op if empty.
    pub fn pop_discard(&mut self) {
        if let Some(parked) = self.stack.pop() {
            self.origin = parked.origin;
        }
    }

    /// Restores the parked frame and merges the child's frame into it. No-op if empty.
    pub fn pop_merge_active_state(&mut self) {
        if let Some(parked) = self.stack.pop() {
            let child = std::mem::replace(&mut self.frame, parked.frame);
            self.origin = parked.origin;
            self.frame.merge(child);
        }
    }

    /// Number of parked frames.
    #[must_use]
    pub fn state_stack_len(&self) -> usize {
        self.stack.len()
    }

    // =========================================================================
    // FINALIZATION
    // =========================================================================

    /// Builds the transaction output.
    ///
    /// Parked frames left over by an aborted call are ignored.
    #[must_use]
    pub fn finalize(
        self,
        storage: &StorageContext<'_>,
        gas_remaining: u64,
        gas_refund: u64,
    ) -> TransactionOutput {
        let mut output_accounts = self.frame.accounts;
        for (address, updates) in storage.accounts() {
            if updates.is_empty() {
                continue;
            }
            output_accounts
                .entry(*address)
                .or_insert_with(|| OutputAccount::new(*address))
                .storage_updates = updates.clone();
        }

        TransactionOutput {
            return_code: ReturnCode::Ok,
            return_message: String::new(),
            output_accounts,
            finish_data: self.frame.finish_data,
            gas_remaining,
            gas_refund,
            logs: self.frame.logs,
        }
    }

    /// Output of a transaction that failed as a whole: no effects, no gas left.
    #[must_use]
    pub fn failure_output(return_code: ReturnCode, message: impl Into<String>) -> TransactionOutput {
        TransactionOutput::failure(return_code, message)
    }
}

// =============================================================================
// TESTS
// =============================================================================
