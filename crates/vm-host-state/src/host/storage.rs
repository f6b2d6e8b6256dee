//! # Storage Context
//!
//! Per-account staged key → value mutations of the running transaction.
//!
//! ## Write rules
//!
//! 1. Keys under the reserved prefix are always rejected.
//! 2. Keys under the protected prefix are rejected while protection is on.
//! 3. Writes in a read-only call are skipped and reported as `Unchanged`.
//! 4. Otherwise the write is classified, charged and staged.
//!
//! Gas is charged against the immediately prior value: the staged one if
//! present, else the committed one.

use crate::config::HostConfig;
use crate::domain::entities::{AccountStorage, AccountStorageMap, CallFrame, StorageStatus, StorageUpdate};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::StorageError;
use crate::host::gas::{storage_write_cost, Operation, StorageByteCosts};
use crate::host::state_stack::StateStack;
use crate::ports::outbound::{BlockchainLookup, Metering};
use tracing::{debug, warn};

/// Saved storage state of a parent call.
#[derive(Clone, Debug)]
struct StorageSnapshot {
    accounts: AccountStorageMap,
    frame: CallFrame,
}

/// Staged storage of one transaction.
pub struct StorageContext<'a> {
    lookup: &'a dyn BlockchainLookup,
    accounts: AccountStorageMap,
    frame: CallFrame,
    stack: StateStack<StorageSnapshot>,
    reserved_prefix: Bytes,
    protected_prefix: Bytes,
}

impl<'a> StorageContext<'a> {
    /// Creates an empty context reading committed values through `lookup`.
    #[must_use]
    pub fn new(lookup: &'a dyn BlockchainLookup, config: &HostConfig) -> Self {
        Self {
            lookup,
            accounts: AccountStorageMap::new(),
            frame: CallFrame::default(),
            stack: StateStack::new(),
            reserved_prefix: config.reserved_key_prefix.clone(),
            protected_prefix: config.protected_key_prefix.clone(),
        }
    }

    // =========================================================================
    // CALL FRAME
    // =========================================================================

    /// Switches the active account.
    pub fn set_address(&mut self, address: Address) {
        self.frame.address = address;
    }

    /// The active account.
    #[must_use]
    pub fn address(&self) -> Address {
        self.frame.address
    }

    /// The current call frame.
    #[must_use]
    pub fn call_frame(&self) -> &CallFrame {
        &self.frame
    }

    /// Reinstates a call frame saved by the caller before a nested call.
    pub fn restore_call_frame(&mut self, frame: CallFrame) {
        self.frame = frame;
    }

    /// Marks the current call as read-only (or not).
    pub fn set_read_only(&mut self, read_only: bool) {
        self.frame.read_only = read_only;
    }

    /// Returns true if writes are currently skipped.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.frame.read_only
    }

    /// Returns true if protected keys are currently rejected.
    #[must_use]
    pub fn is_protection_enabled(&self) -> bool {
        self.frame.protection_enabled
    }

    pub(crate) fn enable_storage_protection(&mut self) {
        self.frame.protection_enabled = true;
    }

    pub(crate) fn disable_storage_protection(&mut self) {
        self.frame.protection_enabled = false;
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Value of `key` under the active account. Empty when nothing is found.
    #[must_use]
    pub fn get_storage(&self, key: &[u8]) -> Bytes {
        self.value_of(&self.frame.address, key)
    }

    /// Value of `key` under a foreign account.
    ///
    /// Returns `None` when the account does not expose its storage. The
    /// active account is always readable.
    #[must_use]
    pub fn get_storage_from_address(&self, address: &Address, key: &[u8]) -> Option<Bytes> {
        if *address == self.frame.address {
            return Some(self.get_storage(key));
        }

        match self.lookup.get_code_metadata(address) {
            Ok(metadata) if metadata.readable => Some(self.value_of(address, key)),
            Ok(_) => None,
            Err(err) => {
                warn!(%address, error = %err, "code metadata lookup failed");
                None
            }
        }
    }

    fn value_of(&self, address: &Address, key: &[u8]) -> Bytes {
        if let Some(update) = self
            .accounts
            .get(address)
            .and_then(|storage| storage.get(key))
        {
            return update.value.clone();
        }

        self.lookup
            .get_storage_data(address, key)
            .unwrap_or_else(|err| {
                warn!(%address, error = %err, "storage lookup failed, reading empty");
                Bytes::new()
            })
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Stages `value` under `key` for the active account.
    ///
    /// # Errors
    ///
    /// - `ReservedKey` / `ProtectedKey` when the key is not writable; no gas is charged.
    /// - `OutOfGas` when `metering` cannot cover the write; nothing is staged.
    pub fn set_storage<M: Metering + ?Sized>(
        &mut self,
        key: &[u8],
        value: &[u8],
        metering: &mut M,
    ) -> Result<StorageStatus, StorageError> {
        if key.starts_with(self.reserved_prefix.as_slice()) {
            return Err(StorageError::ReservedKey);
        }
        if self.frame.protection_enabled && key.starts_with(self.protected_prefix.as_slice()) {
            return Err(StorageError::ProtectedKey);
        }
        if self.frame.read_only {
            return Ok(StorageStatus::Unchanged);
        }

        let old = self.get_storage(key);
        let status = StorageStatus::classify(old.as_slice(), value);
        let prices = StorageByteCosts {
            store: metering.cost_of(Operation::StorePerByte),
            persist: metering.cost_of(Operation::PersistPerByte),
            release: metering.cost_of(Operation::ReleasePerByte),
        };
        let cost = storage_write_cost(
            old.len(),
            value.len(),
            status != StorageStatus::Unchanged,
            prices,
        );

        metering
            .use_gas(cost.charge)
            .map_err(|_| StorageError::OutOfGas)?;
        if cost.release > 0 {
            metering.free_gas(cost.release);
        }

        let key = Bytes::from(key);
        self.accounts.entry(self.frame.address).or_default().insert(
            key.clone(),
            StorageUpdate::new(key, Bytes::from(value)),
        );

        debug!(address = %self.frame.address, ?status, charge = cost.charge, "storage write");
        Ok(status)
    }

    /// Staged updates of `address`. Empty when there are none.
    #[must_use]
    pub fn get_storage_updates(&self, address: &Address) -> AccountStorage {
        self.accounts.get(address).cloned().unwrap_or_default()
    }

    /// All staged updates.
    #[must_use]
    pub fn accounts(&self) -> &AccountStorageMap {
        &self.accounts
    }

    // =========================================================================
    // STATE STACK
    // =========================================================================

    /// Saves a deep copy of the staged updates and call frame.
    pub fn push_state(&mut self) {
        self.stack.push(StorageSnapshot {
            accounts: self.accounts.clone(),
            frame: self.frame.clone(),
        });
    }

    /// Restores the most recent snapshot, dropping everything staged since.
    pub fn pop_set_active_state(&mut self) {
        if let Some(snapshot) = self.stack.pop() {
            self.accounts = snapshot.accounts;
            self.frame = snapshot.frame;
        }
    }

    /// Drops the most recent snapshot, keeping the current state.
    pub fn pop_discard(&mut self) {
        let _ = self.stack.pop();
    }

    /// Drops every snapshot.
    pub fn clear_state_stack(&mut self) {
        self.stack.clear();
    }

    /// Number of saved snapshots.
    #[must_use]
    pub fn state_stack_len(&self) -> usize {
        self.stack.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
