//! # Gas Schedule
//!
//! Named operation costs and the storage write cost model.
//!
//! Host functions charge a base API cost plus a per-byte component; the
//! storage context charges the dynamic store/persist/release component.

use serde::{Deserialize, Serialize};

/// Bytes charged per log topic, independent of the topic's actual length.
pub const TOPIC_CHARGE_LEN: u64 = 32;

// =============================================================================
// OPERATIONS
// =============================================================================

/// A named, metered operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Per byte of newly stored data.
    StorePerByte,
    /// Per byte of re-persisted data.
    PersistPerByte,
    /// Per byte of released data (refunded).
    ReleasePerByte,
    /// Per byte of contract code prepared for execution.
    CompilePerByte,
    /// Per byte copied out of storage into the guest.
    DataCopyPerByte,
    /// Base cost of a storage write.
    StorageStore,
    /// Base cost of a storage read.
    StorageLoad,
    /// Base cost of a foreign-account storage read.
    GetStorageFromAddress,
    /// Base cost of appending finish data.
    Finish,
    /// Base cost of a value transfer.
    TransferValue,
    /// Base cost of emitting a log.
    Log,
    /// Base cost of a same-context nested call.
    ExecuteOnSameContext,
    /// Base cost of a different-context nested call.
    ExecuteOnDestContext,
    /// Base cost of a contract upgrade.
    UpgradeContract,
}

// =============================================================================
// GAS SCHEDULE
// =============================================================================

/// Gas cost of every [`Operation`].
///
/// Missing fields in a serialized schedule fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// See [`Operation::StorePerByte`].
    pub store_per_byte: u64,
    /// See [`Operation::PersistPerByte`].
    pub persist_per_byte: u64,
    /// See [`Operation::ReleasePerByte`].
    pub release_per_byte: u64,
    /// See [`Operation::CompilePerByte`].
    pub compile_per_byte: u64,
    /// See [`Operation::DataCopyPerByte`].
    pub data_copy_per_byte: u64,
    /// See [`Operation::StorageStore`].
    pub storage_store: u64,
    /// See [`Operation::StorageLoad`].
    pub storage_load: u64,
    /// See [`Operation::GetStorageFromAddress`].
    pub get_storage_from_address: u64,
    /// See [`Operation::Finish`].
    pub finish: u64,
    /// See [`Operation::TransferValue`].
    pub transfer_value: u64,
    /// See [`Operation::Log`].
    pub log: u64,
    /// See [`Operation::ExecuteOnSameContext`].
    pub execute_on_same_context: u64,
    /// See [`Operation::ExecuteOnDestContext`].
    pub execute_on_dest_context: u64,
    /// See [`Operation::UpgradeContract`].
    pub upgrade_contract: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            store_per_byte: 50,
            persist_per_byte: 10,
            release_per_byte: 5,
            compile_per_byte: 1,
            data_copy_per_byte: 1,
            storage_store: 100,
            storage_load: 100,
            get_storage_from_address: 100,
            finish: 10,
            transfer_value: 100,
            log: 100,
            execute_on_same_context: 1_000,
            execute_on_dest_context: 1_000,
            upgrade_contract: 1_000,
        }
    }
}

impl GasSchedule {
    /// A schedule where every operation costs `value`.
    #[must_use]
    pub fn uniform(value: u64) -> Self {
        Self {
            store_per_byte: value,
            persist_per_byte: value,
            release_per_byte: value,
            compile_per_byte: value,
            data_copy_per_byte: value,
            storage_store: value,
            storage_load: value,
            get_storage_from_address: value,
            finish: value,
            transfer_value: value,
            log: value,
            execute_on_same_context: value,
            execute_on_dest_context: value,
            upgrade_contract: value,
        }
    }

    /// A schedule where only the storage per-byte costs are non-zero.
    #[must_use]
    pub fn storage_only(store: u64, persist: u64, release: u64) -> Self {
        Self {
            store_per_byte: store,
            persist_per_byte: persist,
            release_per_byte: release,
            ..Self::uniform(0)
        }
    }

    /// Cost of `op`.
    #[must_use]
    pub const fn cost(&self, op: Operation) -> u64 {
        match op {
            Operation::StorePerByte => self.store_per_byte,
            Operation::PersistPerByte => self.persist_per_byte,
            Operation::ReleasePerByte => self.release_per_byte,
            Operation::CompilePerByte => self.compile_per_byte,
            Operation::DataCopyPerByte => self.data_copy_per_byte,
            Operation::StorageStore => self.storage_store,
            Operation::StorageLoad => self.storage_load,
            Operation::GetStorageFromAddress => self.get_storage_from_address,
            Operation::Finish => self.finish,
            Operation::TransferValue => self.transfer_value,
            Operation::Log => self.log,
            Operation::ExecuteOnSameContext => self.execute_on_same_context,
            Operation::ExecuteOnDestContext => self.execute_on_dest_context,
            Operation::UpgradeContract => self.upgrade_contract,
        }
    }
}

// =============================================================================
// STORAGE WRITE COST
// =============================================================================

/// Gas outcome of one storage write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageWriteCost {
    /// Gas to charge.
    pub charge: u64,
    /// Gas to release through the free-gas path.
    pub release: u64,
}

/// Per-byte prices feeding [`storage_write_cost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageByteCosts {
    /// Price of a grown byte.
    pub store: u64,
    /// Price of a re-persisted byte.
    pub persist: u64,
    /// Refund of a released byte.
    pub release: u64,
}

/// Cost of replacing a value of `old_len` bytes by `new_len` bytes.
///
/// `changed` is false when old and new values are identical, which costs nothing.
#[must_use]
pub fn storage_write_cost(
    old_len: usize,
    new_len: usize,
    changed: bool,
    prices: StorageByteCosts,
) -> StorageWriteCost {
    if !changed {
        return StorageWriteCost::default();
    }

    let old_len = old_len as u64;
    let new_len = new_len as u64;

    if new_len > old_len {
        StorageWriteCost {
            charge: prices
                .store
                .saturating_mul(new_len - old_len)
                .saturating_add(prices.persist.saturating_mul(old_len)),
            release: 0,
        }
    } else {
        StorageWriteCost {
            charge: prices.persist.saturating_mul(new_len),
            release: prices.release.saturating_mul(old_len - new_len),
        }
    }
}

/// Compilation cost of `code_len` bytes of code.
#[must_use]
pub fn compile_cost(schedule: &GasSchedule, code_len: usize) -> u64 {
    schedule.compile_per_byte.saturating_mul(code_len as u64)
}

// =============================================================================
// TESTS
// =============================================================================
