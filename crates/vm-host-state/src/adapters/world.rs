//! # In-Memory World
//!
//! In-memory blockchain lookup for tests and tooling.
//! A production implementation would read from the node's state database.

use crate::domain::entities::AccountInfo;
use crate::domain::value_objects::{Address, Bytes, StorageKey, U256};
use crate::errors::LookupError;
use crate::ports::outbound::BlockchainLookup;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-memory committed state.
#[derive(Debug, Default)]
pub struct InMemoryWorld {
    /// Accounts.
    accounts: RwLock<HashMap<Address, AccountInfo>>,
    /// Storage.
    storage: RwLock<HashMap<(Address, StorageKey), Bytes>>,
    /// When set, every lookup fails with `LookupError::Unavailable`.
    unavailable: AtomicBool,
}

impl InMemoryWorld {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account.
    pub fn put_account(&self, address: Address, account: AccountInfo) {
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address, account);
    }

    /// Sets the balance of an account, creating it if needed.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address)
            .or_default()
            .balance = balance;
    }

    /// Sets a committed storage value.
    pub fn set_storage(&self, address: Address, key: &[u8], value: &[u8]) {
        self.storage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((address, Bytes::from(key)), Bytes::from(value));
    }

    /// Makes every subsequent lookup fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), LookupError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LookupError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl BlockchainLookup for InMemoryWorld {
    fn get_storage_data(&self, address: &Address, key: &[u8]) -> Result<Bytes, LookupError> {
        self.check_available()?;
        let storage = self.storage.read().map_err(|_| LookupError::Unavailable)?;
        Ok(storage
            .get(&(*address, Bytes::from(key)))
            .cloned()
            .unwrap_or_default())
    }

    fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LookupError> {
        self.check_available()?;
        let accounts = self.accounts.read().map_err(|_| LookupError::Unavailable)?;
        Ok(accounts.get(address).cloned())
    }

    fn new_address(&self, creator: &Address, nonce: u64) -> Result<Address, LookupError> {
        self.check_available()?;
        let mut hasher = Keccak256::new();
        hasher.update(creator.as_bytes());
        hasher.update(nonce.to_be_bytes());
        Ok(Address::new(hasher.finalize().into()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
