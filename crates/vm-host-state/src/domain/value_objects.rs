//! # Value Objects
//!
//! Immutable domain primitives for host-side contract execution.
//! These types represent concepts that are defined by their value, not identity.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;

// Re-export U256 from primitive-types for 256-bit arithmetic
pub use primitive_types::U256;

// =============================================================================
// ADDRESS (32 bytes)
// =============================================================================

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte account address (contract or plain account).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Creates an address from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == ADDRESS_LEN {
            let mut bytes = [0u8; ADDRESS_LEN];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Creates an address from a short name, right-padded with `.`.
    ///
    /// Names longer than 32 bytes are truncated. Handy for fixtures such as
    /// `Address::from_name("parentSC")`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut bytes = [b'.'; ADDRESS_LEN];
        let len = name.len().min(ADDRESS_LEN);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[30..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; ADDRESS_LEN] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = decode_hex(deserializer)?;
        Self::from_slice(&raw)
            .ok_or_else(|| D::Error::custom(format!("expected {ADDRESS_LEN} bytes, got {}", raw.len())))
    }
}

/// Reads a `0x`-prefixed (or bare) hex string.
fn decode_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)
}

// =============================================================================
// BYTES (variable length)
// =============================================================================

/// Variable-length byte vector for storage values, finish data and code.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Creates an empty Bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates Bytes from a vector.
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(vec)
    }

    /// Creates Bytes from a slice.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Returns the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Returns a reference to the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() <= 8 {
            write!(f, "0x")?;
            for byte in &self.0 {
                write!(f, "{byte:02x}")?;
            }
        } else {
            write!(f, "0x")?;
            for byte in &self.0[..4] {
                write!(f, "{byte:02x}")?;
            }
            write!(f, "..({} bytes)", self.0.len())?;
        }
        Ok(())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl From<&str> for Bytes {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Bytes {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Lets byte-keyed maps be queried with plain slices.
impl Borrow<[u8]> for Bytes {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

// Hex strings keep byte-keyed maps representable as JSON objects.
impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decode_hex(deserializer).map(Self)
    }
}

// =============================================================================
// STORAGE KEY & VALUE (variable length)
// =============================================================================

/// A storage key. Arbitrary bytes.
pub type StorageKey = Bytes;

/// A storage value. An empty value means "deleted".
pub type StorageValue = Bytes;

// =============================================================================
// BALANCE DELTA (signed 256-bit)
// =============================================================================

/// Signed balance change of one account over a whole transaction.
///
/// ## Invariants
/// - zero is never negative (`-0` is normalized to `+0`)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "RawBalanceDelta")]
pub struct BalanceDelta {
    negative: bool,
    magnitude: U256,
}

/// Wire form of [`BalanceDelta`] before `-0` normalization.
#[derive(Deserialize)]
struct RawBalanceDelta {
    negative: bool,
    magnitude: U256,
}

impl From<RawBalanceDelta> for BalanceDelta {
    fn from(raw: RawBalanceDelta) -> Self {
        Self {
            negative: raw.negative && !raw.magnitude.is_zero(),
            magnitude: raw.magnitude,
        }
    }
}

impl BalanceDelta {
    /// The zero delta.
    pub const ZERO: Self = Self {
        negative: false,
        magnitude: U256([0; 4]),
    };

    /// A credit of `amount`.
    #[must_use]
    pub fn credit(amount: U256) -> Self {
        Self {
            negative: false,
            magnitude: amount,
        }
    }

    /// A debit of `amount`.
    #[must_use]
    pub fn debit(amount: U256) -> Self {
        Self {
            negative: !amount.is_zero(),
            magnitude: amount,
        }
    }

    /// Convenience constructor from a signed 64-bit amount.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        let magnitude = U256::from(value.unsigned_abs());
        if value < 0 {
            Self::debit(magnitude)
        } else {
            Self::credit(magnitude)
        }
    }

    /// Returns true for a strictly negative delta.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.negative
    }

    /// Returns true for a zero delta.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    /// Absolute value of the delta.
    #[must_use]
    pub const fn magnitude(&self) -> U256 {
        self.magnitude
    }

    /// Sum of two deltas. Saturates at `U256::MAX` in magnitude.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        if self.negative == other.negative {
            let magnitude = self.magnitude.saturating_add(other.magnitude);
            return Self {
                negative: self.negative && !magnitude.is_zero(),
                magnitude,
            };
        }
        if self.magnitude >= other.magnitude {
            let magnitude = self.magnitude - other.magnitude;
            Self {
                negative: self.negative && !magnitude.is_zero(),
                magnitude,
            }
        } else {
            Self {
                negative: other.negative,
                magnitude: other.magnitude - self.magnitude,
            }
        }
    }

    /// Applies the delta to a balance. Returns None when the result would be negative.
    #[must_use]
    pub fn apply_to(&self, balance: U256) -> Option<U256> {
        if self.negative {
            balance.checked_sub(self.magnitude)
        } else {
            Some(balance.saturating_add(self.magnitude))
        }
    }
}

impl fmt::Debug for BalanceDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for BalanceDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

// =============================================================================
// CODE METADATA
// =============================================================================

/// Capability flags of a contract account, stored as two bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CodeMetadata {
    /// Code may be replaced by an upgrade call.
    pub upgradeable: bool,
    /// Other contracts may read this account's storage.
    pub readable: bool,
    /// The contract accepts value transfers.
    pub payable: bool,
}

impl CodeMetadata {
    /// Byte 0 flag: upgradeable.
    pub const UPGRADEABLE: u8 = 0x01;
    /// Byte 0 flag: readable.
    pub const READABLE: u8 = 0x04;
    /// Byte 1 flag: payable.
    pub const PAYABLE: u8 = 0x02;

    /// Decodes metadata from its byte form. Missing bytes read as zero.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let first = bytes.first().copied().unwrap_or(0);
        let second = bytes.get(1).copied().unwrap_or(0);
        Self {
            upgradeable: first & Self::UPGRADEABLE != 0,
            readable: first & Self::READABLE != 0,
            payable: second & Self::PAYABLE != 0,
        }
    }

    /// Encodes metadata to its two-byte form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 2] {
        let mut first = 0u8;
        if self.upgradeable {
            first |= Self::UPGRADEABLE;
        }
        if self.readable {
            first |= Self::READABLE;
        }
        let second = if self.payable { Self::PAYABLE } else { 0 };
        [first, second]
    }
}

impl fmt::Debug for CodeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.to_bytes();
        write!(f, "CodeMetadata({a:02x}{b:02x})")
    }
}

// =============================================================================
// TESTS
// =============================================================================
