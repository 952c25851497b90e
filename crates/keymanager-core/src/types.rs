//! Strong type definitions for the key manager.
//!
//! Storage keys and nonce indices are newtypes so they cannot be mixed up
//! with arbitrary 32-byte words at compile time.

use alloy_primitives::{FixedBytes, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::permission::Permission;

/// A 4-byte function selector.
pub type Selector = FixedBytes<4>;

/// A 4-byte ERC-165 interface identifier.
pub type InterfaceId = FixedBytes<4>;

/// A 32-byte key in the account's key-value storage.
///
/// Serializes as a `0x`-prefixed hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DataKey(pub [u8; 32]);

impl DataKey {
    /// Create a key from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string (no `0x` prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Interpret the key as a big-endian unsigned 256-bit integer.
    pub fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    /// Build a key from a big-endian unsigned 256-bit integer.
    pub fn from_u256(value: U256) -> Self {
        Self(value.to_be_bytes::<32>())
    }

    /// Whether every byte of the key is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The zero key.
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey(0x{})", self.to_hex())
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for DataKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for DataKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<B256> for DataKey {
    fn from(word: B256) -> Self {
        Self(word.0)
    }
}

impl From<DataKey> for B256 {
    fn from(key: DataKey) -> Self {
        B256::from(key.0)
    }
}

impl Serialize for DataKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DataKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DataKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&[u8]> for DataKey {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A relay nonce: an independent counter per channel.
///
/// Exposed to callers as one 256-bit number with the channel in the high
/// 128 bits and the counter in the low 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NonceIndex {
    pub channel: u128,
    pub counter: u128,
}

impl NonceIndex {
    pub const fn new(channel: u128, counter: u128) -> Self {
        Self { channel, counter }
    }

    /// Split a packed 256-bit index into channel and counter.
    pub fn from_u256(index: U256) -> Self {
        let limbs = index.as_limbs();
        Self {
            counter: (limbs[1] as u128) << 64 | limbs[0] as u128,
            channel: (limbs[3] as u128) << 64 | limbs[2] as u128,
        }
    }

    /// Pack channel and counter into one 256-bit index.
    pub fn to_u256(self) -> U256 {
        U256::from_limbs([
            self.counter as u64,
            (self.counter >> 64) as u64,
            self.channel as u64,
            (self.channel >> 64) as u64,
        ])
    }
}

impl From<U256> for NonceIndex {
    fn from(index: U256) -> Self {
        Self::from_u256(index)
    }
}

impl From<NonceIndex> for U256 {
    fn from(index: NonceIndex) -> Self {
        index.to_u256()
    }
}

/// Operation types accepted by the account's `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperationType {
    Call = 0,
    Create = 1,
    Create2 = 2,
    StaticCall = 3,
    DelegateCall = 4,
}

impl OperationType {
    /// Permission required whenever the operation carries a payload.
    pub const fn required_permission(self) -> Permission {
        match self {
            OperationType::Call => Permission::Call,
            OperationType::Create | OperationType::Create2 => Permission::Deploy,
            OperationType::StaticCall => Permission::StaticCall,
            OperationType::DelegateCall => Permission::DelegateCall,
        }
    }

    /// Permission that lifts the allow-list restrictions for this operation.
    ///
    /// Contract creation has no target, so it has none.
    pub const fn super_permission(self) -> Option<Permission> {
        match self {
            OperationType::Call => Some(Permission::SuperCall),
            OperationType::StaticCall => Some(Permission::SuperStaticCall),
            OperationType::DelegateCall => Some(Permission::SuperDelegateCall),
            OperationType::Create | OperationType::Create2 => None,
        }
    }

    /// Whether this operation deploys a contract.
    pub const fn is_contract_creation(self) -> bool {
        matches!(self, OperationType::Create | OperationType::Create2)
    }
}

impl TryFrom<U256> for OperationType {
    type Error = U256;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value > U256::from(4u8) {
            return Err(value);
        }
        let op = match value.as_limbs()[0] {
            0 => OperationType::Call,
            1 => OperationType::Create,
            2 => OperationType::Create2,
            3 => OperationType::StaticCall,
            _ => OperationType::DelegateCall,
        };
        Ok(op)
    }
}
