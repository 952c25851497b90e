//! Named permission flags and the 256-bit set that stores them.
//!
//! Each controller's permissions live in a single 32-byte storage value.
//! The bit values below are fixed: changing one would silently re-grant
//! stored permissions under a different name.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single named capability a controller can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "CHANGEOWNER")]
    ChangeOwner,
    #[serde(rename = "CHANGEPERMISSIONS")]
    ChangePermissions,
    #[serde(rename = "ADDPERMISSIONS")]
    AddPermissions,
    #[serde(rename = "SETDATA")]
    SetData,
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "STATICCALL")]
    StaticCall,
    #[serde(rename = "DELEGATECALL")]
    DelegateCall,
    #[serde(rename = "DEPLOY")]
    Deploy,
    #[serde(rename = "TRANSFERVALUE")]
    TransferValue,
    #[serde(rename = "SIGN")]
    Sign,
    #[serde(rename = "SUPER_SETDATA")]
    SuperSetData,
    #[serde(rename = "SUPER_TRANSFERVALUE")]
    SuperTransferValue,
    #[serde(rename = "SUPER_CALL")]
    SuperCall,
    #[serde(rename = "SUPER_STATICCALL")]
    SuperStaticCall,
    #[serde(rename = "SUPER_DELEGATECALL")]
    SuperDelegateCall,
}

impl Permission {
    /// Every permission, in bit order.
    pub const ALL: [Permission; 15] = [
        Permission::ChangeOwner,
        Permission::ChangePermissions,
        Permission::AddPermissions,
        Permission::SetData,
        Permission::Call,
        Permission::StaticCall,
        Permission::DelegateCall,
        Permission::Deploy,
        Permission::TransferValue,
        Permission::Sign,
        Permission::SuperSetData,
        Permission::SuperTransferValue,
        Permission::SuperCall,
        Permission::SuperStaticCall,
        Permission::SuperDelegateCall,
    ];

    /// The stored bit for this permission.
    pub const fn bit_value(self) -> u64 {
        match self {
            Permission::ChangeOwner => 0x1,
            Permission::ChangePermissions => 0x2,
            Permission::AddPermissions => 0x4,
            Permission::SetData => 0x8,
            Permission::Call => 0x10,
            Permission::StaticCall => 0x20,
            Permission::DelegateCall => 0x40,
            Permission::Deploy => 0x80,
            Permission::TransferValue => 0x100,
            Permission::Sign => 0x200,
            Permission::SuperSetData => 0x400,
            Permission::SuperTransferValue => 0x800,
            Permission::SuperCall => 0x1000,
            Permission::SuperStaticCall => 0x2000,
            Permission::SuperDelegateCall => 0x4000,
        }
    }

    /// The bit as a 256-bit word.
    pub fn bit(self) -> U256 {
        U256::from(self.bit_value())
    }

    /// The stable name used in errors and serialized configs.
    pub const fn name(self) -> &'static str {
        match self {
            Permission::ChangeOwner => "CHANGEOWNER",
            Permission::ChangePermissions => "CHANGEPERMISSIONS",
            Permission::AddPermissions => "ADDPERMISSIONS",
            Permission::SetData => "SETDATA",
            Permission::Call => "CALL",
            Permission::StaticCall => "STATICCALL",
            Permission::DelegateCall => "DELEGATECALL",
            Permission::Deploy => "DEPLOY",
            Permission::TransferValue => "TRANSFERVALUE",
            Permission::Sign => "SIGN",
            Permission::SuperSetData => "SUPER_SETDATA",
            Permission::SuperTransferValue => "SUPER_TRANSFERVALUE",
            Permission::SuperCall => "SUPER_CALL",
            Permission::SuperStaticCall => "SUPER_STATICCALL",
            Permission::SuperDelegateCall => "SUPER_DELEGATECALL",
        }
    }

    /// Parse a permission from its stable name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of permissions as stored on the account.
///
/// Unknown bits are preserved: a stored value may carry bits this crate
/// has no name for, and they round-trip untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(U256);

impl PermissionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(U256::ZERO);

    pub const fn from_bits(bits: U256) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> U256 {
        self.0
    }

    /// Decode a raw storage value.
    ///
    /// The value is read as a `bytes32`: left-aligned, zero-padded on the
    /// right when shorter than 32 bytes, and truncated past 32 bytes.
    pub fn from_stored_value(value: &[u8]) -> Self {
        let mut word = [0u8; 32];
        let len = value.len().min(32);
        word[..len].copy_from_slice(&value[..len]);
        Self(U256::from_be_bytes(word))
    }

    /// The 32-byte storage encoding of this set.
    pub fn to_bytes32(&self) -> B256 {
        B256::from(self.0.to_be_bytes::<32>())
    }

    /// Whether every bit of `permission` is set.
    pub fn contains(&self, permission: Permission) -> bool {
        let bit = permission.bit();
        self.0 & bit == bit
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission.bit();
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, permission: Permission) -> Self {
        self.insert(permission);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_zero()
    }

    /// Named permissions present in the set, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Names of the permissions present in the set.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Permission::name).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = PermissionSet::EMPTY;
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

impl From<Permission> for PermissionSet {
    fn from(permission: Permission) -> Self {
        Self(permission.bit())
    }
}

impl std::ops::BitOr for Permission {
    type Output = PermissionSet;

    fn bitor(self, rhs: Permission) -> PermissionSet {
        PermissionSet::from(self).with(rhs)
    }
}

impl std::ops::BitOr<Permission> for PermissionSet {
    type Output = PermissionSet;

    fn bitor(self, rhs: Permission) -> PermissionSet {
        self.with(rhs)
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        f.write_str(&self.names().join("|"))
    }
}
