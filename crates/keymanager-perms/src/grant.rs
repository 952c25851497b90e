//! Grants as storage writes.
//!
//! A [`PermissionGrant`] describes what a controller may do. It is turned
//! into the `(key, value)` pairs an account owner would write, or into a
//! single `setData` request that a controller holding ADDPERMISSIONS or
//! CHANGEPERMISSIONS can submit through the key manager.

use serde::{Deserialize, Serialize};

use keymanager_core::{
    abi, keys, AccountRequest, Address, Bytes, DataKey, InterfaceId, Permission, PermissionSet,
    Selector, U256,
};

/// Permissions and restrictions for one controller.
///
/// Empty lists are not written, which leaves the stored list (and the
/// wildcard it reads as) untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// The controller receiving the grant.
    pub controller: Address,

    pub permissions: PermissionSet,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_addresses: Vec<Address>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_functions: Vec<Selector>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_standards: Vec<InterfaceId>,

    /// Allowed key prefixes, zero-padded on the right.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_keys: Vec<DataKey>,
}

impl PermissionGrant {
    /// Create a grant with no permissions and no restrictions.
    pub fn new(controller: Address) -> Self {
        Self {
            controller,
            permissions: PermissionSet::EMPTY,
            allowed_addresses: Vec::new(),
            allowed_functions: Vec::new(),
            allowed_standards: Vec::new(),
            allowed_keys: Vec::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        for permission in permissions {
            self.permissions.insert(permission);
        }
        self
    }

    pub fn allow_address(mut self, address: Address) -> Self {
        self.allowed_addresses.push(address);
        self
    }

    pub fn allow_function(mut self, selector: Selector) -> Self {
        self.allowed_functions.push(selector);
        self
    }

    pub fn allow_standard(mut self, interface_id: InterfaceId) -> Self {
        self.allowed_standards.push(interface_id);
        self
    }

    pub fn allow_key_prefix(mut self, prefix: DataKey) -> Self {
        self.allowed_keys.push(prefix);
        self
    }

    /// Storage writes for the permission word and every non-empty list.
    pub fn writes(&self) -> Vec<(DataKey, Bytes)> {
        let controller = &self.controller;
        let mut writes = vec![(
            keys::permissions_key(controller),
            Bytes::copy_from_slice(self.permissions.to_bytes32().as_slice()),
        )];

        if !self.allowed_addresses.is_empty() {
            writes.push((
                keys::allowed_addresses_key(controller),
                abi::encode_address_array(&self.allowed_addresses),
            ));
        }
        if !self.allowed_functions.is_empty() {
            writes.push((
                keys::allowed_functions_key(controller),
                abi::encode_bytes4_array(&self.allowed_functions),
            ));
        }
        if !self.allowed_standards.is_empty() {
            writes.push((
                keys::allowed_standards_key(controller),
                abi::encode_bytes4_array(&self.allowed_standards),
            ));
        }
        if !self.allowed_keys.is_empty() {
            writes.push((
                keys::allowed_keys_key(controller),
                abi::encode_bytes32_array(&self.allowed_keys),
            ));
        }
        writes
    }

    /// [`writes`](Self::writes) plus registration of the controller at
    /// `index` in `AddressPermissions[]`, growing the array to `index + 1`.
    pub fn registration_writes(&self, index: u128) -> Vec<(DataKey, Bytes)> {
        let mut writes = self.writes();
        writes.push((
            keys::permissions_array_element_key(index),
            Bytes::copy_from_slice(self.controller.as_slice()),
        ));
        let length = U256::from(index) + U256::from(1u8);
        writes.push((
            keys::permissions_array_key(),
            Bytes::copy_from_slice(&length.to_be_bytes::<32>()),
        ));
        writes
    }

    /// The grant as a single `setData` request.
    pub fn to_set_data(&self) -> AccountRequest {
        let (keys, values) = self.writes().into_iter().unzip();
        AccountRequest::SetData { keys, values }
    }
}
