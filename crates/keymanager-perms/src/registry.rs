//! Read-only view of permission state stored on the account.
//!
//! Stored lists are decoded leniently: whatever fails to decode reads as
//! [`AllowList::Any`], so a corrupted list widens a controller's reach
//! rather than locking it out. Writes go through the strict validation in
//! the authorizer instead.

use keymanager_core::{
    abi, keys, Address, DataKey, InterfaceId, PermissionSet, Selector, U256,
};
use keymanager_store::DataStore;

use crate::allowlist::AllowList;
use crate::error::Result;

/// Upper bound on controllers returned by [`PermissionRegistry::controllers`].
pub const MAX_ENUMERATED_CONTROLLERS: u128 = 4096;

/// Permission reads over an account's storage.
pub struct PermissionRegistry<S> {
    store: S,
}

impl<S: DataStore> PermissionRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Permission bits granted to `controller`.
    pub fn permissions_of(&self, controller: &Address) -> Result<PermissionSet> {
        let value = self.store.get_data(&keys::permissions_key(controller))?;
        Ok(PermissionSet::from_stored_value(&value))
    }

    pub fn allowed_addresses_of(&self, controller: &Address) -> Result<AllowList<Address>> {
        let value = self.store.get_data(&keys::allowed_addresses_key(controller))?;
        Ok(AllowList::from_decoded(abi::decode_address_array(&value)))
    }

    pub fn allowed_standards_of(&self, controller: &Address) -> Result<AllowList<InterfaceId>> {
        let value = self.store.get_data(&keys::allowed_standards_key(controller))?;
        Ok(AllowList::from_decoded(abi::decode_bytes4_array(&value)))
    }

    pub fn allowed_functions_of(&self, controller: &Address) -> Result<AllowList<Selector>> {
        let value = self.store.get_data(&keys::allowed_functions_key(controller))?;
        Ok(AllowList::from_decoded(abi::decode_bytes4_array(&value)))
    }

    /// Allowed storage-key prefixes of `controller`.
    pub fn allowed_keys_of(&self, controller: &Address) -> Result<AllowList<DataKey>> {
        let value = self.store.get_data(&keys::allowed_keys_key(controller))?;
        Ok(AllowList::from_decoded(abi::decode_bytes32_array(&value)))
    }

    /// Length of the `AddressPermissions[]` array.
    pub fn controller_count(&self) -> Result<U256> {
        let value = self.store.get_data(&keys::permissions_array_key())?;
        Ok(abi::stored_word(&value))
    }

    /// Addresses registered in `AddressPermissions[]`, in index order.
    ///
    /// Elements that do not hold exactly 20 bytes are skipped. Enumeration
    /// stops after [`MAX_ENUMERATED_CONTROLLERS`] indices.
    pub fn controllers(&self) -> Result<Vec<Address>> {
        let count = self.controller_count()?;
        let limit = if count > U256::from(MAX_ENUMERATED_CONTROLLERS) {
            tracing::warn!(
                %count,
                limit = MAX_ENUMERATED_CONTROLLERS,
                "controller array longer than enumeration limit"
            );
            MAX_ENUMERATED_CONTROLLERS
        } else {
            count.saturating_to::<u128>()
        };

        let mut controllers = Vec::new();
        for index in 0..limit {
            let value = self
                .store
                .get_data(&keys::permissions_array_element_key(index))?;
            if value.len() == 20 {
                controllers.push(Address::from_slice(&value));
            }
        }
        Ok(controllers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymanager_core::{Bytes, FixedBytes, Permission};
    use keymanager_store::MemoryStore;

    fn controller() -> Address {
        Address::repeat_byte(0xc1)
    }

    #[test]
    fn test_unset_controller() {
        let registry = PermissionRegistry::new(MemoryStore::new());
        assert!(registry.permissions_of(&controller()).unwrap().is_empty());
        assert!(registry.allowed_addresses_of(&controller()).unwrap().is_any());
        assert!(registry.allowed_keys_of(&controller()).unwrap().is_any());
    }

    #[test]
    fn test_reads_permissions_and_lists() {
        let store = MemoryStore::new();
        let c = controller();
        let set = Permission::Call | Permission::TransferValue;
        store
            .put_data(keys::permissions_key(&c), set.to_bytes32().to_vec())
            .unwrap();
        let target = Address::repeat_byte(0x70);
        store
            .put_data(keys::allowed_addresses_key(&c), abi::encode_address_array(&[target]))
            .unwrap();
        let selector = FixedBytes::<4>::from([0xa9, 0x05, 0x9c, 0xbb]);
        store
            .put_data(keys::allowed_functions_key(&c), abi::encode_bytes4_array(&[selector]))
            .unwrap();

        let registry = PermissionRegistry::new(&store);
        assert_eq!(registry.permissions_of(&c).unwrap(), set);
        assert_eq!(
            registry.allowed_addresses_of(&c).unwrap(),
            AllowList::Only(vec![target])
        );
        assert_eq!(
            registry.allowed_functions_of(&c).unwrap(),
            AllowList::Only(vec![selector])
        );
        assert!(registry.allowed_standards_of(&c).unwrap().is_any());
    }

    #[test]
    fn test_malformed_list_reads_as_wildcard() {
        let store = MemoryStore::new();
        let c = controller();
        store
            .put_data(keys::allowed_addresses_key(&c), vec![0xde, 0xad, 0xbe, 0xef])
            .unwrap();
        let registry = PermissionRegistry::new(&store);
        assert!(registry.allowed_addresses_of(&c).unwrap().is_any());
    }

    #[test]
    fn test_enumerates_controllers() {
        let store = MemoryStore::new();
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        store
            .put_data(keys::permissions_array_element_key(0), a.to_vec())
            .unwrap();
        // Malformed element is skipped.
        store
            .put_data(keys::permissions_array_element_key(1), vec![0u8; 19])
            .unwrap();
        store
            .put_data(keys::permissions_array_element_key(2), b.to_vec())
            .unwrap();
        store
            .put_data(
                keys::permissions_array_key(),
                Bytes::from(U256::from(3u8).to_be_bytes::<32>().to_vec()),
            )
            .unwrap();

        let registry = PermissionRegistry::new(&store);
        assert_eq!(registry.controller_count().unwrap(), U256::from(3u8));
        assert_eq!(registry.controllers().unwrap(), vec![a, b]);
    }
}
