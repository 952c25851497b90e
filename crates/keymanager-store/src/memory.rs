//! In-memory account for tests.
//!
//! Plays every collaborator role at once: key-value storage, nonce
//! counters, deployed contracts and the account's call surface. Calls are
//! applied the way an ERC725 account would apply them, so permission
//! writes made through the key manager are visible to the next request.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use keymanager_core::{
    encode_bytes_result, encode_revert_reason, AccountRequest, Address, Bytes, DataKey,
    InterfaceId, U256,
};

use crate::error::{Result, StoreError};
use crate::traits::{AccountCall, CallOutcome, ContractView, DataStore, NonceStore};

/// A call the account accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub payload: Bytes,
    pub value: U256,
}

/// In-memory account implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Account key-value storage.
    data: HashMap<DataKey, Bytes>,

    /// Relay counters by (signer, channel).
    nonces: HashMap<(Address, u128), u128>,

    /// Deployed contracts and the interfaces they report.
    contracts: HashMap<Address, HashSet<InterfaceId>>,

    owner: Address,

    /// Accepted calls, oldest first.
    calls: Vec<RecordedCall>,

    /// Outcomes returned instead of executing, oldest first.
    scripted: VecDeque<CallOutcome>,
}

impl MemoryStore {
    /// Create a new empty account.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Create an account owned by `owner`.
    pub fn with_owner(owner: Address) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.write() {
            inner.owner = owner;
        }
        store
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Write a raw value. An empty value deletes the key.
    pub fn put_data(&self, key: DataKey, value: impl Into<Bytes>) -> Result<()> {
        let value = value.into();
        let mut inner = self.write()?;
        if value.is_empty() {
            inner.data.remove(&key);
        } else {
            inner.data.insert(key, value);
        }
        Ok(())
    }

    /// Register a contract at `address` reporting `interfaces` over ERC-165.
    pub fn deploy_contract(
        &self,
        address: Address,
        interfaces: impl IntoIterator<Item = InterfaceId>,
    ) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .contracts
            .entry(address)
            .or_default()
            .extend(interfaces);
        Ok(())
    }

    /// Return `outcome` from the next call instead of executing it.
    pub fn queue_outcome(&self, outcome: CallOutcome) -> Result<()> {
        self.write()?.scripted.push_back(outcome);
        Ok(())
    }

    pub fn owner(&self) -> Result<Address> {
        Ok(self.read()?.owner)
    }

    /// Calls accepted so far.
    pub fn calls(&self) -> Result<Vec<RecordedCall>> {
        Ok(self.read()?.calls.clone())
    }

    /// Number of non-empty storage entries.
    pub fn data_len(&self) -> Result<usize> {
        Ok(self.read()?.data.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for MemoryStore {
    fn get_data(&self, key: &DataKey) -> Result<Bytes> {
        Ok(self.read()?.data.get(key).cloned().unwrap_or_default())
    }
}

impl NonceStore for MemoryStore {
    fn nonce(&self, address: &Address, channel: u128) -> Result<u128> {
        Ok(self
            .read()?
            .nonces
            .get(&(*address, channel))
            .copied()
            .unwrap_or(0))
    }

    fn set_nonce(&self, address: &Address, channel: u128, counter: u128) -> Result<()> {
        self.write()?.nonces.insert((*address, channel), counter);
        Ok(())
    }

    fn compare_and_set_nonce(
        &self,
        address: &Address,
        channel: u128,
        expected: u128,
        new: u128,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        let counter = inner.nonces.entry((*address, channel)).or_insert(0);
        if *counter != expected {
            return Ok(false);
        }
        *counter = new;
        Ok(true)
    }
}

impl ContractView for MemoryStore {
    fn has_code(&self, address: &Address) -> Result<bool> {
        Ok(self.read()?.contracts.contains_key(address))
    }

    fn supports_interface(&self, address: &Address, interface_id: &InterfaceId) -> Result<bool> {
        Ok(self
            .read()?
            .contracts
            .get(address)
            .is_some_and(|ids| ids.contains(interface_id)))
    }
}

impl AccountCall for MemoryStore {
    fn call(&self, payload: &[u8], value: U256) -> Result<CallOutcome> {
        let mut inner = self.write()?;
        let record = RecordedCall {
            payload: Bytes::copy_from_slice(payload),
            value,
        };

        if let Some(outcome) = inner.scripted.pop_front() {
            if outcome.is_success() {
                inner.calls.push(record);
            }
            return Ok(outcome);
        }

        let request = match AccountRequest::decode(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "account rejected undecodable payload");
                return Ok(CallOutcome::Revert(Bytes::new()));
            }
        };

        let output = match request {
            AccountRequest::SetData { keys, values } => {
                for (key, value) in keys.into_iter().zip(values) {
                    if value.is_empty() {
                        inner.data.remove(&key);
                    } else {
                        inner.data.insert(key, value);
                    }
                }
                Bytes::new()
            }
            AccountRequest::TransferOwnership { new_owner } => {
                inner.owner = new_owner;
                Bytes::new()
            }
            AccountRequest::Execute { .. } => encode_bytes_result(&[]),
            AccountRequest::Unknown { .. } => {
                return Ok(CallOutcome::Revert(encode_revert_reason(
                    "function selector not recognized",
                )));
            }
        };

        inner.calls.push(record);
        Ok(CallOutcome::Success(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymanager_core::{decode_revert_reason, FixedBytes};

    #[test]
    fn test_unset_key_is_empty() {
        let store = MemoryStore::new();
        assert!(store.get_data(&DataKey::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_put_empty_deletes() {
        let store = MemoryStore::new();
        let key = DataKey::from_bytes([1; 32]);
        store.put_data(key, vec![0xab]).unwrap();
        assert_eq!(store.get_data(&key).unwrap(), Bytes::from_static(&[0xab]));
        store.put_data(key, Bytes::new()).unwrap();
        assert_eq!(store.data_len().unwrap(), 0);
    }

    #[test]
    fn test_nonces_are_per_channel() {
        let store = MemoryStore::new();
        let a = Address::repeat_byte(1);
        store.set_nonce(&a, 0, 5).unwrap();
        assert_eq!(store.nonce(&a, 0).unwrap(), 5);
        assert_eq!(store.nonce(&a, 1).unwrap(), 0);
        assert_eq!(store.nonce(&Address::repeat_byte(2), 0).unwrap(), 0);
    }

    #[test]
    fn test_compare_and_set_nonce() {
        let store = MemoryStore::new();
        let a = Address::repeat_byte(1);
        assert!(store.compare_and_set_nonce(&a, 0, 0, 1).unwrap());
        assert!(!store.compare_and_set_nonce(&a, 0, 0, 1).unwrap());
        assert_eq!(store.nonce(&a, 0).unwrap(), 1);

        assert!(!store.compare_and_set_nonce(&a, 7, 3, 4).unwrap());
        assert_eq!(store.nonce(&a, 7).unwrap(), 0);
    }

    #[test]
    fn test_contracts_and_interfaces() {
        let store = MemoryStore::new();
        let token = Address::repeat_byte(9);
        let id = FixedBytes::<4>::from([0x36, 0x37, 0x2b, 0x07]);
        store.deploy_contract(token, [id]).unwrap();
        assert!(store.has_code(&token).unwrap());
        assert!(store.supports_interface(&token, &id).unwrap());
        assert!(!store.supports_interface(&token, &FixedBytes::ZERO).unwrap());
        assert!(!store.has_code(&Address::repeat_byte(8)).unwrap());
    }

    #[test]
    fn test_call_applies_set_data_and_ownership() {
        let store = MemoryStore::new();
        let key = DataKey::from_bytes([2; 32]);
        let payload = AccountRequest::SetData {
            keys: vec![key],
            values: vec![Bytes::from_static(b"value")],
        }
        .encode();
        assert!(store.call(&payload, U256::ZERO).unwrap().is_success());
        assert_eq!(store.get_data(&key).unwrap(), Bytes::from_static(b"value"));

        let new_owner = Address::repeat_byte(3);
        let payload = AccountRequest::TransferOwnership { new_owner }.encode();
        store.call(&payload, U256::ZERO).unwrap();
        assert_eq!(store.owner().unwrap(), new_owner);
        assert_eq!(store.calls().unwrap().len(), 2);
    }

    #[test]
    fn test_scripted_revert_skips_execution() {
        let store = MemoryStore::new();
        store
            .queue_outcome(CallOutcome::Revert(encode_revert_reason("nope")))
            .unwrap();
        let key = DataKey::from_bytes([4; 32]);
        let payload = AccountRequest::SetData {
            keys: vec![key],
            values: vec![Bytes::from_static(b"v")],
        }
        .encode();

        let outcome = store.call(&payload, U256::ZERO).unwrap();
        match outcome {
            CallOutcome::Revert(data) => {
                assert_eq!(decode_revert_reason(&data).as_deref(), Some("nope"))
            }
            other => panic!("expected revert, got {other:?}"),
        }
        assert!(store.get_data(&key).unwrap().is_empty());
        assert!(store.calls().unwrap().is_empty());

        // The script is consumed; the next call executes.
        assert!(store.call(&payload, U256::ZERO).unwrap().is_success());
    }

    #[test]
    fn test_unknown_selector_reverts() {
        let store = MemoryStore::new();
        let outcome = store.call(&[0xde, 0xad, 0xbe, 0xef], U256::ZERO).unwrap();
        assert!(!outcome.is_success());
    }
}
