//! Collaborator traits: the account and nonce state the key manager reads
//! and writes.
//!
//! The key manager never owns account state. It reads permission data
//! through [`DataStore`], probes targets through [`ContractView`], forwards
//! authorized calls through [`AccountCall`] and keeps relay counters in an
//! injected [`NonceStore`].

use std::sync::Arc;

use keymanager_core::{Address, Bytes, DataKey, InterfaceId, U256};

use crate::error::Result;

/// Result of forwarding a call to the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call returned normally with these bytes.
    Success(Bytes),
    /// The call reverted with this payload (possibly empty).
    Revert(Bytes),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }
}

/// Read access to the account's key-value storage.
pub trait DataStore: Send + Sync {
    /// Raw value stored under `key`. Zero-length when unset.
    fn get_data(&self, key: &DataKey) -> Result<Bytes>;
}

/// Relay nonce counters, one per `(signer, channel)`.
pub trait NonceStore: Send + Sync {
    /// Current counter. Zero for a channel never used.
    fn nonce(&self, address: &Address, channel: u128) -> Result<u128>;

    /// Overwrite the counter.
    fn set_nonce(&self, address: &Address, channel: u128, counter: u128) -> Result<()>;

    /// Replace the counter with `new` only while it still reads `expected`.
    ///
    /// Returns whether the swap happened. The read and the write are one
    /// step, so two requests can never both move the counter off `expected`.
    fn compare_and_set_nonce(
        &self,
        address: &Address,
        channel: u128,
        expected: u128,
        new: u128,
    ) -> Result<bool>;
}

/// Read-only view of deployed code.
pub trait ContractView: Send + Sync {
    /// Whether `address` has non-empty code.
    fn has_code(&self, address: &Address) -> Result<bool>;

    /// ERC-165 probe of `address` for `interface_id`.
    fn supports_interface(&self, address: &Address, interface_id: &InterfaceId) -> Result<bool>;
}

/// The account's call surface.
pub trait AccountCall: Send + Sync {
    /// Forward `payload` to the account with `value` attached.
    fn call(&self, payload: &[u8], value: U256) -> Result<CallOutcome>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Forwarding impls, so one store can back several roles
// ─────────────────────────────────────────────────────────────────────────────

impl<T: DataStore + ?Sized> DataStore for &T {
    fn get_data(&self, key: &DataKey) -> Result<Bytes> {
        (**self).get_data(key)
    }
}

impl<T: DataStore + ?Sized> DataStore for Arc<T> {
    fn get_data(&self, key: &DataKey) -> Result<Bytes> {
        (**self).get_data(key)
    }
}

impl<T: NonceStore + ?Sized> NonceStore for &T {
    fn nonce(&self, address: &Address, channel: u128) -> Result<u128> {
        (**self).nonce(address, channel)
    }

    fn set_nonce(&self, address: &Address, channel: u128, counter: u128) -> Result<()> {
        (**self).set_nonce(address, channel, counter)
    }

    fn compare_and_set_nonce(
        &self,
        address: &Address,
        channel: u128,
        expected: u128,
        new: u128,
    ) -> Result<bool> {
        (**self).compare_and_set_nonce(address, channel, expected, new)
    }
}

impl<T: NonceStore + ?Sized> NonceStore for Arc<T> {
    fn nonce(&self, address: &Address, channel: u128) -> Result<u128> {
        (**self).nonce(address, channel)
    }

    fn set_nonce(&self, address: &Address, channel: u128, counter: u128) -> Result<()> {
        (**self).set_nonce(address, channel, counter)
    }

    fn compare_and_set_nonce(
        &self,
        address: &Address,
        channel: u128,
        expected: u128,
        new: u128,
    ) -> Result<bool> {
        (**self).compare_and_set_nonce(address, channel, expected, new)
    }
}

impl<T: ContractView + ?Sized> ContractView for &T {
    fn has_code(&self, address: &Address) -> Result<bool> {
        (**self).has_code(address)
    }

    fn supports_interface(&self, address: &Address, interface_id: &InterfaceId) -> Result<bool> {
        (**self).supports_interface(address, interface_id)
    }
}

impl<T: ContractView + ?Sized> ContractView for Arc<T> {
    fn has_code(&self, address: &Address) -> Result<bool> {
        (**self).has_code(address)
    }

    fn supports_interface(&self, address: &Address, interface_id: &InterfaceId) -> Result<bool> {
        (**self).supports_interface(address, interface_id)
    }
}

impl<T: AccountCall + ?Sized> AccountCall for &T {
    fn call(&self, payload: &[u8], value: U256) -> Result<CallOutcome> {
        (**self).call(payload, value)
    }
}

impl<T: AccountCall + ?Sized> AccountCall for Arc<T> {
    fn call(&self, payload: &[u8], value: U256) -> Result<CallOutcome> {
        (**self).call(payload, value)
    }
}
