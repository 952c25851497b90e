//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use keymanager::{Dispatched, KeyManager, KeyManagerConfig, Result};
use keymanager_core::{Address, DataKey, InterfaceId, Permission, Selector, Signer};
use keymanager_perms::{PermissionGrant, PermissionRegistry};
use keymanager_store::MemoryStore;

/// Identity of the key manager every fixture builds.
pub const FIXTURE_IDENTITY: Address = Address::repeat_byte(0x4b);

/// A memory account behind a key manager. The account also stores nonces.
pub struct TestFixture {
    pub account: Arc<MemoryStore>,
    pub manager: KeyManager<Arc<MemoryStore>, Arc<MemoryStore>>,
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(KeyManagerConfig::default())
    }

    pub fn with_config(config: KeyManagerConfig) -> Self {
        let account = Arc::new(MemoryStore::new());
        let manager =
            KeyManager::with_config(FIXTURE_IDENTITY, account.clone(), account.clone(), config);
        Self { account, manager }
    }

    /// Write a grant straight into storage, as the account owner would.
    pub fn grant(&self, grant: &PermissionGrant) -> Result<()> {
        for (key, value) in grant.writes() {
            self.account.put_data(key, value)?;
        }
        Ok(())
    }

    /// Write a grant and append the controller to `AddressPermissions[]`.
    pub fn register(&self, grant: &PermissionGrant) -> Result<()> {
        let registry = PermissionRegistry::new(self.account.as_ref());
        let index = registry.controller_count()?.saturating_to::<u128>();
        for (key, value) in grant.registration_writes(index) {
            self.account.put_data(key, value)?;
        }
        Ok(())
    }

    /// A deterministic signer holding `permissions` and nothing else.
    pub fn controller(
        &self,
        seed: u8,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Signer> {
        let signer = Signer::from_seed(&[seed; 32])?;
        self.grant(&PermissionGrant::new(signer.address()).with_permissions(permissions))?;
        Ok(signer)
    }

    /// Sign `payload` with the signer's current nonce on `channel` and relay it.
    pub fn relay(&self, signer: &Signer, channel: u128, payload: &[u8]) -> Result<Dispatched> {
        let nonce = self.manager.get_nonce(&signer.address(), channel)?;
        let signature = signer.sign_relay_call(&FIXTURE_IDENTITY, nonce, payload)?;
        self.manager.execute_relay_call(
            &FIXTURE_IDENTITY,
            nonce,
            payload,
            &signature,
            Default::default(),
        )
    }

    /// Register every controller described by a JSON array of [`ControllerSpec`].
    pub fn load_controllers(&self, json: &str) -> Result<Vec<Address>> {
        let entries: Vec<ControllerSpec> = serde_json::from_str(json)?;
        let mut addresses = Vec::with_capacity(entries.len());
        for entry in &entries {
            self.register(&entry.to_grant())?;
            addresses.push(entry.address);
        }
        Ok(addresses)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A controller described by permission names, for JSON test setups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSpec {
    pub address: Address,
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub allowed_addresses: Vec<Address>,
    #[serde(default)]
    pub allowed_functions: Vec<Selector>,
    #[serde(default)]
    pub allowed_standards: Vec<InterfaceId>,
    #[serde(default)]
    pub allowed_keys: Vec<DataKey>,
}

impl ControllerSpec {
    pub fn to_grant(&self) -> PermissionGrant {
        let mut grant = PermissionGrant::new(self.address)
            .with_permissions(self.permissions.iter().copied());
        grant.allowed_addresses = self.allowed_addresses.clone();
        grant.allowed_functions = self.allowed_functions.clone();
        grant.allowed_standards = self.allowed_standards.clone();
        grant.allowed_keys = self.allowed_keys.clone();
        grant
    }
}

/// Create signers with distinct deterministic keys.
pub fn signers(count: u8) -> Vec<Signer> {
    (1..=count)
        .filter_map(|i| Signer::from_seed(&[i; 32]).ok())
        .collect()
}
