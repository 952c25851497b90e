//! The authorization decision for a single account request.
//!
//! ## Check order
//!
//! 1. The caller must hold some permission (`NoPermissionsSet`).
//! 2. The request is matched on its decoded action:
//!    - `setData`: keys in the permission namespace are checked one by one
//!      (ADD when nothing is stored yet, CHANGE otherwise). Remaining plain
//!      keys need SETDATA and must match the caller's allowed keys, unless
//!      the caller holds SUPER_SETDATA. No plain keys, no SETDATA check.
//!    - `execute`: the operation's permission (or its super-permission)
//!      when a payload is present, TRANSFERVALUE when value is attached,
//!      then the allow-lists unless a super-permission lifts them or the
//!      operation deploys a contract.
//!    - `transferOwnership`: CHANGEOWNER.
//!    - anything else fails with `InvalidSelector`.
//!
//! The first failing check aborts the whole request.

use keymanager_core::{
    abi, classify, key_matches_prefix, AccountRequest, Address, Bytes, DataKey, KeyKind,
    OperationType, Permission, PermissionSet, Selector, U256,
};
use keymanager_store::{ContractView, DataStore};

use crate::error::{AuthError, ListKind, Result};
use crate::registry::PermissionRegistry;

/// What a permitted request will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    SetData,
    Execute(OperationType),
    TransferOwnership,
}

/// How the allow-list restrictions applied to a permitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restrictions {
    /// Allow-lists were consulted and passed.
    Enforced,
    /// A super-permission lifted the allow-lists.
    Bypassed(Permission),
    /// The action has nothing to restrict.
    NotApplicable,
}

/// A permitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub controller: Address,
    pub permissions: PermissionSet,
    pub action: ActionKind,
    pub restrictions: Restrictions,
}

/// Decides whether a controller may perform an account request.
pub struct RequestAuthorizer<S> {
    registry: PermissionRegistry<S>,
}

impl<S: DataStore + ContractView> RequestAuthorizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            registry: PermissionRegistry::new(store),
        }
    }

    pub fn registry(&self) -> &PermissionRegistry<S> {
        &self.registry
    }

    /// Authorize `request` on behalf of `caller`.
    pub fn authorize(&self, caller: &Address, request: &AccountRequest) -> Result<Decision> {
        match self.decide(caller, request) {
            Ok(decision) => {
                tracing::debug!(
                    controller = %caller,
                    action = ?decision.action,
                    restrictions = ?decision.restrictions,
                    "request authorized"
                );
                Ok(decision)
            }
            Err(e) => {
                tracing::warn!(controller = %caller, error = %e, "request denied");
                Err(e)
            }
        }
    }

    fn decide(&self, caller: &Address, request: &AccountRequest) -> Result<Decision> {
        let permissions = self.registry.permissions_of(caller)?;
        if permissions.is_empty() {
            return Err(AuthError::NoPermissionsSet {
                controller: *caller,
            });
        }

        let (action, restrictions) = match request {
            AccountRequest::SetData { keys, values } => (
                ActionKind::SetData,
                self.verify_set_data(caller, permissions, keys, values)?,
            ),
            AccountRequest::Execute {
                operation,
                target,
                value,
                data,
            } => {
                let operation = OperationType::try_from(*operation)
                    .map_err(AuthError::InvalidOperationType)?;
                let restrictions =
                    self.verify_execute(caller, permissions, operation, target, *value, data)?;
                (ActionKind::Execute(operation), restrictions)
            }
            AccountRequest::TransferOwnership { .. } => {
                require(caller, permissions, Permission::ChangeOwner)?;
                (ActionKind::TransferOwnership, Restrictions::NotApplicable)
            }
            AccountRequest::Unknown { selector } => {
                return Err(AuthError::InvalidSelector(*selector));
            }
        };

        Ok(Decision {
            controller: *caller,
            permissions,
            action,
            restrictions,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // setData
    // ─────────────────────────────────────────────────────────────────────────

    fn verify_set_data(
        &self,
        caller: &Address,
        permissions: PermissionSet,
        keys: &[DataKey],
        values: &[Bytes],
    ) -> Result<Restrictions> {
        let mut plain_keys = Vec::new();

        for (key, value) in keys.iter().zip(values) {
            match classify(key) {
                KeyKind::Plain => plain_keys.push(*key),
                kind => self.verify_permission_write(caller, permissions, key, kind, value)?,
            }
        }

        if plain_keys.is_empty() {
            return Ok(Restrictions::NotApplicable);
        }
        if permissions.contains(Permission::SuperSetData) {
            return Ok(Restrictions::Bypassed(Permission::SuperSetData));
        }
        require(caller, permissions, Permission::SetData)?;

        let allowed = self.registry.allowed_keys_of(caller)?;
        for key in &plain_keys {
            if !allowed.permits(|prefix| key_matches_prefix(key, prefix)) {
                return Err(AuthError::NotAllowedKey {
                    controller: *caller,
                    key: *key,
                });
            }
        }
        Ok(Restrictions::Enforced)
    }

    fn verify_permission_write(
        &self,
        caller: &Address,
        permissions: PermissionSet,
        key: &DataKey,
        kind: KeyKind,
        value: &[u8],
    ) -> Result<()> {
        let store = self.registry.store();
        let needed = match kind {
            KeyKind::Permissions(_) => {
                let stored = store.get_data(key)?;
                add_or_change(abi::stored_word(&stored).is_zero())
            }
            KeyKind::PermissionsArrayLength => {
                let stored = abi::stored_word(&store.get_data(key)?);
                let new_length = abi::stored_word(value);
                add_or_change(new_length > stored)
            }
            KeyKind::PermissionsArrayElement(_) => Permission::ChangePermissions,
            KeyKind::AllowedAddresses(_) => {
                validate_list(key, value, ListKind::Addresses)?;
                add_or_change(store.get_data(key)?.is_empty())
            }
            KeyKind::AllowedFunctions(_) | KeyKind::AllowedStandards(_) => {
                validate_list(key, value, ListKind::Bytes4)?;
                add_or_change(store.get_data(key)?.is_empty())
            }
            KeyKind::AllowedKeys(_) => {
                validate_list(key, value, ListKind::Bytes32)?;
                add_or_change(store.get_data(key)?.is_empty())
            }
            KeyKind::PermissionNamespace => add_or_change(store.get_data(key)?.is_empty()),
            KeyKind::Plain => return Ok(()),
        };
        require(caller, permissions, needed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // execute
    // ─────────────────────────────────────────────────────────────────────────

    fn verify_execute(
        &self,
        caller: &Address,
        permissions: PermissionSet,
        operation: OperationType,
        target: &Address,
        value: U256,
        data: &[u8],
    ) -> Result<Restrictions> {
        let has_payload = !data.is_empty();
        let super_permission = operation
            .super_permission()
            .filter(|p| permissions.contains(*p));

        // A held super-permission covers the operation's own permission.
        if has_payload && super_permission.is_none() {
            require(caller, permissions, operation.required_permission())?;
        }
        if !value.is_zero() && !permissions.contains(Permission::SuperTransferValue) {
            require(caller, permissions, Permission::TransferValue)?;
        }

        if operation.is_contract_creation() {
            return Ok(Restrictions::NotApplicable);
        }
        if has_payload {
            if let Some(super_permission) = super_permission {
                return Ok(Restrictions::Bypassed(super_permission));
            }
        } else if permissions.contains(Permission::SuperTransferValue) {
            return Ok(Restrictions::Bypassed(Permission::SuperTransferValue));
        }

        self.verify_allowed_call(caller, target, data)?;
        Ok(Restrictions::Enforced)
    }

    fn verify_allowed_call(&self, caller: &Address, target: &Address, data: &[u8]) -> Result<()> {
        if !self.registry.allowed_addresses_of(caller)?.contains(target) {
            return Err(AuthError::NotAllowedAddress {
                controller: *caller,
                target: *target,
            });
        }

        let store = self.registry.store();
        if !store.has_code(target)? {
            return Ok(());
        }

        let standards = self.registry.allowed_standards_of(caller)?;
        if !standards.is_any() {
            let mut supported = false;
            for interface_id in standards.entries() {
                if store.supports_interface(target, interface_id)? {
                    supported = true;
                    break;
                }
            }
            if !supported {
                return Err(AuthError::NotAllowedStandard {
                    controller: *caller,
                    target: *target,
                });
            }
        }

        if data.len() >= 4 {
            let selector = Selector::from_slice(&data[..4]);
            if !self.registry.allowed_functions_of(caller)?.contains(&selector) {
                return Err(AuthError::NotAllowedFunction {
                    controller: *caller,
                    selector,
                });
            }
        }
        Ok(())
    }
}

fn require(caller: &Address, permissions: PermissionSet, permission: Permission) -> Result<()> {
    if permissions.contains(permission) {
        Ok(())
    } else {
        Err(AuthError::NotAuthorised {
            controller: *caller,
            permission,
        })
    }
}

fn add_or_change(is_new: bool) -> Permission {
    if is_new {
        Permission::AddPermissions
    } else {
        Permission::ChangePermissions
    }
}

/// An empty value deletes the list and is always well formed.
fn validate_list(key: &DataKey, value: &[u8], kind: ListKind) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let valid = match kind {
        ListKind::Addresses => abi::is_encoded_address_array(value),
        ListKind::Bytes4 => abi::is_encoded_bytes4_array(value),
        ListKind::Bytes32 => abi::is_encoded_bytes32_array(value),
    };
    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidEncodedList { key: *key, kind })
    }
}
