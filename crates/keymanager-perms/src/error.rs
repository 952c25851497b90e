//! Error types for the permissions module.
//!
//! Every denial names the controller and what it was missing, so callers
//! can branch on the failure kind instead of parsing messages.

use std::fmt;

use thiserror::Error;

use keymanager_core::{Address, DataKey, Permission, Selector, U256};

/// Expected element type of an allow-list value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Addresses,
    Bytes4,
    Bytes32,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListKind::Addresses => "address[]",
            ListKind::Bytes4 => "bytes4[]",
            ListKind::Bytes32 => "bytes32[]",
        })
    }
}

/// Errors raised while authorizing a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The caller holds no permission at all.
    #[error("no permissions set for {controller}")]
    NoPermissionsSet { controller: Address },

    /// The caller lacks a specific permission.
    #[error("{controller} is not authorised for {permission}")]
    NotAuthorised {
        controller: Address,
        permission: Permission,
    },

    #[error("{controller} is not allowed to call {target}")]
    NotAllowedAddress { controller: Address, target: Address },

    #[error("{controller} is not allowed to call function {selector}")]
    NotAllowedFunction {
        controller: Address,
        selector: Selector,
    },

    /// The target implements none of the caller's allowed standards.
    #[error("{controller} is not allowed to interact with {target}: no allowed standard")]
    NotAllowedStandard { controller: Address, target: Address },

    #[error("{controller} is not allowed to set key {key}")]
    NotAllowedKey { controller: Address, key: DataKey },

    #[error("invalid operation type {0}")]
    InvalidOperationType(U256),

    /// The account payload has a selector the key manager does not route.
    #[error("invalid selector {0}")]
    InvalidSelector(Selector),

    /// A permission write whose value is not a canonical encoded list.
    #[error("value for {key} is not a valid {kind}")]
    InvalidEncodedList { key: DataKey, kind: ListKind },

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] keymanager_store::StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] keymanager_core::CoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, AuthError>;
