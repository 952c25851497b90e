//! # Key Manager
//!
//! A permission controller for smart accounts.
//!
//! ## Overview
//!
//! The account holds key-value storage and can execute arbitrary calls.
//! The key manager sits in front of it: every state change and outbound
//! call goes through [`KeyManager`], which checks the caller's permissions
//! stored on the account before forwarding the payload.
//!
//! Requests arrive two ways:
//!
//! - **Direct**: [`KeyManager::execute`] with the caller's address
//! - **Relayed**: [`KeyManager::execute_relay_call`] with a signature and a
//!   per-channel nonce. The recovered signer acts as the caller
//!
//! [`KeyManager::is_valid_signature`] lets the account accept signatures
//! from controllers holding SIGN.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keymanager::{KeyManager, KeyManagerConfig};
//! use keymanager::core::{AccountRequest, Address, Permission, U256};
//! use keymanager::perms::PermissionGrant;
//! use keymanager::store::{MemoryStore, SqliteStore};
//!
//! let account = MemoryStore::new();
//! let nonces = SqliteStore::open("nonces.db").unwrap();
//! let owner = Address::repeat_byte(1);
//! for (key, value) in PermissionGrant::new(owner)
//!     .with_permission(Permission::ChangeOwner)
//!     .writes()
//! {
//!     account.put_data(key, value).unwrap();
//! }
//!
//! let km = KeyManager::with_config(
//!     Address::repeat_byte(0x4b),
//!     account,
//!     nonces,
//!     KeyManagerConfig::default(),
//! );
//! let payload = AccountRequest::TransferOwnership {
//!     new_owner: Address::repeat_byte(2),
//! }
//! .encode();
//! km.execute(&owner, &payload, U256::ZERO).unwrap();
//! ```
//!
//! ## Re-exports
//!
//! - `keymanager::core` - Keys, permissions, ABI codecs and signatures
//! - `keymanager::store` - Collaborator traits, memory and SQLite stores
//! - `keymanager::perms` - Permission reads and request authorization

pub mod config;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod relay;
pub mod revert;

pub use keymanager_core as core;
pub use keymanager_perms as perms;
pub use keymanager_store as store;

pub use config::{KeyManagerConfig, RelayNoncePolicy};
pub use dispatch::{Dispatched, ExecutedRecord, ExecutionDispatcher};
pub use error::{KeyManagerError, NonceRejection, Result};
pub use manager::{KeyManager, ERC1271_FAIL_VALUE, ERC1271_MAGIC_VALUE};
pub use relay::{RelayAuthentication, RelayAuthenticator};

pub use keymanager_perms::{ActionKind, AuthError, Decision, Restrictions};
