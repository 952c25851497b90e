//! # Key Manager Store
//!
//! The state the key manager reads and writes but does not own: the
//! account's key-value storage, relay nonce counters, deployed code and the
//! account's call surface.
//!
//! ## Key Types
//!
//! - [`DataStore`] / [`NonceStore`] / [`ContractView`] / [`AccountCall`] - Collaborator roles
//! - [`CallOutcome`] - Success or revert payload of a forwarded call
//! - [`MemoryStore`] - An in-memory account playing every role, for tests
//! - [`SqliteStore`] - Persistent account data and relay nonces
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keymanager_store::{DataStore, NonceStore, SqliteStore};
//! use keymanager_core::{Address, DataKey};
//!
//! let store = SqliteStore::open("keymanager.db").unwrap();
//! store.put_data(&DataKey::ZERO, b"hello").unwrap();
//! assert_eq!(store.nonce(&Address::ZERO, 0).unwrap(), 0);
//! ```
//!
//! ## Design Notes
//!
//! - **Empty means unset**: writing an empty value deletes the key, and
//!   reading an unset key yields an empty value.
//! - **Counters start at zero**: a `(signer, channel)` pair never written
//!   reads as zero.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, RecordedCall};
pub use sqlite::SqliteStore;
pub use traits::{AccountCall, CallOutcome, ContractView, DataStore, NonceStore};
