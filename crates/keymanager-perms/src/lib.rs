//! # Key Manager Permissions
//!
//! Permission reads and request authorization.
//!
//! ## Overview
//!
//! A controller's rights live in the account's own storage: a permission
//! word plus optional allow-lists of addresses, functions, standards and
//! key prefixes. This crate reads that state and decides whether a decoded
//! account request may run on a controller's behalf.
//!
//! ## Key Concepts
//!
//! - **PermissionRegistry**: Typed reads over the permission keys
//! - **AllowList**: A stored restriction list. Empty means unrestricted
//! - **RequestAuthorizer**: Maps a request to the permissions it needs
//! - **PermissionGrant**: Builds the storage writes for a controller
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keymanager_core::{AccountRequest, Address, Bytes, Permission, U256};
//! use keymanager_perms::{PermissionGrant, RequestAuthorizer};
//! use keymanager_store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let controller = Address::repeat_byte(1);
//! for (key, value) in PermissionGrant::new(controller)
//!     .with_permission(Permission::TransferValue)
//!     .writes()
//! {
//!     store.put_data(key, value).unwrap();
//! }
//!
//! let request = AccountRequest::Execute {
//!     operation: U256::ZERO,
//!     target: Address::repeat_byte(2),
//!     value: U256::from(1u8),
//!     data: Bytes::new(),
//! };
//! let decision = RequestAuthorizer::new(&store)
//!     .authorize(&controller, &request)
//!     .unwrap();
//! println!("{:?}", decision.restrictions);
//! ```

pub mod allowlist;
pub mod authorizer;
pub mod error;
pub mod grant;
pub mod registry;

pub use allowlist::AllowList;
pub use authorizer::{ActionKind, Decision, RequestAuthorizer, Restrictions};
pub use error::{AuthError, ListKind, Result};
pub use grant::PermissionGrant;
pub use registry::{PermissionRegistry, MAX_ENUMERATED_CONTROLLERS};
