//! # Key Manager Core
//!
//! Pure primitives for the key manager: storage keys, permission flags,
//! key classification, ABI codecs and relay signatures.
//!
//! This crate contains no I/O and no storage. Everything here is a pure
//! function over fixed-width byte arrays and ABI blobs.
//!
//! ## Key Types
//!
//! - [`DataKey`] - A 32-byte storage key of the account
//! - [`Permission`] / [`PermissionSet`] - Named capability flags and a 256-bit set of them
//! - [`KeyKind`] - Classification of a storage key into the permission namespace
//! - [`AccountRequest`] - A decoded call on the account (`setData`, `execute`, `transferOwnership`)
//! - [`NonceIndex`] - A relay nonce split into channel and counter
//!
//! ## Prefix Masking
//!
//! Allowed-key entries carry their own specificity: the number of trailing
//! zero bytes decides how much of a candidate key is compared. See [`keys`].

pub mod abi;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod permission;
pub mod types;

pub use abi::{
    decode_address_array, decode_bytes32_array, decode_bytes4_array, decode_revert_reason,
    encode_address_array, encode_bytes32_array, encode_bytes4_array, encode_bytes_result,
    encode_revert_reason, is_encoded_address_array, is_encoded_bytes32_array,
    is_encoded_bytes4_array, stored_word, unwrap_bytes_result, AccountRequest, IERC725,
};
pub use crypto::{recover_signer, relay_digest, relay_message, to_eth_signed_message_hash, Signer};
pub use error::{CoreError, Result};
pub use keys::{classify, count_trailing_zero_bytes, key_matches_prefix, prefix_mask, KeyKind};
pub use permission::{Permission, PermissionSet};
pub use types::{DataKey, InterfaceId, NonceIndex, OperationType, Selector};

pub use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
