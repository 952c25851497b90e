//! Storage key namespace and prefix masking.
//!
//! Permission state lives in the account's ordinary key-value storage under
//! reserved keys. A reserved key is recognised by a fixed leading prefix:
//!
//! | bytes | layout                                   | meaning                         |
//! |-------|------------------------------------------|---------------------------------|
//! | 32    | `ARRAY_KEY`                              | number of registered controllers |
//! | 16    | `ARRAY_KEY[..16]` ‖ u128 index           | controller at index             |
//! | 12    | `PERMISSIONS_PREFIX` ‖ address           | permission bits                 |
//! | 12    | `ALLOWED_*_PREFIX` ‖ address             | allow-lists                     |
//! | 8     | `NAMESPACE_PREFIX` ‖ anything            | other per-address permission keys |
//!
//! The length key shares its first 16 bytes with every element key, so it
//! is matched exactly before the element prefix is tried.
//!
//! Allowed-key entries are prefixes too. Their specificity is implicit: the
//! trailing zero bytes of an entry are "don't care" positions, so
//! `0xAABBCCDD00..00` admits every key starting with `AABBCCDD`.

use alloy_primitives::{hex, Address, U256};

use crate::types::DataKey;

/// The `AddressPermissions[]` array key (holds the controller count).
pub const PERMISSIONS_ARRAY_KEY: [u8; 32] =
    hex!("df30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3");

/// Leading bytes shared by all `AddressPermissions[]` element keys.
pub const PERMISSIONS_ARRAY_ELEMENT_PREFIX: [u8; 16] = hex!("df30dba06db6a30e65354d9a64c60986");

/// Leading bytes of every per-address permission key.
pub const NAMESPACE_PREFIX: [u8; 8] = hex!("4b80742d00000000");

pub const PERMISSIONS_PREFIX: [u8; 12] = hex!("4b80742d0000000082ac0000");
pub const ALLOWED_ADDRESSES_PREFIX: [u8; 12] = hex!("4b80742d00000000c6dd0000");
pub const ALLOWED_FUNCTIONS_PREFIX: [u8; 12] = hex!("4b80742d000000008efe0000");
pub const ALLOWED_STANDARDS_PREFIX: [u8; 12] = hex!("4b80742d000000003efa0000");
pub const ALLOWED_KEYS_PREFIX: [u8; 12] = hex!("4b80742d0000000090b80000");

/// What a storage key means to the permission engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Permission bits of a controller.
    Permissions(Address),
    /// `AddressPermissions[]` length.
    PermissionsArrayLength,
    /// `AddressPermissions[index]`.
    PermissionsArrayElement(u128),
    AllowedAddresses(Address),
    AllowedFunctions(Address),
    AllowedStandards(Address),
    AllowedKeys(Address),
    /// Inside the per-address namespace but none of the known prefixes.
    PermissionNamespace,
    /// Application data.
    Plain,
}

impl KeyKind {
    /// Whether writes to this key are permission mutations rather than data writes.
    pub fn is_permission_key(&self) -> bool {
        !matches!(self, KeyKind::Plain)
    }
}

/// Classify a storage key, most specific prefix first.
pub fn classify(key: &DataKey) -> KeyKind {
    let bytes = key.as_bytes();

    if *bytes == PERMISSIONS_ARRAY_KEY {
        return KeyKind::PermissionsArrayLength;
    }
    if bytes[..16] == PERMISSIONS_ARRAY_ELEMENT_PREFIX {
        let mut index = [0u8; 16];
        index.copy_from_slice(&bytes[16..]);
        return KeyKind::PermissionsArrayElement(u128::from_be_bytes(index));
    }
    if bytes[..8] != NAMESPACE_PREFIX {
        return KeyKind::Plain;
    }

    let address = Address::from_slice(&bytes[12..]);
    let prefix: &[u8] = &bytes[..12];
    if prefix == PERMISSIONS_PREFIX {
        KeyKind::Permissions(address)
    } else if prefix == ALLOWED_ADDRESSES_PREFIX {
        KeyKind::AllowedAddresses(address)
    } else if prefix == ALLOWED_FUNCTIONS_PREFIX {
        KeyKind::AllowedFunctions(address)
    } else if prefix == ALLOWED_STANDARDS_PREFIX {
        KeyKind::AllowedStandards(address)
    } else if prefix == ALLOWED_KEYS_PREFIX {
        KeyKind::AllowedKeys(address)
    } else {
        KeyKind::PermissionNamespace
    }
}

/// Number of zero bytes at the end of the key, scanning from the least
/// significant byte. An all-zero key has 32.
pub fn count_trailing_zero_bytes(key: &DataKey) -> usize {
    key.as_bytes().iter().rev().take_while(|b| **b == 0).count()
}

/// A mask of `32 - n` leading `0xff` bytes followed by `n` zero bytes.
pub fn prefix_mask(trailing_zero_bytes: usize) -> U256 {
    if trailing_zero_bytes >= 32 {
        return U256::ZERO;
    }
    U256::MAX << (trailing_zero_bytes * 8)
}

/// Whether `candidate` falls under the allowed `prefix` entry.
///
/// The mask comes from the entry's own trailing zeros, so the entry
/// decides how many leading bytes are significant.
pub fn key_matches_prefix(candidate: &DataKey, prefix: &DataKey) -> bool {
    let mask = prefix_mask(count_trailing_zero_bytes(prefix));
    candidate.to_u256() & mask == prefix.to_u256()
}

fn address_key(prefix: &[u8; 12], address: &Address) -> DataKey {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(prefix);
    key[12..].copy_from_slice(address.as_slice());
    DataKey::from_bytes(key)
}

/// Key holding the permission bits of `address`.
pub fn permissions_key(address: &Address) -> DataKey {
    address_key(&PERMISSIONS_PREFIX, address)
}

pub fn allowed_addresses_key(address: &Address) -> DataKey {
    address_key(&ALLOWED_ADDRESSES_PREFIX, address)
}

pub fn allowed_functions_key(address: &Address) -> DataKey {
    address_key(&ALLOWED_FUNCTIONS_PREFIX, address)
}

pub fn allowed_standards_key(address: &Address) -> DataKey {
    address_key(&ALLOWED_STANDARDS_PREFIX, address)
}

pub fn allowed_keys_key(address: &Address) -> DataKey {
    address_key(&ALLOWED_KEYS_PREFIX, address)
}

/// The `AddressPermissions[]` length key.
pub fn permissions_array_key() -> DataKey {
    DataKey::from_bytes(PERMISSIONS_ARRAY_KEY)
}

/// Key of `AddressPermissions[index]`.
pub fn permissions_array_element_key(index: u128) -> DataKey {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&PERMISSIONS_ARRAY_ELEMENT_PREFIX);
    key[16..].copy_from_slice(&index.to_be_bytes());
    DataKey::from_bytes(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_classify_builders() {
        let a = addr(0x11);
        assert_eq!(classify(&permissions_key(&a)), KeyKind::Permissions(a));
        assert_eq!(classify(&allowed_addresses_key(&a)), KeyKind::AllowedAddresses(a));
        assert_eq!(classify(&allowed_functions_key(&a)), KeyKind::AllowedFunctions(a));
        assert_eq!(classify(&allowed_standards_key(&a)), KeyKind::AllowedStandards(a));
        assert_eq!(classify(&allowed_keys_key(&a)), KeyKind::AllowedKeys(a));
        assert_eq!(classify(&permissions_array_key()), KeyKind::PermissionsArrayLength);
        assert_eq!(
            classify(&permissions_array_element_key(3)),
            KeyKind::PermissionsArrayElement(3)
        );
    }

    #[test]
    fn test_length_key_is_not_an_element() {
        // The length key starts with the element prefix; exact match wins.
        assert_eq!(&PERMISSIONS_ARRAY_KEY[..16], &PERMISSIONS_ARRAY_ELEMENT_PREFIX);
        assert_ne!(
            classify(&permissions_array_key()),
            KeyKind::PermissionsArrayElement(u128::from_be_bytes(
                PERMISSIONS_ARRAY_KEY[16..].try_into().unwrap()
            ))
        );
    }

    #[test]
    fn test_unknown_namespace_key() {
        let mut key = [0u8; 32];
        key[..8].copy_from_slice(&NAMESPACE_PREFIX);
        key[8..12].copy_from_slice(&[0xde, 0xad, 0x00, 0x00]);
        assert_eq!(classify(&DataKey::from_bytes(key)), KeyKind::PermissionNamespace);
        assert!(KeyKind::PermissionNamespace.is_permission_key());
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(classify(&DataKey::ZERO), KeyKind::Plain);
        assert_eq!(classify(&DataKey::from_bytes([0xaa; 32])), KeyKind::Plain);
        // Shares six bytes of the namespace prefix only.
        let mut key = [0u8; 32];
        key[..6].copy_from_slice(&NAMESPACE_PREFIX[..6]);
        key[6] = 0x01;
        assert_eq!(classify(&DataKey::from_bytes(key)), KeyKind::Plain);
    }

    #[test]
    fn test_trailing_zero_bytes() {
        assert_eq!(count_trailing_zero_bytes(&DataKey::ZERO), 32);
        assert_eq!(count_trailing_zero_bytes(&DataKey::from_bytes([1; 32])), 0);
        let mut key = [0u8; 32];
        key[..4].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(count_trailing_zero_bytes(&DataKey::from_bytes(key)), 28);
    }

    #[test]
    fn test_prefix_mask_shape() {
        assert_eq!(prefix_mask(0), U256::MAX);
        assert_eq!(prefix_mask(32), U256::ZERO);
        assert_eq!(prefix_mask(40), U256::ZERO);
        let mask = DataKey::from_u256(prefix_mask(28));
        assert_eq!(&mask.as_bytes()[..4], &[0xff; 4]);
        assert_eq!(&mask.as_bytes()[4..], &[0u8; 28]);
    }

    #[test]
    fn test_four_byte_prefix_match() {
        let prefix = DataKey::from_hex(
            "aabbccdd00000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        let mut inside = [0x5au8; 32];
        inside[..4].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        assert!(key_matches_prefix(&DataKey::from_bytes(inside), &prefix));

        let mut outside = inside;
        outside[2] = 0xcd;
        assert!(!key_matches_prefix(&DataKey::from_bytes(outside), &prefix));
    }

    proptest! {
        #[test]
        fn prop_prefix_admits_any_suffix(
            head in prop::collection::vec(1u8..=255, 1..=32),
            tail in prop::collection::vec(any::<u8>(), 32),
        ) {
            let mut prefix = [0u8; 32];
            prefix[..head.len()].copy_from_slice(&head);
            let mut candidate = [0u8; 32];
            candidate.copy_from_slice(&tail);
            candidate[..head.len()].copy_from_slice(&head);
            prop_assert!(key_matches_prefix(
                &DataKey::from_bytes(candidate),
                &DataKey::from_bytes(prefix),
            ));
        }

        #[test]
        fn prop_prefix_rejects_differing_head(
            head in prop::collection::vec(1u8..=255, 1..=32),
            flip in any::<prop::sample::Index>(),
            tail in prop::collection::vec(any::<u8>(), 32),
        ) {
            let mut prefix = [0u8; 32];
            prefix[..head.len()].copy_from_slice(&head);
            let mut candidate = [0u8; 32];
            candidate.copy_from_slice(&tail);
            candidate[..head.len()].copy_from_slice(&head);
            let at = flip.index(head.len());
            candidate[at] ^= 0x01;
            prop_assert!(!key_matches_prefix(
                &DataKey::from_bytes(candidate),
                &DataKey::from_bytes(prefix),
            ));
        }

        #[test]
        fn prop_exact_key_matches_itself(bytes in any::<[u8; 32]>()) {
            let key = DataKey::from_bytes(bytes);
            prop_assert!(key_matches_prefix(&key, &key));
        }
    }
}
