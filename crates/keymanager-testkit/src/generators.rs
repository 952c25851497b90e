//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keymanager_core::{
    keys, Address, DataKey, NonceIndex, OperationType, Permission, PermissionSet, Selector,
};

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from)
}

/// Generate a random data key.
pub fn data_key() -> impl Strategy<Value = DataKey> {
    any::<[u8; 32]>().prop_map(DataKey::from_bytes)
}

/// Generate a key outside the permission namespace.
pub fn plain_key() -> impl Strategy<Value = DataKey> {
    data_key().prop_filter("permission key", |key| {
        !keys::classify(key).is_permission_key()
    })
}

pub fn selector() -> impl Strategy<Value = Selector> {
    any::<[u8; 4]>().prop_map(Selector::from)
}

pub fn permission() -> impl Strategy<Value = Permission> {
    prop::sample::select(Permission::ALL.to_vec())
}

/// Generate a set of named permissions.
pub fn permission_set() -> impl Strategy<Value = PermissionSet> {
    prop::collection::vec(permission(), 0..6).prop_map(PermissionSet::from_iter)
}

pub fn operation_type() -> impl Strategy<Value = OperationType> {
    prop_oneof![
        Just(OperationType::Call),
        Just(OperationType::Create),
        Just(OperationType::Create2),
        Just(OperationType::StaticCall),
        Just(OperationType::DelegateCall),
    ]
}

pub fn nonce_index() -> impl Strategy<Value = NonceIndex> {
    (any::<u128>(), any::<u128>()).prop_map(|(channel, counter)| NonceIndex::new(channel, counter))
}

/// An allowed-key entry with `significant` leading bytes, the last of
/// which is non-zero, followed by zero padding.
#[derive(Debug, Clone)]
pub struct KeyPrefix {
    pub prefix: DataKey,
    pub significant: usize,
}

impl KeyPrefix {
    /// A key sharing the significant bytes, with `tail` filling the rest.
    pub fn extend(&self, tail: &[u8; 32]) -> DataKey {
        let mut key = *tail;
        key[..self.significant].copy_from_slice(&self.prefix.as_bytes()[..self.significant]);
        DataKey::from_bytes(key)
    }
}

impl Arbitrary for KeyPrefix {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1usize..=32, any::<[u8; 32]>(), 1u8..=u8::MAX)
            .prop_map(|(significant, bytes, last)| {
                let mut prefix = [0u8; 32];
                prefix[..significant].copy_from_slice(&bytes[..significant]);
                prefix[significant - 1] = last;
                KeyPrefix {
                    prefix: DataKey::from_bytes(prefix),
                    significant,
                }
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymanager_core::{count_trailing_zero_bytes, key_matches_prefix, U256};

    proptest! {
        #[test]
        fn test_prefix_admits_its_namespace(entry: KeyPrefix, tail in any::<[u8; 32]>()) {
            prop_assert_eq!(count_trailing_zero_bytes(&entry.prefix), 32 - entry.significant);
            prop_assert!(key_matches_prefix(&entry.extend(&tail), &entry.prefix));
        }

        #[test]
        fn test_prefix_rejects_changed_significant_byte(
            entry: KeyPrefix,
            tail in any::<[u8; 32]>(),
            position in any::<prop::sample::Index>(),
            flip in 1u8..=u8::MAX,
        ) {
            let mut key = *entry.extend(&tail).as_bytes();
            key[position.index(entry.significant)] ^= flip;
            prop_assert!(!key_matches_prefix(&DataKey::from_bytes(key), &entry.prefix));
        }

        #[test]
        fn test_nonce_index_packing(index in nonce_index()) {
            let packed = index.to_u256();
            prop_assert_eq!(NonceIndex::from_u256(packed), index);
            prop_assert_eq!(packed >> 128, U256::from(index.channel));
        }

        #[test]
        fn test_plain_keys_classify_plain(key in plain_key()) {
            prop_assert_eq!(keys::classify(&key), keys::KeyKind::Plain);
        }

        #[test]
        fn test_permission_set_contains_members(members in prop::collection::vec(permission(), 1..6)) {
            let set = PermissionSet::from_iter(members.iter().copied());
            for p in members {
                prop_assert!(set.contains(p));
            }
        }
    }

    proptest! {
        #[test]
        fn test_operation_types_round_trip(operation in operation_type()) {
            let raw = U256::from(operation as u8);
            prop_assert_eq!(OperationType::try_from(raw), Ok(operation));
        }
    }
}
