//! Golden test vectors for key classification and prefix masking.
//!
//! Keys are written as hex and zero-padded on the right to 32 bytes, so a
//! short string denotes a prefix entry.

use keymanager_core::{keys, Address, DataKey, KeyKind};

const CONTROLLER: Address = Address::repeat_byte(0xca);

/// A key and the kind it must classify as.
#[derive(Debug, Clone)]
pub struct ClassificationVector {
    pub name: &'static str,
    pub key: &'static str,
    pub expected: KeyKind,
}

/// An allowed-key entry, a candidate key and whether it matches.
#[derive(Debug, Clone)]
pub struct MaskVector {
    pub name: &'static str,
    pub prefix: &'static str,
    pub candidate: &'static str,
    pub matches: bool,
}

/// Parse a right-padded hex key.
pub fn key(hex_str: &str) -> DataKey {
    let padded = format!("{hex_str:0<64}");
    let mut bytes = [0u8; 32];
    if hex::decode_to_slice(&padded, &mut bytes).is_err() {
        panic!("bad vector key {hex_str}");
    }
    DataKey::from_bytes(bytes)
}

pub fn classification_vectors() -> Vec<ClassificationVector> {
    vec![
        ClassificationVector {
            name: "array length key",
            key: "df30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3",
            expected: KeyKind::PermissionsArrayLength,
        },
        ClassificationVector {
            name: "array element 2",
            key: "df30dba06db6a30e65354d9a64c6098600000000000000000000000000000002",
            expected: KeyKind::PermissionsArrayElement(2),
        },
        ClassificationVector {
            name: "length key with last byte changed is an element",
            key: "df30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e4",
            expected: KeyKind::PermissionsArrayElement(0x1f089545ca58c6b4dbe31a5f338cb0e4),
        },
        ClassificationVector {
            name: "permissions",
            key: "4b80742d0000000082ac0000cacacacacacacacacacacacacacacacacacacaca",
            expected: KeyKind::Permissions(CONTROLLER),
        },
        ClassificationVector {
            name: "allowed addresses",
            key: "4b80742d00000000c6dd0000cacacacacacacacacacacacacacacacacacacaca",
            expected: KeyKind::AllowedAddresses(CONTROLLER),
        },
        ClassificationVector {
            name: "allowed functions",
            key: "4b80742d000000008efe0000cacacacacacacacacacacacacacacacacacacaca",
            expected: KeyKind::AllowedFunctions(CONTROLLER),
        },
        ClassificationVector {
            name: "allowed standards",
            key: "4b80742d000000003efa0000cacacacacacacacacacacacacacacacacacacaca",
            expected: KeyKind::AllowedStandards(CONTROLLER),
        },
        ClassificationVector {
            name: "allowed keys",
            key: "4b80742d0000000090b80000cacacacacacacacacacacacacacacacacacacaca",
            expected: KeyKind::AllowedKeys(CONTROLLER),
        },
        ClassificationVector {
            name: "unknown key in the permission namespace",
            key: "4b80742d00000000ffff0000cacacacacacacacacacacacacacacacacacacaca",
            expected: KeyKind::PermissionNamespace,
        },
        ClassificationVector {
            name: "namespace prefix off by one byte",
            key: "4b80742d0000000182ac0000cacacacacacacacacacacacacacacacacacacaca",
            expected: KeyKind::Plain,
        },
        ClassificationVector {
            name: "zero key",
            key: "",
            expected: KeyKind::Plain,
        },
    ]
}

pub fn mask_vectors() -> Vec<MaskVector> {
    vec![
        MaskVector {
            name: "four-byte prefix admits any tail",
            prefix: "aabbccdd",
            candidate: "aabbccddffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
            matches: true,
        },
        MaskVector {
            name: "four-byte prefix rejects a different fourth byte",
            prefix: "aabbccdd",
            candidate: "aabbccde",
            matches: false,
        },
        MaskVector {
            name: "interior zero byte is significant",
            prefix: "aa00cc",
            candidate: "aa11cc0102",
            matches: false,
        },
        MaskVector {
            name: "interior zero byte matches zero",
            prefix: "aa00cc",
            candidate: "aa00ccffee",
            matches: true,
        },
        MaskVector {
            name: "full key matches only itself",
            prefix: "0102030405060708091011121314151617181920212223242526272829303132",
            candidate: "0102030405060708091011121314151617181920212223242526272829303132",
            matches: true,
        },
        MaskVector {
            name: "full key rejects a different last byte",
            prefix: "0102030405060708091011121314151617181920212223242526272829303132",
            candidate: "0102030405060708091011121314151617181920212223242526272829303133",
            matches: false,
        },
        MaskVector {
            name: "zero entry admits everything",
            prefix: "",
            candidate: "deadbeef",
            matches: true,
        },
    ]
}

/// Check every vector, returning `(name, passed)` pairs.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    let classified = classification_vectors()
        .into_iter()
        .map(|v| (v.name.to_string(), keys::classify(&key(v.key)) == v.expected));
    let masked = mask_vectors().into_iter().map(|v| {
        let matched = keys::key_matches_prefix(&key(v.candidate), &key(v.prefix));
        (v.name.to_string(), matched == v.matches)
    });
    classified.chain(masked).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        for (name, passed) in verify_all_vectors() {
            assert!(passed, "vector '{name}' failed");
        }
    }

    #[test]
    fn test_builders_agree_with_vectors() {
        assert_eq!(key(classification_vectors()[0].key), keys::permissions_array_key());
        assert_eq!(
            key(classification_vectors()[3].key),
            keys::permissions_key(&CONTROLLER)
        );
        assert_eq!(
            key(classification_vectors()[7].key),
            keys::allowed_keys_key(&CONTROLLER)
        );
    }
}
