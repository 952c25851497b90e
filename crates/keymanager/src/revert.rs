//! Revert payloads for failed requests.
//!
//! A host surfacing key manager failures on-chain reverts with these
//! custom errors. Downstream reverts are re-raised as `Error(string)`.

use alloy_primitives::B256;
use alloy_sol_types::{sol, SolError};

use keymanager_core::{abi, Bytes};
use keymanager_perms::AuthError;

use crate::error::KeyManagerError;

sol! {
    error NoPermissionsSet(address from);
    error NotAuthorised(address from, string permission);
    error NotAllowedAddress(address from, address to);
    error NotAllowedFunction(address from, bytes4 disallowedFunction);
    error NotAllowedStandard(address from, address to);
    error NotAllowedDataKey(address from, bytes32 disallowedKey);
    error InvalidOperationType(uint256 operationType);
    error InvalidAccountFunction(bytes4 invalidFunction);
    error InvalidEncodedAllowedList(bytes32 dataKey, string expectedType);
    error InvalidRelayNonce(address signer, uint256 invalidNonce);
    error RelayNonceOverflow(address signer, uint128 channel);
}

impl KeyManagerError {
    /// ABI-encoded revert data for this error.
    pub fn revert_data(&self) -> Bytes {
        match self {
            KeyManagerError::Permission(e) => auth_revert_data(e),
            KeyManagerError::InvalidNonce { signer, nonce, .. } => InvalidRelayNonce {
                signer: *signer,
                invalidNonce: *nonce,
            }
            .abi_encode()
            .into(),
            KeyManagerError::NonceOverflow { signer, channel } => RelayNonceOverflow {
                signer: *signer,
                channel: *channel,
            }
            .abi_encode()
            .into(),
            KeyManagerError::CallReverted { reason } => abi::encode_revert_reason(reason),
            KeyManagerError::CallFailed { data } => data.clone(),
            other => abi::encode_revert_reason(&other.to_string()),
        }
    }
}

fn auth_revert_data(error: &AuthError) -> Bytes {
    let encoded = match error {
        AuthError::NoPermissionsSet { controller } => {
            NoPermissionsSet { from: *controller }.abi_encode()
        }
        AuthError::NotAuthorised {
            controller,
            permission,
        } => NotAuthorised {
            from: *controller,
            permission: permission.name().to_string(),
        }
        .abi_encode(),
        AuthError::NotAllowedAddress { controller, target } => NotAllowedAddress {
            from: *controller,
            to: *target,
        }
        .abi_encode(),
        AuthError::NotAllowedFunction {
            controller,
            selector,
        } => NotAllowedFunction {
            from: *controller,
            disallowedFunction: *selector,
        }
        .abi_encode(),
        AuthError::NotAllowedStandard { controller, target } => NotAllowedStandard {
            from: *controller,
            to: *target,
        }
        .abi_encode(),
        AuthError::NotAllowedKey { controller, key } => NotAllowedDataKey {
            from: *controller,
            disallowedKey: B256::from(*key),
        }
        .abi_encode(),
        AuthError::InvalidOperationType(operation) => InvalidOperationType {
            operationType: *operation,
        }
        .abi_encode(),
        AuthError::InvalidSelector(selector) => InvalidAccountFunction {
            invalidFunction: *selector,
        }
        .abi_encode(),
        AuthError::InvalidEncodedList { key, kind } => InvalidEncodedAllowedList {
            dataKey: B256::from(*key),
            expectedType: kind.to_string(),
        }
        .abi_encode(),
        AuthError::Store(_) | AuthError::Core(_) => {
            return abi::encode_revert_reason(&error.to_string())
        }
    };
    encoded.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NonceRejection;
    use keymanager_core::{Address, Permission, U256};

    #[test]
    fn test_not_authorised_names_permission() {
        let controller = Address::repeat_byte(0xaa);
        let error = KeyManagerError::from(AuthError::NotAuthorised {
            controller,
            permission: Permission::TransferValue,
        });
        let data = error.revert_data();
        assert_eq!(&data[..4], NotAuthorised::SELECTOR.as_slice());
        let decoded = NotAuthorised::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.from, controller);
        assert_eq!(decoded.permission, "TRANSFERVALUE");
    }

    #[test]
    fn test_invalid_nonce_carries_index() {
        let signer = Address::repeat_byte(0x51);
        let error = KeyManagerError::InvalidNonce {
            signer,
            nonce: U256::from(7u8),
            reason: NonceRejection::Stale { expected: 3 },
        };
        let decoded = InvalidRelayNonce::abi_decode(&error.revert_data(), true).unwrap();
        assert_eq!(decoded.signer, signer);
        assert_eq!(decoded.invalidNonce, U256::from(7u8));
    }

    #[test]
    fn test_wrong_target_reverts_as_invalid_nonce() {
        let signer = Address::repeat_byte(0x52);
        let error = KeyManagerError::InvalidNonce {
            signer,
            nonce: U256::ZERO,
            reason: NonceRejection::WrongTarget {
                claimed: Address::repeat_byte(0x99),
            },
        };
        let data = error.revert_data();
        assert_eq!(&data[..4], InvalidRelayNonce::SELECTOR.as_slice());
        assert_eq!(
            InvalidRelayNonce::abi_decode(&data, true).unwrap().signer,
            signer
        );
    }

    #[test]
    fn test_downstream_reason_is_reraised() {
        let error = KeyManagerError::CallReverted {
            reason: "insufficient balance".into(),
        };
        assert_eq!(
            abi::decode_revert_reason(&error.revert_data()).as_deref(),
            Some("insufficient balance")
        );

        let raw = Bytes::from_static(&[0xde, 0xad]);
        let error = KeyManagerError::CallFailed { data: raw.clone() };
        assert_eq!(error.revert_data(), raw);
    }
}
