//! ABI codecs for the account's call surface and for stored lists.
//!
//! Two decoding regimes exist for stored lists:
//!
//! - **Reads are lenient.** A stored allow-list that fails to decode is
//!   treated as absent, which means "no restriction".
//! - **Writes are strict.** A new allow-list value must decode and then
//!   re-encode to exactly the same bytes, so nothing non-canonical is ever
//!   written through the permission layer.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};

use crate::error::{CoreError, Result};
use crate::types::{DataKey, Selector};

sol! {
    /// The account calls the key manager understands.
    interface IERC725 {
        function setData(bytes32[] keys, bytes[] values);
        function execute(uint256 operationType, address target, uint256 value, bytes data) returns (bytes);
        function transferOwnership(address newOwner);
    }
}

/// Selector of `Error(string)`.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Offset of the string payload in an `Error(string)` revert: 4-byte
/// selector, 32-byte offset, 32-byte length.
const MIN_REVERT_REASON_LEN: usize = 68;

/// A call on the account, decoded once from its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRequest {
    SetData {
        keys: Vec<DataKey>,
        values: Vec<Bytes>,
    },
    Execute {
        /// Raw operation type; validated by the authorizer.
        operation: U256,
        target: Address,
        value: U256,
        data: Bytes,
    },
    TransferOwnership {
        new_owner: Address,
    },
    /// A selector the key manager does not route.
    Unknown {
        selector: Selector,
    },
}

impl AccountRequest {
    /// Decode an account payload.
    ///
    /// Fails on payloads shorter than a selector and on known selectors
    /// whose arguments do not decode.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 4 {
            return Err(CoreError::PayloadTooShort { len: payload.len() });
        }
        let selector = Selector::from_slice(&payload[..4]);
        let args = &payload[4..];
        let malformed = |e: alloy_sol_types::Error| CoreError::MalformedCall {
            selector,
            reason: e.to_string(),
        };

        let request = if selector == IERC725::setDataCall::SELECTOR {
            let call = IERC725::setDataCall::abi_decode_raw(args, true).map_err(malformed)?;
            if call.keys.len() != call.values.len() {
                return Err(CoreError::MalformedCall {
                    selector,
                    reason: format!(
                        "{} keys but {} values",
                        call.keys.len(),
                        call.values.len()
                    ),
                });
            }
            AccountRequest::SetData {
                keys: call.keys.into_iter().map(DataKey::from).collect(),
                values: call.values,
            }
        } else if selector == IERC725::executeCall::SELECTOR {
            let call = IERC725::executeCall::abi_decode_raw(args, true).map_err(malformed)?;
            AccountRequest::Execute {
                operation: call.operationType,
                target: call.target,
                value: call.value,
                data: call.data,
            }
        } else if selector == IERC725::transferOwnershipCall::SELECTOR {
            let call = IERC725::transferOwnershipCall::abi_decode_raw(args, true)
                .map_err(malformed)?;
            AccountRequest::TransferOwnership {
                new_owner: call.newOwner,
            }
        } else {
            AccountRequest::Unknown { selector }
        };
        Ok(request)
    }

    /// The 4-byte selector of this request.
    pub fn selector(&self) -> Selector {
        match self {
            AccountRequest::SetData { .. } => IERC725::setDataCall::SELECTOR.into(),
            AccountRequest::Execute { .. } => IERC725::executeCall::SELECTOR.into(),
            AccountRequest::TransferOwnership { .. } => {
                IERC725::transferOwnershipCall::SELECTOR.into()
            }
            AccountRequest::Unknown { selector } => *selector,
        }
    }

    /// ABI-encode the request as an account payload.
    ///
    /// `Unknown` encodes to its bare selector.
    pub fn encode(&self) -> Bytes {
        match self {
            AccountRequest::SetData { keys, values } => IERC725::setDataCall {
                keys: keys.iter().map(|k| B256::from(*k)).collect(),
                values: values.clone(),
            }
            .abi_encode()
            .into(),
            AccountRequest::Execute {
                operation,
                target,
                value,
                data,
            } => IERC725::executeCall {
                operationType: *operation,
                target: *target,
                value: *value,
                data: data.clone(),
            }
            .abi_encode()
            .into(),
            AccountRequest::TransferOwnership { new_owner } => IERC725::transferOwnershipCall {
                newOwner: *new_owner,
            }
            .abi_encode()
            .into(),
            AccountRequest::Unknown { selector } => Bytes::copy_from_slice(selector.as_slice()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stored lists
// ─────────────────────────────────────────────────────────────────────────────

/// Lenient read of an `abi.encode(address[])` value. `None` when empty or malformed.
pub fn decode_address_array(data: &[u8]) -> Option<Vec<Address>> {
    decode_lenient(data)
}

/// Lenient read of an `abi.encode(bytes4[])` value. `None` when empty or malformed.
pub fn decode_bytes4_array(data: &[u8]) -> Option<Vec<FixedBytes<4>>> {
    decode_lenient(data)
}

/// Lenient read of an `abi.encode(bytes32[])` value. `None` when empty or malformed.
pub fn decode_bytes32_array(data: &[u8]) -> Option<Vec<DataKey>> {
    decode_lenient::<Vec<B256>>(data).map(|words| words.into_iter().map(DataKey::from).collect())
}

fn decode_lenient<T: SolValue + From<<T::SolType as alloy_sol_types::SolType>::RustType>>(
    data: &[u8],
) -> Option<T> {
    if data.is_empty() {
        return None;
    }
    T::abi_decode(data, false).ok()
}

/// Whether `data` is exactly the canonical encoding of an `address[]`.
pub fn is_encoded_address_array(data: &[u8]) -> bool {
    is_canonical::<Vec<Address>>(data)
}

/// Whether `data` is exactly the canonical encoding of a `bytes4[]`.
pub fn is_encoded_bytes4_array(data: &[u8]) -> bool {
    is_canonical::<Vec<FixedBytes<4>>>(data)
}

/// Whether `data` is exactly the canonical encoding of a `bytes32[]`.
pub fn is_encoded_bytes32_array(data: &[u8]) -> bool {
    is_canonical::<Vec<B256>>(data)
}

fn is_canonical<T: SolValue + From<<T::SolType as alloy_sol_types::SolType>::RustType>>(
    data: &[u8],
) -> bool {
    match T::abi_decode(data, true) {
        Ok(value) => value.abi_encode() == data,
        Err(_) => false,
    }
}

pub fn encode_address_array(addresses: &[Address]) -> Bytes {
    addresses.to_vec().abi_encode().into()
}

pub fn encode_bytes4_array(items: &[FixedBytes<4>]) -> Bytes {
    items.to_vec().abi_encode().into()
}

pub fn encode_bytes32_array(keys: &[DataKey]) -> Bytes {
    keys.iter()
        .map(|k| B256::from(*k))
        .collect::<Vec<_>>()
        .abi_encode()
        .into()
}

/// Read a stored value as a `bytes32` word (left-aligned, right-padded).
pub fn stored_word(value: &[u8]) -> U256 {
    let mut word = [0u8; 32];
    let len = value.len().min(32);
    word[..len].copy_from_slice(&value[..len]);
    U256::from_be_bytes(word)
}

// ─────────────────────────────────────────────────────────────────────────────
// Call results
// ─────────────────────────────────────────────────────────────────────────────

/// Extract the message of an `Error(string)` revert.
///
/// The first four bytes are skipped without inspection. Anything too short
/// to hold an offset and a length, or whose tail is not a string, yields
/// `None`.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < MIN_REVERT_REASON_LEN {
        return None;
    }
    String::abi_decode(&data[4..], false).ok()
}

/// Encode `Error(reason)` the way a reverting contract does.
pub fn encode_revert_reason(reason: &str) -> Bytes {
    let mut out = ERROR_STRING_SELECTOR.to_vec();
    out.extend_from_slice(&reason.to_string().abi_encode());
    out.into()
}

/// Wrap a call result as `abi.encode(bytes)`.
pub fn encode_bytes_result(data: &[u8]) -> Bytes {
    Bytes::copy_from_slice(data).abi_encode().into()
}

/// Unwrap `abi.encode(bytes)` returned by the account's `execute`.
///
/// Targets that return raw bytes are passed through unchanged.
pub fn unwrap_bytes_result(result: &[u8]) -> Bytes {
    match Bytes::abi_decode(result, true) {
        Ok(inner) => inner,
        Err(_) => Bytes::copy_from_slice(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(IERC725::executeCall::SELECTOR, hex!("44c028fe"));
        assert_eq!(IERC725::transferOwnershipCall::SELECTOR, hex!("f2fde38b"));
    }

    #[test]
    fn test_decode_execute() {
        let request = AccountRequest::Execute {
            operation: U256::ZERO,
            target: Address::repeat_byte(0x22),
            value: U256::from(5u8),
            data: Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb]),
        };
        let decoded = AccountRequest::decode(&request.encode()).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.selector(), Selector::from(IERC725::executeCall::SELECTOR));
    }

    #[test]
    fn test_decode_rejects_short_and_mismatched() {
        assert!(matches!(
            AccountRequest::decode(&[0x44, 0xc0]),
            Err(CoreError::PayloadTooShort { len: 2 })
        ));

        let unequal = IERC725::setDataCall {
            keys: vec![B256::ZERO, B256::repeat_byte(1)],
            values: vec![Bytes::new()],
        }
        .abi_encode();
        assert!(matches!(
            AccountRequest::decode(&unequal),
            Err(CoreError::MalformedCall { .. })
        ));

        // Known selector with truncated arguments.
        let truncated = &IERC725::executeCall::SELECTOR[..];
        assert!(AccountRequest::decode(truncated).is_err());
    }

    #[test]
    fn test_unknown_selector_decodes() {
        let payload = hex!("deadbeef0000");
        assert_eq!(
            AccountRequest::decode(&payload).unwrap(),
            AccountRequest::Unknown {
                selector: Selector::from(hex!("deadbeef"))
            }
        );
    }

    #[test]
    fn test_lenient_list_reads() {
        let addresses = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let encoded = encode_address_array(&addresses);
        assert_eq!(decode_address_array(&encoded), Some(addresses));
        assert_eq!(decode_address_array(&[]), None);
        assert_eq!(decode_address_array(&[0xff; 7]), None);
    }

    #[test]
    fn test_strict_list_validation() {
        let selectors = vec![FixedBytes::<4>::from(hex!("a9059cbb"))];
        let encoded = encode_bytes4_array(&selectors);
        assert!(is_encoded_bytes4_array(&encoded));

        // Trailing garbage decodes leniently but is not canonical.
        let mut padded = encoded.to_vec();
        padded.extend_from_slice(&[0u8; 32]);
        assert!(!is_encoded_bytes4_array(&padded));

        // Dirty low bytes in a bytes4 slot are not canonical either.
        let mut dirty = encoded.to_vec();
        let last = dirty.len() - 1;
        dirty[last] = 0x01;
        assert!(!is_encoded_bytes4_array(&dirty));

        assert!(!is_encoded_address_array(&[]));
        assert!(is_encoded_bytes32_array(&encode_bytes32_array(&[DataKey::ZERO])));
    }

    #[test]
    fn test_revert_reason() {
        let data = encode_revert_reason("insufficient balance");
        assert_eq!(&data[..4], &hex!("08c379a0"));
        assert_eq!(decode_revert_reason(&data).as_deref(), Some("insufficient balance"));

        assert_eq!(decode_revert_reason(&data[..67]), None);
        assert_eq!(decode_revert_reason(&[]), None);
    }

    #[test]
    fn test_unwrap_result() {
        let inner = Bytes::from_static(b"hello");
        let wrapped = encode_bytes_result(&inner);
        assert_eq!(unwrap_bytes_result(&wrapped), inner);

        let raw = [0x01, 0x02, 0x03];
        assert_eq!(unwrap_bytes_result(&raw), Bytes::copy_from_slice(&raw));
    }

    #[test]
    fn test_stored_word() {
        assert_eq!(stored_word(&[]), U256::ZERO);
        assert_eq!(stored_word(&U256::from(3u8).to_be_bytes::<32>()), U256::from(3u8));
        assert_eq!(stored_word(&[0x01]), U256::from(1u8) << 248);
    }
}
