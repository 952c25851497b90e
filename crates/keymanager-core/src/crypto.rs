//! Relay signatures: digest construction, signer recovery and signing.
//!
//! A relayed request is signed over
//! `eth_signed(keccak256(identity ‖ nonce ‖ payload))`, where `identity`
//! is the 20-byte address of the key manager, `nonce` the packed 32-byte
//! index and `payload` the raw account call. Signatures are 65-byte
//! `r ‖ s ‖ v` secp256k1 signatures.

use alloy_primitives::{hex, keccak256, Address, B256, U256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use std::fmt;

use crate::error::{CoreError, Result};

/// Half the secp256k1 group order. Signatures with a larger `s` are malleable.
const SECP256K1_HALF_ORDER: [u8; 32] =
    hex!("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0");

const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// The packed message a relay signer commits to.
pub fn relay_message(identity: &Address, nonce: U256, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(20 + 32 + payload.len());
    message.extend_from_slice(identity.as_slice());
    message.extend_from_slice(&nonce.to_be_bytes::<32>());
    message.extend_from_slice(payload);
    message
}

/// Prefix a 32-byte hash the way `eth_sign` does and hash again.
pub fn to_eth_signed_message_hash(hash: &B256) -> B256 {
    let mut buf = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + 32);
    buf.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
    buf.extend_from_slice(hash.as_slice());
    keccak256(&buf)
}

/// The digest a relay signature is checked against.
pub fn relay_digest(identity: &Address, nonce: U256, payload: &[u8]) -> B256 {
    let inner = keccak256(relay_message(identity, nonce, payload));
    to_eth_signed_message_hash(&inner)
}

/// Recover the signing address of a 65-byte `r ‖ s ‖ v` signature.
///
/// `v` may be given as 0/1 or 27/28. High-`s` signatures are rejected.
pub fn recover_signer(prehash: &B256, signature: &[u8]) -> Result<Address> {
    if signature.len() != 65 {
        return Err(CoreError::InvalidSignatureLength(signature.len()));
    }

    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        other => {
            return Err(CoreError::InvalidSignature(format!(
                "unsupported recovery byte {other}"
            )))
        }
    };
    if signature[32..64] > SECP256K1_HALF_ORDER[..] {
        return Err(CoreError::InvalidSignature("s is in the upper half order".into()));
    }

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| CoreError::InvalidSignature(format!("bad recovery id {v}")))?;
    let key = VerifyingKey::recover_from_prehash(prehash.as_slice(), &sig, recovery_id)
        .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;

    Ok(address_of(&key))
}

/// Ethereum address of a secp256k1 public key.
fn address_of(key: &VerifyingKey) -> Address {
    let point = k256::PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// A secp256k1 key that signs relay calls.
#[derive(Clone)]
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::random(&mut rng),
        }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(seed)
            .map_err(|e| CoreError::InvalidSigningKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// The Ethereum address of this key.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest, returning `r ‖ s ‖ v` with `v` in {27, 28}.
    pub fn sign_prehash(&self, prehash: &B256) -> Result<[u8; 65]> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prehash.as_slice())
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(out)
    }

    /// Sign a relayed call addressed to the key manager at `identity`.
    pub fn sign_relay_call(
        &self,
        identity: &Address,
        nonce: U256,
        payload: &[u8],
    ) -> Result<[u8; 65]> {
        self.sign_prehash(&relay_digest(identity, nonce, payload))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signer({})", self.address())
    }
}
