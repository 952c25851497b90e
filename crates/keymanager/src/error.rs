//! Error types for the key manager.

use keymanager_core::{Address, Bytes, CoreError, U256};
use keymanager_perms::AuthError;
use keymanager_store::StoreError;
use thiserror::Error;

/// Errors that can occur during key manager operations.
#[derive(Debug, Error)]
pub enum KeyManagerError {
    /// Authorization denied the request.
    #[error("permission error: {0}")]
    Permission(#[from] AuthError),

    /// Payload or signature could not be decoded.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The relayed nonce does not bind to this key manager's current counter.
    #[error("invalid relay nonce {nonce} for signer {signer}: {reason}")]
    InvalidNonce {
        signer: Address,
        nonce: U256,
        reason: NonceRejection,
    },

    #[error("relay nonce of {signer} exhausted on channel {channel}")]
    NonceOverflow { signer: Address, channel: u128 },

    /// A consumed counter could not be restored because it moved on.
    #[error("relay nonce of {signer} on channel {channel} advanced past {counter}, not restored")]
    NonceRollbackConflict {
        signer: Address,
        channel: u128,
        counter: u128,
    },

    /// The account call reverted with a reason string.
    #[error("call reverted: {reason}")]
    CallReverted { reason: String },

    /// The account call reverted without a decodable reason.
    #[error("call failed ({} bytes of revert data)", data.len())]
    CallFailed { data: Bytes },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Why a relayed nonce was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NonceRejection {
    /// The presented counter is not the signer's current one.
    #[error("expected counter {expected}")]
    Stale { expected: u128 },

    /// The signature commits to another key manager.
    #[error("signed for {claimed}, not this key manager")]
    WrongTarget { claimed: Address },

    /// Another request consumed the counter first.
    #[error("counter consumed concurrently")]
    Consumed,
}

/// Result type for key manager operations.
pub type Result<T> = std::result::Result<T, KeyManagerError>;
