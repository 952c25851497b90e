//! Error types for the key manager core.

use thiserror::Error;

use crate::types::Selector;

/// Core errors raised while decoding requests and signatures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("payload too short: {len} bytes, need at least 4 for a selector")]
    PayloadTooShort { len: usize },

    #[error("malformed call to {selector}: {reason}")]
    MalformedCall { selector: Selector, reason: String },

    #[error("invalid signature length: expected 65 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
