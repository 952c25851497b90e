//! Key manager configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// When a consumed relay nonce counts as spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayNoncePolicy {
    /// The counter only advances if the whole request succeeds.
    #[default]
    Atomic,
    /// The counter advances once signature and nonce check out, even if
    /// authorization or the call fails afterwards.
    ConsumeOnAuthentication,
}

/// Configuration for the key manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyManagerConfig {
    pub relay_nonce_policy: RelayNoncePolicy,
    /// Strip the `abi.encode(bytes)` wrapper from call results.
    pub unwrap_call_results: bool,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self {
            relay_nonce_policy: RelayNoncePolicy::Atomic,
            unwrap_call_results: true,
        }
    }
}

impl KeyManagerConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KeyManagerConfig::from_json("{}").unwrap();
        assert_eq!(config, KeyManagerConfig::default());
        assert_eq!(config.relay_nonce_policy, RelayNoncePolicy::Atomic);
        assert!(config.unwrap_call_results);
    }

    #[test]
    fn test_overrides() {
        let config = KeyManagerConfig::from_json(
            r#"{"relay_nonce_policy": "consume_on_authentication", "unwrap_call_results": false}"#,
        )
        .unwrap();
        assert_eq!(
            config.relay_nonce_policy,
            RelayNoncePolicy::ConsumeOnAuthentication
        );
        assert!(!config.unwrap_call_results);
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(KeyManagerConfig::from_json(r#"{"relay_nonce_policy": "never"}"#).is_err());
    }
}
