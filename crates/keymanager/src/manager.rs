//! The key manager: the entry points controllers and relayers call.

use keymanager_core::{recover_signer, AccountRequest, Address, FixedBytes, Permission, B256, U256};
use keymanager_perms::{Decision, RequestAuthorizer};
use keymanager_store::{AccountCall, ContractView, DataStore, NonceStore};

use crate::config::{KeyManagerConfig, RelayNoncePolicy};
use crate::dispatch::{Dispatched, ExecutionDispatcher};
use crate::error::Result;
use crate::relay::RelayAuthenticator;

/// Returned by [`KeyManager::is_valid_signature`] for an accepted signature.
pub const ERC1271_MAGIC_VALUE: FixedBytes<4> = FixedBytes::new([0x16, 0x26, 0xba, 0x7e]);

/// Returned by [`KeyManager::is_valid_signature`] otherwise.
pub const ERC1271_FAIL_VALUE: FixedBytes<4> = FixedBytes::new([0xff, 0xff, 0xff, 0xff]);

/// Mediates every state change and outbound call of one account.
///
/// The account `A` provides storage, code lookups and the call surface.
/// Relay nonces live in `N`, which may be the same store.
pub struct KeyManager<A, N> {
    account: A,
    relay: RelayAuthenticator<N>,
    config: KeyManagerConfig,
}

impl<A, N> KeyManager<A, N>
where
    A: DataStore + ContractView + AccountCall,
    N: NonceStore,
{
    /// Create a key manager at `identity` with the default configuration.
    pub fn new(identity: Address, account: A, nonces: N) -> Self {
        Self::with_config(identity, account, nonces, KeyManagerConfig::default())
    }

    pub fn with_config(identity: Address, account: A, nonces: N, config: KeyManagerConfig) -> Self {
        Self {
            account,
            relay: RelayAuthenticator::new(identity, nonces),
            config,
        }
    }

    /// The address relayed calls must be signed for.
    pub fn identity(&self) -> Address {
        self.relay.identity()
    }

    pub fn account(&self) -> &A {
        &self.account
    }

    pub fn config(&self) -> &KeyManagerConfig {
        &self.config
    }

    fn authorizer(&self) -> RequestAuthorizer<&A> {
        RequestAuthorizer::new(&self.account)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entry points
    // ─────────────────────────────────────────────────────────────────────────

    /// Decide whether `caller` may submit `payload`, without executing it.
    pub fn authorize(&self, caller: &Address, payload: &[u8]) -> Result<Decision> {
        let request = AccountRequest::decode(payload)?;
        Ok(self.authorizer().authorize(caller, &request)?)
    }

    /// Execute `payload` on the account on behalf of `caller`.
    ///
    /// Returns the call output together with the record of what ran.
    pub fn execute(&self, caller: &Address, payload: &[u8], value: U256) -> Result<Dispatched> {
        self.authorize(caller, payload)?;
        self.dispatch(payload, value)
    }

    /// Execute a payload signed off-chain by a controller.
    ///
    /// `nonce` packs the channel (high 128 bits) and the counter (low 128
    /// bits). The signer's counter on that channel advances by one.
    pub fn execute_relay_call(
        &self,
        claimed_target: &Address,
        nonce: U256,
        payload: &[u8],
        signature: &[u8],
        value: U256,
    ) -> Result<Dispatched> {
        let authentication = self
            .relay
            .authenticate(claimed_target, nonce, payload, signature)?;

        let result = self
            .authorize(&authentication.signer, payload)
            .and_then(|_| self.dispatch(payload, value));

        if let Err(error) = &result {
            if self.config.relay_nonce_policy == RelayNoncePolicy::Atomic {
                if let Err(rollback) = self.relay.rollback(&authentication) {
                    tracing::warn!(
                        signer = %authentication.signer,
                        %error,
                        %rollback,
                        "relay nonce left consumed"
                    );
                }
            }
        }
        result
    }

    /// The packed nonce index `address` must sign with next on `channel`.
    pub fn get_nonce(&self, address: &Address, channel: u128) -> Result<U256> {
        self.relay.get_nonce(address, channel)
    }

    /// ERC-1271 validation: accepts signatures by controllers holding SIGN.
    ///
    /// A malformed or unrecoverable signature yields the fail value rather
    /// than an error.
    pub fn is_valid_signature(&self, hash: &B256, signature: &[u8]) -> Result<FixedBytes<4>> {
        let signer = match recover_signer(hash, signature) {
            Ok(signer) => signer,
            Err(e) => {
                tracing::debug!(error = %e, "signature not recoverable");
                return Ok(ERC1271_FAIL_VALUE);
            }
        };

        let permissions = self.authorizer().registry().permissions_of(&signer)?;
        if permissions.contains(Permission::Sign) {
            Ok(ERC1271_MAGIC_VALUE)
        } else {
            tracing::debug!(%signer, "signer lacks SIGN");
            Ok(ERC1271_FAIL_VALUE)
        }
    }

    fn dispatch(&self, payload: &[u8], value: U256) -> Result<Dispatched> {
        ExecutionDispatcher::new(&self.account, self.config.unwrap_call_results)
            .dispatch(payload, value)
    }
}
