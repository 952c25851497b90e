//! Relay call authentication.
//!
//! A relayed request carries a signature instead of a direct sender. The
//! signer is recovered from the signature over the key manager's identity,
//! the presented nonce index and the payload. Each signer has independent
//! counters per channel; a request is accepted only with the current
//! counter of its channel, which then advances by one.

use keymanager_core::{recover_signer, relay_digest, Address, NonceIndex, U256};
use keymanager_store::NonceStore;

use crate::error::{KeyManagerError, NonceRejection, Result};

/// A verified relay signature whose nonce has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayAuthentication {
    /// The recovered signer, acting as the request's caller.
    pub signer: Address,
    /// The nonce index the signer presented.
    pub nonce: NonceIndex,
    /// The index the signer must present next on the same channel.
    pub next: NonceIndex,
}

/// Checks relay signatures against per-channel nonces.
pub struct RelayAuthenticator<N> {
    identity: Address,
    nonces: N,
}

impl<N: NonceStore> RelayAuthenticator<N> {
    /// Create an authenticator for the key manager at `identity`.
    pub fn new(identity: Address, nonces: N) -> Self {
        Self { identity, nonces }
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn nonces(&self) -> &N {
        &self.nonces
    }

    /// The nonce index `signer` must present next on `channel`.
    pub fn get_nonce(&self, signer: &Address, channel: u128) -> Result<U256> {
        let counter = self.nonces.nonce(signer, channel)?;
        Ok(NonceIndex::new(channel, counter).to_u256())
    }

    /// Verify a relayed request and consume its nonce.
    ///
    /// The signer is recovered over the target the caller claims. A
    /// signature bound to another key manager is refused as an invalid
    /// nonce, like a stale counter.
    pub fn authenticate(
        &self,
        claimed_target: &Address,
        nonce: U256,
        payload: &[u8],
        signature: &[u8],
    ) -> Result<RelayAuthentication> {
        let digest = relay_digest(claimed_target, nonce, payload);
        let signer = recover_signer(&digest, signature)?;
        let rejected = |reason: NonceRejection| KeyManagerError::InvalidNonce {
            signer,
            nonce,
            reason,
        };

        if *claimed_target != self.identity {
            tracing::warn!(
                %signer,
                claimed = %claimed_target,
                identity = %self.identity,
                "relay call addressed to another key manager"
            );
            return Err(rejected(NonceRejection::WrongTarget {
                claimed: *claimed_target,
            }));
        }

        let index = NonceIndex::from_u256(nonce);
        let current = self.nonces.nonce(&signer, index.channel)?;
        if current != index.counter {
            tracing::warn!(
                %signer,
                channel = index.channel,
                expected = current,
                presented = index.counter,
                "relay nonce mismatch"
            );
            return Err(rejected(NonceRejection::Stale { expected: current }));
        }

        let next = current
            .checked_add(1)
            .ok_or(KeyManagerError::NonceOverflow {
                signer,
                channel: index.channel,
            })?;
        if !self
            .nonces
            .compare_and_set_nonce(&signer, index.channel, current, next)?
        {
            tracing::warn!(%signer, channel = index.channel, "relay nonce consumed concurrently");
            return Err(rejected(NonceRejection::Consumed));
        }

        tracing::debug!(%signer, channel = index.channel, counter = current, "relay call authenticated");
        Ok(RelayAuthentication {
            signer,
            nonce: index,
            next: NonceIndex::new(index.channel, next),
        })
    }

    /// Restore the counter consumed by `authentication`.
    ///
    /// Only undoes this authentication's own increment: if the counter has
    /// moved past `next` meanwhile, it is left alone and
    /// [`KeyManagerError::NonceRollbackConflict`] is returned.
    pub fn rollback(&self, authentication: &RelayAuthentication) -> Result<()> {
        let RelayAuthentication { signer, nonce, next } = *authentication;
        if !self
            .nonces
            .compare_and_set_nonce(&signer, nonce.channel, next.counter, nonce.counter)?
        {
            return Err(KeyManagerError::NonceRollbackConflict {
                signer,
                channel: nonce.channel,
                counter: next.counter,
            });
        }
        tracing::debug!(%signer, channel = nonce.channel, "relay nonce restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymanager_core::Signer;
    use keymanager_store::MemoryStore;
    use proptest::prelude::*;

    const IDENTITY: Address = Address::repeat_byte(0x4b);
    const PAYLOAD: &[u8] = &[0xf2, 0xfd, 0xe3, 0x8b];

    fn signer() -> Signer {
        Signer::from_seed(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_consumes_nonce_once() {
        let relay = RelayAuthenticator::new(IDENTITY, MemoryStore::new());
        let signer = signer();
        let nonce = relay.get_nonce(&signer.address(), 0).unwrap();
        assert_eq!(nonce, U256::ZERO);

        let signature = signer.sign_relay_call(&IDENTITY, nonce, PAYLOAD).unwrap();
        let auth = relay
            .authenticate(&IDENTITY, nonce, PAYLOAD, &signature)
            .unwrap();
        assert_eq!(auth.signer, signer.address());
        assert_eq!(auth.next, NonceIndex::new(0, 1));
        assert_eq!(auth.next.to_u256(), relay.get_nonce(&signer.address(), 0).unwrap());
        assert_eq!(relay.get_nonce(&signer.address(), 0).unwrap(), U256::from(1u8));

        assert!(matches!(
            relay.authenticate(&IDENTITY, nonce, PAYLOAD, &signature),
            Err(KeyManagerError::InvalidNonce {
                reason: NonceRejection::Stale { expected: 1 },
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_other_target() {
        let relay = RelayAuthenticator::new(IDENTITY, MemoryStore::new());
        let signer = signer();
        let other = Address::repeat_byte(0x99);
        let signature = signer.sign_relay_call(&other, U256::ZERO, PAYLOAD).unwrap();
        assert!(matches!(
            relay.authenticate(&other, U256::ZERO, PAYLOAD, &signature),
            Err(KeyManagerError::InvalidNonce {
                signer: s,
                reason: NonceRejection::WrongTarget { claimed },
                ..
            }) if claimed == other && s == signer.address()
        ));
        assert_eq!(relay.get_nonce(&signer.address(), 0).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_tampered_payload_recovers_someone_else() {
        let relay = RelayAuthenticator::new(IDENTITY, MemoryStore::new());
        let signer = signer();
        let signature = signer.sign_relay_call(&IDENTITY, U256::ZERO, PAYLOAD).unwrap();
        let auth = relay
            .authenticate(&IDENTITY, U256::ZERO, &[0xde, 0xad, 0xbe, 0xef], &signature)
            .unwrap();
        assert_ne!(auth.signer, signer.address());
        assert_eq!(relay.get_nonce(&signer.address(), 0).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_channels_are_independent() {
        let relay = RelayAuthenticator::new(IDENTITY, MemoryStore::new());
        let signer = signer();
        let on_five = NonceIndex::new(5, 0).to_u256();
        let signature = signer.sign_relay_call(&IDENTITY, on_five, PAYLOAD).unwrap();
        relay
            .authenticate(&IDENTITY, on_five, PAYLOAD, &signature)
            .unwrap();

        assert_eq!(
            relay.get_nonce(&signer.address(), 5).unwrap(),
            NonceIndex::new(5, 1).to_u256()
        );
        assert_eq!(relay.get_nonce(&signer.address(), 0).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_rollback_restores_counter() {
        let relay = RelayAuthenticator::new(IDENTITY, MemoryStore::new());
        let signer = signer();
        let signature = signer.sign_relay_call(&IDENTITY, U256::ZERO, PAYLOAD).unwrap();
        let auth = relay
            .authenticate(&IDENTITY, U256::ZERO, PAYLOAD, &signature)
            .unwrap();
        relay.rollback(&auth).unwrap();
        assert_eq!(relay.get_nonce(&signer.address(), 0).unwrap(), U256::ZERO);
        assert!(relay
            .authenticate(&IDENTITY, U256::ZERO, PAYLOAD, &signature)
            .is_ok());
    }

    #[test]
    fn test_rollback_leaves_a_later_consumption_alone() {
        let store = MemoryStore::new();
        let relay = RelayAuthenticator::new(IDENTITY, &store);
        let signer = signer();
        let first = relay
            .authenticate(
                &IDENTITY,
                U256::ZERO,
                PAYLOAD,
                &signer.sign_relay_call(&IDENTITY, U256::ZERO, PAYLOAD).unwrap(),
            )
            .unwrap();
        let second = NonceIndex::new(0, 1).to_u256();
        relay
            .authenticate(
                &IDENTITY,
                second,
                PAYLOAD,
                &signer.sign_relay_call(&IDENTITY, second, PAYLOAD).unwrap(),
            )
            .unwrap();

        assert!(matches!(
            relay.rollback(&first),
            Err(KeyManagerError::NonceRollbackConflict { channel: 0, counter: 1, .. })
        ));
        assert_eq!(store.nonce(&signer.address(), 0).unwrap(), 2);
    }

    #[test]
    fn test_counter_overflow() {
        let store = MemoryStore::new();
        let signer = signer();
        store.set_nonce(&signer.address(), 0, u128::MAX).unwrap();
        let relay = RelayAuthenticator::new(IDENTITY, &store);
        let nonce = NonceIndex::new(0, u128::MAX).to_u256();
        let signature = signer.sign_relay_call(&IDENTITY, nonce, PAYLOAD).unwrap();
        assert!(matches!(
            relay.authenticate(&IDENTITY, nonce, PAYLOAD, &signature),
            Err(KeyManagerError::NonceOverflow { channel: 0, .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_only_current_counter_accepted(channel in any::<u128>(), counter in 1u128..1000) {
            let relay = RelayAuthenticator::new(IDENTITY, MemoryStore::new());
            let signer = signer();
            let nonce = NonceIndex::new(channel, counter).to_u256();
            let signature = signer.sign_relay_call(&IDENTITY, nonce, PAYLOAD).unwrap();
            let rejected = matches!(
                relay.authenticate(&IDENTITY, nonce, PAYLOAD, &signature),
                Err(KeyManagerError::InvalidNonce { .. })
            );
            prop_assert!(rejected);
            prop_assert_eq!(
                relay.get_nonce(&signer.address(), channel).unwrap(),
                NonceIndex::new(channel, 0).to_u256()
            );
        }
    }
}
