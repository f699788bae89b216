//! Delegation chains: bounded-lifetime, transitively verifiable trust.
//!
//! A delegation is a signed statement that a target public key may act on
//! behalf of the signer until an expiration. A chain strings delegations
//! together so trust flows from a root identity, through the page's middle
//! key, down to the native client's session key. The chain is valid only
//! as a whole: one expired or unverifiable link invalidates it.

use crate::error::{HandoffError, HandoffResult};
use crate::keys::{SessionKeyPair, SessionPublicKey};
use chrono::{Duration, Utc};
use ed25519_dalek::{Signature, Verifier};
use sha2::{Digest, Sha256};

/// Domain separator for delegation signatures, length-prefixed.
const DELEGATION_DOMAIN: &[u8] = b"\x17handoff-auth-delegation";

/// Default lifetime of a delegation issued to a native client: 5 days.
pub fn default_delegation_ttl() -> Duration {
    Duration::days(5)
}

/// Current time as nanoseconds since the Unix epoch.
///
/// Saturates at `u64::MAX` past the representable range (year 2262).
pub fn now_ns() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map_or(u64::MAX, |n| n.max(0) as u64)
}

/// A single delegation statement: `pubkey` may act until `expiration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    /// DER-encoded public key being delegated to
    pub pubkey: Vec<u8>,
    /// Expiration, nanoseconds since the Unix epoch
    pub expiration: u64,
}

impl Delegation {
    /// The exact bytes a signer commits to for this delegation.
    ///
    /// Domain separator, then a SHA-256 digest over the canonical
    /// encoding of `(pubkey, expiration)`: length-prefixed key bytes
    /// followed by the big-endian expiration.
    pub(crate) fn signing_message(&self) -> Vec<u8> {
        let mut canonical = Vec::with_capacity(self.pubkey.len() + 16);
        canonical.extend_from_slice(&(self.pubkey.len() as u64).to_be_bytes());
        canonical.extend_from_slice(&self.pubkey);
        canonical.extend_from_slice(&self.expiration.to_be_bytes());
        let digest = Sha256::digest(&canonical);

        let mut message = Vec::with_capacity(DELEGATION_DOMAIN.len() + digest.len());
        message.extend_from_slice(DELEGATION_DOMAIN);
        message.extend_from_slice(&digest);
        message
    }

    /// Check expiry against a point in time. Expiration must be strictly
    /// in the future to pass.
    pub fn is_expired(&self, now_ns: u64) -> bool {
        self.expiration <= now_ns
    }
}

/// A delegation together with the signature over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDelegation {
    /// The statement that was signed
    pub delegation: Delegation,
    /// Ed25519 signature over [`Delegation::signing_message`]
    pub signature: Vec<u8>,
}

/// An ordered sequence of delegations plus the root verification key.
///
/// Link `i` is signed by the previous link's target key (link 0 by
/// `public_key`); the last link's target is the externally supplied
/// session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationChain {
    /// Delegations ordered root-first
    pub delegations: Vec<SignedDelegation>,
    /// DER-encoded public key of the chain's root signer
    pub public_key: Vec<u8>,
}

/// The signing capability a delegation chain is built with.
///
/// Implemented by [`SessionKeyPair`] for page-held middle keys; provider
/// integrations that keep keys in hardware can implement it themselves
/// and surface unavailability as [`HandoffError::Signing`].
pub trait DelegationSigner {
    /// DER-encoded public key the signature verifies against.
    fn public_key_der(&self) -> Vec<u8>;

    /// Sign the message, or fail with [`HandoffError::Signing`].
    fn sign(&self, message: &[u8]) -> HandoffResult<Vec<u8>>;
}

impl DelegationSigner for SessionKeyPair {
    fn public_key_der(&self) -> Vec<u8> {
        self.public_key().to_der()
    }

    fn sign(&self, message: &[u8]) -> HandoffResult<Vec<u8>> {
        Ok(self.sign_raw(message).to_bytes().to_vec())
    }
}

impl DelegationChain {
    /// Build a chain delegating from `signer` to `target`.
    ///
    /// The new link expires `ttl` from now (`ttl` must be positive). If
    /// the signer was itself authorized by a prior chain — the middle key
    /// holding a provider-issued delegation — pass it as `previous`; its
    /// links are prepended so the result verifies transitively from the
    /// true root down to `target`.
    ///
    /// The signer is borrowed, not consumed: building is repeatable for a
    /// renewed TTL without re-running the provider flow.
    pub fn create(
        signer: &dyn DelegationSigner,
        target: &SessionPublicKey,
        ttl: Duration,
        previous: Option<&DelegationChain>,
    ) -> HandoffResult<Self> {
        if ttl <= Duration::zero() {
            return Err(HandoffError::InvalidTtl);
        }
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or(HandoffError::InvalidTtl)?;
        let expiration = expires_at
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or(HandoffError::InvalidTtl)?;

        let delegation = Delegation {
            pubkey: target.to_der(),
            expiration,
        };
        let signature = signer.sign(&delegation.signing_message())?;

        let mut delegations = Vec::new();
        let public_key = match previous {
            Some(prev) => {
                delegations.extend(prev.delegations.iter().cloned());
                prev.public_key.clone()
            }
            None => signer.public_key_der(),
        };
        delegations.push(SignedDelegation {
            delegation,
            signature,
        });

        Ok(Self {
            delegations,
            public_key,
        })
    }

    /// DER bytes of the key the chain ultimately delegates to.
    pub fn session_public_key(&self) -> Option<&[u8]> {
        self.delegations.last().map(|s| s.delegation.pubkey.as_slice())
    }

    /// Validate the whole chain at the current time.
    pub fn verify(&self) -> HandoffResult<()> {
        self.verify_at(now_ns())
    }

    /// Validate the whole chain at a given time.
    ///
    /// Checks, in order for each link: expiration strictly in the future,
    /// signer key well-formed, signature valid under the signer key. The
    /// signer of link 0 is `public_key`; thereafter each link's target is
    /// the next link's signer.
    pub fn verify_at(&self, now_ns: u64) -> HandoffResult<()> {
        if self.delegations.is_empty() {
            return Err(HandoffError::InvalidChain("empty chain".to_string()));
        }

        let mut signer_der: &[u8] = &self.public_key;
        for signed in &self.delegations {
            let delegation = &signed.delegation;
            if delegation.is_expired(now_ns) {
                return Err(HandoffError::ExpiredDelegation {
                    expired_at: delegation.expiration,
                });
            }
            let signer_key = SessionPublicKey::from_der(signer_der)
                .map_err(|e| HandoffError::InvalidChain(format!("bad signer key: {e}")))?;
            let signature_bytes: [u8; 64] = signed
                .signature
                .as_slice()
                .try_into()
                .map_err(|_| HandoffError::InvalidChain("signature must be 64 bytes".to_string()))?;
            let signature = Signature::from_bytes(&signature_bytes);
            signer_key
                .verifying_key()
                .verify(&delegation.signing_message(), &signature)
                .map_err(|e| HandoffError::InvalidChain(e.to_string()))?;
            signer_der = &delegation.pubkey;
        }
        Ok(())
    }

    /// Validate the chain and require it to terminate at `target`.
    pub fn verify_for_target(
        &self,
        target: &SessionPublicKey,
        now_ns: u64,
    ) -> HandoffResult<()> {
        self.verify_at(now_ns)?;
        match self.session_public_key() {
            Some(leaf) if leaf == target.to_der().as_slice() => Ok(()),
            _ => Err(HandoffError::InvalidChain(
                "chain does not terminate at the session key".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> SessionKeyPair {
        SessionKeyPair::generate().unwrap()
    }

    #[test]
    fn test_single_link_chain_verifies() {
        let signer = pair();
        let target = pair().public_key();

        let chain =
            DelegationChain::create(&signer, &target, Duration::hours(1), None).unwrap();

        assert_eq!(chain.delegations.len(), 1);
        assert_eq!(chain.public_key, signer.public_key().to_der());
        assert_eq!(chain.session_public_key(), Some(target.to_der().as_slice()));
        chain.verify().unwrap();
        chain.verify_for_target(&target, now_ns()).unwrap();
    }

    #[test]
    fn test_expirations_are_strictly_in_the_future() {
        let signer = pair();
        let target = pair().public_key();
        let before = now_ns();

        let chain =
            DelegationChain::create(&signer, &target, Duration::seconds(1), None).unwrap();

        for signed in &chain.delegations {
            assert!(signed.delegation.expiration > before);
        }
    }

    #[test]
    fn test_two_link_chain_verifies_transitively() {
        let root = pair();
        let middle = pair();
        let session = pair().public_key();

        let provider_chain =
            DelegationChain::create(&root, &middle.public_key(), Duration::minutes(30), None)
                .unwrap();
        let chain = DelegationChain::create(
            &middle,
            &session,
            default_delegation_ttl(),
            Some(&provider_chain),
        )
        .unwrap();

        assert_eq!(chain.delegations.len(), 2);
        assert_eq!(chain.public_key, root.public_key().to_der());
        chain.verify_for_target(&session, now_ns()).unwrap();
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let signer = pair();
        let target = pair().public_key();

        let err =
            DelegationChain::create(&signer, &target, Duration::zero(), None).unwrap_err();

        assert!(matches!(err, HandoffError::InvalidTtl));
    }

    #[test]
    fn test_negative_ttl_is_rejected() {
        let signer = pair();
        let target = pair().public_key();

        let err = DelegationChain::create(&signer, &target, Duration::seconds(-5), None)
            .unwrap_err();

        assert!(matches!(err, HandoffError::InvalidTtl));
    }

    #[test]
    fn test_expired_link_fails_even_with_valid_signature() {
        let signer = pair();
        let target = pair().public_key();

        // Sign an already-expired delegation by hand; the signature itself
        // is genuine.
        let delegation = Delegation {
            pubkey: target.to_der(),
            expiration: now_ns() - 1,
        };
        let signature = signer.sign(&delegation.signing_message()).unwrap();
        let chain = DelegationChain {
            delegations: vec![SignedDelegation {
                delegation,
                signature,
            }],
            public_key: signer.public_key().to_der(),
        };

        let err = chain.verify().unwrap_err();
        assert!(matches!(err, HandoffError::ExpiredDelegation { .. }));
    }

    #[test]
    fn test_tampered_signature_invalidates_chain() {
        let signer = pair();
        let target = pair().public_key();

        let mut chain =
            DelegationChain::create(&signer, &target, Duration::hours(1), None).unwrap();
        chain.delegations[0].signature[0] ^= 0xff;

        let err = chain.verify().unwrap_err();
        assert!(matches!(err, HandoffError::InvalidChain(_)));
    }

    #[test]
    fn test_broken_link_invalidates_whole_chain() {
        let root = pair();
        let middle = pair();
        let stranger = pair();
        let session = pair().public_key();

        // Root delegates to a key the second link was NOT signed by.
        let provider_chain =
            DelegationChain::create(&root, &stranger.public_key(), Duration::minutes(30), None)
                .unwrap();
        let chain = DelegationChain::create(
            &middle,
            &session,
            Duration::hours(1),
            Some(&provider_chain),
        )
        .unwrap();

        let err = chain.verify().unwrap_err();
        assert!(matches!(err, HandoffError::InvalidChain(_)));
    }

    #[test]
    fn test_wrong_target_is_rejected() {
        let signer = pair();
        let target = pair().public_key();
        let other = pair().public_key();

        let chain =
            DelegationChain::create(&signer, &target, Duration::hours(1), None).unwrap();

        let err = chain.verify_for_target(&other, now_ns()).unwrap_err();
        assert!(matches!(err, HandoffError::InvalidChain(_)));
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let chain = DelegationChain {
            delegations: vec![],
            public_key: pair().public_key().to_der(),
        };
        assert!(matches!(
            chain.verify().unwrap_err(),
            HandoffError::InvalidChain(_)
        ));
    }

    #[test]
    fn test_building_is_repeatable_without_consuming_signer() {
        let signer = pair();
        let target = pair().public_key();

        let first =
            DelegationChain::create(&signer, &target, Duration::hours(1), None).unwrap();
        let renewed =
            DelegationChain::create(&signer, &target, Duration::hours(2), None).unwrap();

        first.verify().unwrap();
        renewed.verify().unwrap();
        assert!(
            renewed.delegations[0].delegation.expiration
                >= first.delegations[0].delegation.expiration
        );
    }
}
