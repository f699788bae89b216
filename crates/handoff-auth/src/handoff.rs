//! Cross-origin handoff encoding.
//!
//! The completed delegation chain leaves the page exactly once, as a URL
//! redirect back to the native client that initiated the flow:
//! `<scheme>://<host>?del=<url-encoded JSON>&status=true`. Key material
//! and signatures travel as hex; expirations travel as decimal strings so
//! 64-bit nanosecond timestamps survive JSON number precision limits.

use crate::delegation::{Delegation, DelegationChain, SignedDelegation};
use crate::error::{HandoffError, HandoffResult};
use crate::request::RedirectTarget;
use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameter carrying the payload on the outgoing redirect.
pub const DELEGATION_PARAM: &str = "del";

/// Wire form of a [`Delegation`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireDelegation {
    /// Expiration as a decimal string of nanoseconds since epoch
    pub expiration: String,
    /// Hex-encoded DER public key
    pub pubkey: String,
}

/// Wire form of a [`SignedDelegation`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireSignedDelegation {
    /// The delegated statement
    pub delegation: WireDelegation,
    /// Hex-encoded signature
    pub signature: String,
}

/// The externally-facing handoff artifact.
///
/// Created once per successful authentication and transmitted once via
/// redirect; what happens next is the receiving client's concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandoffPayload {
    /// The chain's links, root-first
    pub delegations: Vec<WireSignedDelegation>,
    /// Hex-encoded DER key of the chain's root signer
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// Always `true` on a successfully emitted handoff
    pub status: bool,
}

impl HandoffPayload {
    /// Serialize a chain into its wire form.
    pub fn encode(chain: &DelegationChain) -> Self {
        Self {
            delegations: chain
                .delegations
                .iter()
                .map(|signed| WireSignedDelegation {
                    delegation: WireDelegation {
                        expiration: signed.delegation.expiration.to_string(),
                        pubkey: hex::encode(&signed.delegation.pubkey),
                    },
                    signature: hex::encode(&signed.signature),
                })
                .collect(),
            public_key: hex::encode(&chain.public_key),
            status: true,
        }
    }

    /// Reconstruct the chain from its wire form, validating every field.
    pub fn decode(&self) -> HandoffResult<DelegationChain> {
        let mut delegations = Vec::with_capacity(self.delegations.len());
        for wire in &self.delegations {
            let expiration = wire.delegation.expiration.parse::<u64>().map_err(|e| {
                HandoffError::InvalidChain(format!(
                    "invalid expiration '{}': {e}",
                    wire.delegation.expiration
                ))
            })?;
            let pubkey = hex::decode(&wire.delegation.pubkey)
                .map_err(|e| HandoffError::MalformedKey(format!("invalid pubkey hex: {e}")))?;
            let signature = hex::decode(&wire.signature)
                .map_err(|e| HandoffError::InvalidChain(format!("invalid signature hex: {e}")))?;
            delegations.push(SignedDelegation {
                delegation: Delegation { pubkey, expiration },
                signature,
            });
        }
        let public_key = hex::decode(&self.public_key)
            .map_err(|e| HandoffError::MalformedKey(format!("invalid publicKey hex: {e}")))?;
        Ok(DelegationChain {
            delegations,
            public_key,
        })
    }

    /// Build the outgoing redirect URL for this payload.
    ///
    /// `target` comes from the incoming request's own query parameters
    /// (see [`RedirectTarget`]); its constructor is the only way to
    /// obtain one, so a missing scheme/host has already failed loudly
    /// before this point.
    pub fn to_redirect_url(&self, target: &RedirectTarget) -> HandoffResult<Url> {
        let json = serde_json::to_string(self)
            .map_err(|e| HandoffError::Serialization(e.to_string()))?;
        let encoded: String = url::form_urlencoded::byte_serialize(json.as_bytes()).collect();
        let raw = format!(
            "{}://{}?{}={}&status=true",
            target.scheme(),
            target.host(),
            DELEGATION_PARAM,
            encoded
        );
        Url::parse(&raw).map_err(|e| HandoffError::Serialization(format!("redirect url: {e}")))
    }

    /// Parse a payload back out of a redirect URL (the receiving side).
    pub fn from_redirect_url(url: &Url) -> HandoffResult<Self> {
        let del = url
            .query_pairs()
            .find(|(name, _)| name == DELEGATION_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                HandoffError::Serialization(format!("missing {DELEGATION_PARAM} parameter"))
            })?;
        serde_json::from_str(&del).map_err(|e| HandoffError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegation::{default_delegation_ttl, now_ns};
    use crate::keys::SessionKeyPair;
    use chrono::Duration;

    fn two_link_chain() -> (DelegationChain, SessionKeyPair) {
        let root = SessionKeyPair::generate().unwrap();
        let middle = SessionKeyPair::generate().unwrap();
        let session = SessionKeyPair::generate().unwrap();

        let provider_chain = DelegationChain::create(
            &root,
            &middle.public_key(),
            Duration::minutes(30),
            None,
        )
        .unwrap();
        let chain = DelegationChain::create(
            &middle,
            &session.public_key(),
            default_delegation_ttl(),
            Some(&provider_chain),
        )
        .unwrap();
        (chain, session)
    }

    #[test]
    fn test_encode_sets_status() {
        let (chain, _) = two_link_chain();
        let payload = HandoffPayload::encode(&chain);
        assert!(payload.status);
        assert_eq!(payload.delegations.len(), 2);
    }

    #[test]
    fn test_round_trip_through_redirect_url() {
        let (chain, session) = two_link_chain();
        let payload = HandoffPayload::encode(&chain);
        let target = RedirectTarget::new("myapp", "auth").unwrap();

        let url = payload.to_redirect_url(&target).unwrap();
        assert!(url.as_str().starts_with("myapp://auth?del="));
        assert!(url.as_str().ends_with("&status=true"));

        let parsed = HandoffPayload::from_redirect_url(&url).unwrap();
        assert_eq!(parsed, payload);

        let restored = parsed.decode().unwrap();
        assert_eq!(restored, chain);
        restored
            .verify_for_target(&session.public_key(), now_ns())
            .unwrap();
    }

    #[test]
    fn test_decode_is_independent_of_json_key_order() {
        let (chain, _) = two_link_chain();
        let payload = HandoffPayload::encode(&chain);
        let first = &payload.delegations[0];

        // Same payload, keys deliberately reordered.
        let json = format!(
            r#"{{"status":true,"publicKey":"{}","delegations":[{{"signature":"{}","delegation":{{"pubkey":"{}","expiration":"{}"}}}},{{"signature":"{}","delegation":{{"pubkey":"{}","expiration":"{}"}}}}]}}"#,
            payload.public_key,
            first.signature,
            first.delegation.pubkey,
            first.delegation.expiration,
            payload.delegations[1].signature,
            payload.delegations[1].delegation.pubkey,
            payload.delegations[1].delegation.expiration,
        );

        let reordered: HandoffPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(reordered, payload);
        assert_eq!(reordered.decode().unwrap(), chain);
    }

    #[test]
    fn test_expiration_survives_beyond_f64_precision() {
        // 2^53 + 1 is not representable as an f64; the decimal-string
        // encoding must carry it exactly.
        let exact: u64 = 9_007_199_254_740_993;
        let wire = WireSignedDelegation {
            delegation: WireDelegation {
                expiration: exact.to_string(),
                pubkey: hex::encode(
                    SessionKeyPair::generate().unwrap().public_key().to_der(),
                ),
            },
            signature: hex::encode([0u8; 64]),
        };
        let payload = HandoffPayload {
            delegations: vec![wire],
            public_key: hex::encode(
                SessionKeyPair::generate().unwrap().public_key().to_der(),
            ),
            status: true,
        };

        let decoded = payload.decode().unwrap();
        assert_eq!(decoded.delegations[0].delegation.expiration, exact);
        assert_eq!(
            HandoffPayload::encode(&decoded).delegations[0]
                .delegation
                .expiration,
            exact.to_string()
        );
    }

    #[test]
    fn test_non_decimal_expiration_is_rejected() {
        let (chain, _) = two_link_chain();
        let mut payload = HandoffPayload::encode(&chain);
        payload.delegations[0].delegation.expiration = "soon".to_string();

        assert!(matches!(
            payload.decode().unwrap_err(),
            HandoffError::InvalidChain(_)
        ));
    }

    #[test]
    fn test_bad_hex_in_payload_is_rejected() {
        let (chain, _) = two_link_chain();
        let mut payload = HandoffPayload::encode(&chain);
        payload.delegations[0].delegation.pubkey = "xyz".to_string();

        assert!(matches!(
            payload.decode().unwrap_err(),
            HandoffError::MalformedKey(_)
        ));
    }

    #[test]
    fn test_url_without_del_parameter_is_rejected() {
        let url = Url::parse("myapp://auth?status=true").unwrap();
        assert!(matches!(
            HandoffPayload::from_redirect_url(&url).unwrap_err(),
            HandoffError::Serialization(_)
        ));
    }

    #[test]
    fn test_missing_host_produces_no_url() {
        // The only way to a redirect URL is through RedirectTarget, which
        // refuses an absent host outright.
        let err = RedirectTarget::new("myapp", "").unwrap_err();
        assert!(matches!(err, HandoffError::MissingRedirectTarget("host")));
    }
}
