//! The identity-provider seam.
//!
//! The provider itself is an external collaborator reached by full-page
//! redirect; this module defines what the rest of the crate needs from
//! it: an async [`IdentityProvider::authorize`] that resolves to a
//! [`RootIdentity`] with stable accessors. Integrations must surface the
//! delegation chain and raw public key through those accessors rather
//! than letting callers reach into provider-library internals.

use crate::delegation::DelegationChain;
use crate::error::HandoffResult;
use crate::keys::SessionPublicKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stable, opaque user handle assigned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap a provider-assigned handle.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The textual form of the handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity returned by the provider after interactive login.
///
/// Lives in page memory for the duration of the session; never
/// persisted. In delegated mode it carries the provider-issued chain
/// ending at the anchor key it was asked to authorize.
#[derive(Debug, Clone)]
pub struct RootIdentity {
    principal: Principal,
    public_key: Vec<u8>,
    delegation: Option<DelegationChain>,
}

impl RootIdentity {
    /// Assemble an identity from a provider integration's callback data.
    pub fn new(
        principal: Principal,
        public_key: Vec<u8>,
        delegation: Option<DelegationChain>,
    ) -> Self {
        Self {
            principal,
            public_key,
            delegation,
        }
    }

    /// The stable user handle.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// DER bytes of the identity's root public key.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key
    }

    /// The provider-issued delegation chain, if this identity holds one.
    pub fn delegation_chain(&self) -> Option<&DelegationChain> {
        self.delegation.as_ref()
    }
}

/// An interactive identity provider.
///
/// `authorize` spans the redirect/resume boundary: it resolves when the
/// provider's callback reports success, fails with
/// [`crate::HandoffError::Provider`] when it reports failure, and simply
/// never resolves if the user abandons the flow — timeout policy belongs
/// to the enclosing UI, not to this crate.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive flow, anchoring the resulting identity's
    /// delegation to `anchor`.
    async fn authorize(&self, anchor: &SessionPublicKey) -> HandoffResult<RootIdentity>;
}


#[cfg(test)]
mod tests {
    use super::testing::StubProvider;
    use super::*;
    use crate::delegation::now_ns;
    use crate::keys::SessionKeyPair;

    #[tokio::test]
    async fn test_identity_exposes_chain_through_accessors() {
        let provider = StubProvider::new();
        let anchor = SessionKeyPair::generate().unwrap().public_key();

        let identity = provider.authorize(&anchor).await.unwrap();

        assert!(!identity.principal().as_str().is_empty());
        assert_eq!(identity.public_key_der().len(), anchor.to_der().len());
        let chain = identity.delegation_chain().expect("chain issued");
        chain.verify_for_target(&anchor, now_ns()).unwrap();
    }

    #[test]
    fn test_principal_display_matches_handle() {
        let principal = Principal::new("w7x-principal");
        assert_eq!(principal.to_string(), "w7x-principal");
        assert_eq!(principal.as_str(), "w7x-principal");
    }
}
