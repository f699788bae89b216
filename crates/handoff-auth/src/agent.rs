//! Call-layer authentication context.
//!
//! After a fresh login the UI talks to the remote backend through a
//! generated stub; that stub is an external collaborator, but the
//! authentication context it signs calls with is built here, from the
//! [`RootIdentity`] this crate produced.

use crate::delegation::DelegationChain;
use crate::error::HandoffResult;
use crate::provider::{Principal, RootIdentity};
use async_trait::async_trait;

/// Everything a call layer needs to authenticate as the logged-in user.
#[derive(Debug, Clone)]
pub struct CallContext {
    principal: Principal,
    public_key: Vec<u8>,
    delegation: Option<DelegationChain>,
}

impl CallContext {
    /// The authenticated user's handle.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// DER bytes of the identity's root public key.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key
    }

    /// The delegation chain backing this context, if any.
    pub fn delegation_chain(&self) -> Option<&DelegationChain> {
        self.delegation.as_ref()
    }
}

impl From<&RootIdentity> for CallContext {
    fn from(identity: &RootIdentity) -> Self {
        Self {
            principal: identity.principal().clone(),
            public_key: identity.public_key_der().to_vec(),
            delegation: identity.delegation_chain().cloned(),
        }
    }
}

/// The opaque backend call surface the UI invokes after login.
///
/// Business endpoints are the backend's concern; this crate only
/// requires that the wire layer can answer "who am I" for a context it
/// built.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The principal the backend sees for this call context.
    async fn whoami(&self, ctx: &CallContext) -> HandoffResult<Principal>;
}
