//! Incoming request parsing.
//!
//! A native client that wants a delegated session opens the page with its
//! own query parameters: `sessionkey` (hex DER public key, whose presence
//! selects delegated-login mode) plus `scheme` and `host` (where the
//! handoff redirect must return to). The redirect target is always taken
//! verbatim from the request that started the flow — never from a
//! default — so credentials can only be delivered back to the caller.

use crate::error::{HandoffError, HandoffResult};
use crate::keys::SessionPublicKey;
use url::Url;

/// Query parameter carrying the native client's session public key.
pub const SESSION_KEY_PARAM: &str = "sessionkey";
/// Query parameter carrying the redirect scheme.
pub const SCHEME_PARAM: &str = "scheme";
/// Query parameter carrying the redirect host.
pub const HOST_PARAM: &str = "host";

/// Where a completed handoff redirects to: `<scheme>://<host>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    scheme: String,
    host: String,
}

impl RedirectTarget {
    /// Build a target from the incoming request's own parameters.
    ///
    /// Empty components are treated as absent; there is deliberately no
    /// default destination.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> HandoffResult<Self> {
        let scheme = scheme.into();
        let host = host.into();
        if scheme.is_empty() {
            return Err(HandoffError::MissingRedirectTarget(SCHEME_PARAM));
        }
        if host.is_empty() {
            return Err(HandoffError::MissingRedirectTarget(HOST_PARAM));
        }
        Ok(Self { scheme, host })
    }

    /// The custom URL scheme of the requesting client.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host component of the requesting client's callback.
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// The login mode selected by the incoming request.
#[derive(Debug, Clone)]
pub enum LoginRequest {
    /// No session key present: in-app login, the root identity is used
    /// directly.
    Fresh,
    /// A native client supplied its session key and a redirect target:
    /// the flow ends with a delegation handoff.
    Delegated {
        /// The requesting client's public key the chain is issued to
        session_key: SessionPublicKey,
        /// Where the handoff redirect returns control to
        target: RedirectTarget,
    },
}

impl LoginRequest {
    /// Parse the page URL's query parameters.
    ///
    /// `sessionkey` absent (or empty) selects [`LoginRequest::Fresh`].
    /// When present, `scheme` and `host` are required together; a missing
    /// one is [`HandoffError::MissingRedirectTarget`], and a key that
    /// fails hex/DER parsing is [`HandoffError::MalformedKey`].
    pub fn from_url(url: &Url) -> HandoffResult<Self> {
        let mut session_key_hex = None;
        let mut scheme = None;
        let mut host = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                SESSION_KEY_PARAM => session_key_hex = Some(value.into_owned()),
                SCHEME_PARAM => scheme = Some(value.into_owned()),
                HOST_PARAM => host = Some(value.into_owned()),
                _ => {}
            }
        }

        let Some(key_hex) = session_key_hex.filter(|k| !k.is_empty()) else {
            return Ok(Self::Fresh);
        };

        let session_key = SessionPublicKey::from_hex(&key_hex)?;
        let scheme = scheme.ok_or(HandoffError::MissingRedirectTarget(SCHEME_PARAM))?;
        let host = host.ok_or(HandoffError::MissingRedirectTarget(HOST_PARAM))?;
        let target = RedirectTarget::new(scheme, host)?;

        Ok(Self::Delegated {
            session_key,
            target,
        })
    }

    /// Whether this request ends in a delegation handoff.
    pub fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated { .. })
    }
}
