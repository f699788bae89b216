//! # Delegated-Identity Session Handoff
//!
//! This crate implements the client side of a delegated-identity
//! authentication handshake: a page generates an ephemeral key pair,
//! runs an interactive login against an identity provider, builds a
//! bounded-lifetime delegation chain down to a *different* caller's
//! session key, and hands that chain back to the caller via a
//! scheme-based URL redirect — while guarding against replay, expiry,
//! and origin confusion.
//!
//! ## Overview
//!
//! The handoff-auth crate handles:
//! - **Key material**: ephemeral Ed25519 session key pairs, DER/hex
//!   transport encodings
//! - **Provider flow**: the async seam to an interactive identity
//!   provider, fresh vs delegated entry modes
//! - **Delegation chains**: construction with a 5-day default TTL and
//!   whole-chain verification
//! - **Handoff encoding**: the `del=` redirect payload and its
//!   loss-free round trip through URL encoding
//! - **Session state**: the `Unauthenticated → AwaitingProvider →
//!   Authenticated / HandoffEmitted / Failed` machine UI collaborators
//!   drive
//!
//! ## Usage
//!
//! ### Building a handoff by hand
//!
//! ```rust,no_run
//! use handoff_auth::{DelegationChain, HandoffPayload, RedirectTarget, SessionKeyPair};
//! use chrono::Duration;
//!
//! # fn main() -> handoff_auth::HandoffResult<()> {
//! // The native client's session key arrives as hex DER in the query
//! // string; here we stand in for it with a generated one.
//! let session_key = SessionKeyPair::generate()?.public_key();
//! let middle = SessionKeyPair::generate()?;
//!
//! let chain = DelegationChain::create(&middle, &session_key, Duration::days(5), None)?;
//! let payload = HandoffPayload::encode(&chain);
//!
//! // scheme and host come from the incoming request, never a default.
//! let target = RedirectTarget::new("myapp", "auth")?;
//! let redirect = payload.to_redirect_url(&target)?;
//! # let _ = redirect;
//! # Ok(())
//! # }
//! ```
//!
//! ### Driving the full flow
//!
//! Parse the page URL into a [`LoginRequest`], hand it to a
//! [`SessionController`] together with an [`IdentityProvider`]
//! integration, and await [`SessionController::login`]; the outcome is
//! either a usable principal (fresh mode) or a redirect URL to navigate
//! to (delegated mode).
//!
//! ## Security posture
//!
//! - The redirect destination is always the caller's own `scheme`/`host`
//!   query parameters; a request without them fails rather than falling
//!   back to a default destination.
//! - Private keys never leave the page; the session's private half never
//!   signs application data in this flow.
//! - A chain is valid only as a whole: one expired or unverifiable link
//!   invalidates it.
//! - Nothing retries automatically; every failure requires a fresh,
//!   explicit login trigger.

pub mod agent;
pub mod delegation;
pub mod error;
pub mod handoff;
pub mod keys;
pub mod provider;
pub mod request;
pub mod session;

// Re-export main types
pub use agent::{Backend, CallContext};
pub use delegation::{
    default_delegation_ttl, Delegation, DelegationChain, DelegationSigner, SignedDelegation,
};
pub use error::{HandoffError, HandoffResult};
pub use handoff::{HandoffPayload, WireDelegation, WireSignedDelegation};
pub use keys::{SessionKeyPair, SessionPublicKey};
pub use provider::{IdentityProvider, Principal, RootIdentity};
pub use request::{LoginRequest, RedirectTarget};
pub use session::{LoginOutcome, SessionController, SessionState};
