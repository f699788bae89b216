//! The client-visible session state machine.
//!
//! One [`SessionController`] per page instance owns the attempt state,
//! the cached identity, and the ephemeral key material — an explicit
//! session context with `login` / `logout` / `state` operations rather
//! than ambient globals. The provider redirect is awaited as an async
//! operation; the lock over the state is never held across that await,
//! which is what lets a concurrent login be rejected instead of
//! interleaved.

use crate::delegation::{default_delegation_ttl, DelegationChain};
use crate::error::{HandoffError, HandoffResult};
use crate::handoff::HandoffPayload;
use crate::keys::SessionKeyPair;
use crate::provider::{IdentityProvider, Principal};
use crate::request::LoginRequest;
use chrono::Duration;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

/// One state per authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state; also the state after logout or acknowledged failure
    Unauthenticated,
    /// A login was triggered and the provider round trip is outstanding
    AwaitingProvider,
    /// Fresh-login success: the root identity is usable in-page
    Authenticated {
        /// The authenticated user's handle
        principal: Principal,
    },
    /// Delegated-login success: the redirect was produced.
    ///
    /// Terminal for the attempt — a later login starts over with fresh
    /// key material.
    HandoffEmitted,
    /// The attempt failed; acknowledge (or logout) to start over
    Failed {
        /// Human-readable failure reason
        reason: String,
    },
}

/// What a successful [`SessionController::login`] produced.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Fresh mode: the identity is usable directly
    Authenticated {
        /// The authenticated user's handle
        principal: Principal,
    },
    /// Delegated mode: navigate to this URL to complete the handoff
    HandoffReady {
        /// `<scheme>://<host>?del=...&status=true`
        redirect: Url,
    },
}

struct SessionInner {
    state: SessionState,
    identity: Option<crate::provider::RootIdentity>,
    app_key: Option<SessionKeyPair>,
    chain: Option<DelegationChain>,
    attempt: Option<Uuid>,
}

impl SessionInner {
    fn clear(&mut self) {
        self.state = SessionState::Unauthenticated;
        self.identity = None;
        self.app_key = None;
        self.chain = None;
        self.attempt = None;
    }
}

/// Drives the authentication flow for one page instance.
///
/// Generic over the provider integration. The login mode is fixed at
/// construction from the incoming request: fresh mode is idempotent
/// while authenticated; delegated mode is one-shot per attempt.
pub struct SessionController<P: IdentityProvider> {
    provider: P,
    request: LoginRequest,
    ttl: Duration,
    inner: Mutex<SessionInner>,
}

impl<P: IdentityProvider> SessionController<P> {
    /// Create a controller with the default delegation TTL (5 days).
    pub fn new(provider: P, request: LoginRequest) -> Self {
        Self::with_ttl(provider, request, default_delegation_ttl())
    }

    /// Create a controller with an explicit delegation TTL.
    pub fn with_ttl(provider: P, request: LoginRequest, ttl: Duration) -> Self {
        Self {
            provider,
            request,
            ttl,
            inner: Mutex::new(SessionInner {
                state: SessionState::Unauthenticated,
                identity: None,
                app_key: None,
                chain: None,
                attempt: None,
            }),
        }
    }

    /// Run one authentication attempt.
    ///
    /// Only one attempt may be outstanding at a time: a login while the
    /// provider round trip is pending fails with
    /// [`HandoffError::AlreadyInProgress`] and leaves the pending attempt
    /// untouched (this controller rejects rather than coalesces). All
    /// other errors move the state machine to [`SessionState::Failed`].
    pub async fn login(&self) -> HandoffResult<LoginOutcome> {
        let attempt = Uuid::now_v7();

        // Claim the attempt and stage fresh key material.
        let anchor = {
            let mut inner = self.inner.lock().await;
            match &inner.state {
                SessionState::AwaitingProvider => {
                    return Err(HandoffError::AlreadyInProgress);
                }
                SessionState::Authenticated { principal } if !self.request.is_delegated() => {
                    tracing::debug!(principal = %principal, "already authenticated");
                    return Ok(LoginOutcome::Authenticated {
                        principal: principal.clone(),
                    });
                }
                _ => {}
            }
            let key = SessionKeyPair::generate()?;
            let anchor = key.public_key();
            inner.clear();
            inner.app_key = Some(key);
            inner.state = SessionState::AwaitingProvider;
            inner.attempt = Some(attempt);
            anchor
        };

        tracing::debug!(
            attempt = %attempt,
            delegated = self.request.is_delegated(),
            "starting provider authorization"
        );

        // The redirect/resume boundary; the state lock is not held here.
        let authorized = self.provider.authorize(&anchor).await;

        let mut inner = self.inner.lock().await;
        if inner.attempt != Some(attempt) {
            // logout() superseded this attempt while the provider was
            // pending; the late result must not resurrect the session.
            tracing::debug!(attempt = %attempt, "discarding superseded provider result");
            return Err(HandoffError::Provider("attempt superseded".to_string()));
        }

        let identity = match authorized {
            Ok(identity) => identity,
            Err(err) => {
                self.fail(&mut inner, &err);
                return Err(err);
            }
        };

        match &self.request {
            LoginRequest::Fresh => {
                let principal = identity.principal().clone();
                inner.identity = Some(identity);
                inner.state = SessionState::Authenticated {
                    principal: principal.clone(),
                };
                inner.attempt = None;
                tracing::info!(attempt = %attempt, principal = %principal, "authenticated");
                Ok(LoginOutcome::Authenticated { principal })
            }
            LoginRequest::Delegated {
                session_key,
                target,
            } => {
                let built: HandoffResult<(DelegationChain, Url)> = (|| {
                    let middle = inner.app_key.as_ref().ok_or_else(|| {
                        HandoffError::Signing("middle key material missing".to_string())
                    })?;
                    let chain = DelegationChain::create(
                        middle,
                        session_key,
                        self.ttl,
                        identity.delegation_chain(),
                    )?;
                    let payload = HandoffPayload::encode(&chain);
                    let redirect = payload.to_redirect_url(target)?;
                    Ok((chain, redirect))
                })();

                match built {
                    Ok((chain, redirect)) => {
                        inner.chain = Some(chain);
                        inner.identity = Some(identity);
                        inner.state = SessionState::HandoffEmitted;
                        inner.attempt = None;
                        tracing::info!(attempt = %attempt, "handoff redirect ready");
                        Ok(LoginOutcome::HandoffReady { redirect })
                    }
                    Err(err) => {
                        self.fail(&mut inner, &err);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Clear the session: identity, key material, and any built chain.
    ///
    /// Safe to call from any state, including while a provider round
    /// trip is pending — the late result is then discarded.
    pub async fn logout(&self) {
        let mut inner = self.inner.lock().await;
        inner.clear();
        tracing::debug!("session cleared");
    }

    /// Acknowledge a failure, returning to `Unauthenticated`.
    ///
    /// No-op in any other state.
    pub async fn acknowledge_failure(&self) {
        let mut inner = self.inner.lock().await;
        if matches!(inner.state, SessionState::Failed { .. }) {
            inner.state = SessionState::Unauthenticated;
        }
    }

    /// The current state, for UI collaborators.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    /// The cached identity, if this session is authenticated.
    pub async fn identity(&self) -> Option<crate::provider::RootIdentity> {
        self.inner.lock().await.identity.clone()
    }

    fn fail(&self, inner: &mut SessionInner, err: &HandoffError) {
        tracing::error!(
            error = %err,
            code = err.error_code(),
            "authentication attempt failed"
        );
        inner.clear();
        inner.state = SessionState::Failed {
            reason: err.to_string(),
        };
    }
}
