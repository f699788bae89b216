//! Error types for the delegated-identity handoff.
//!
//! This module defines all error types that can occur during key handling,
//! provider interaction, delegation building, and handoff encoding.

use thiserror::Error;

/// Handoff error types.
///
/// Every failure ends the current authentication attempt; nothing in this
/// crate retries automatically. The only recoverable error is
/// [`HandoffError::AlreadyInProgress`], which leaves the pending attempt
/// untouched.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// Incoming key material could not be parsed (bad hex or bad DER)
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// The identity provider reported a failure or returned no identity
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// The signer could not produce a signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The platform RNG failed while generating a key pair
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// A delegation was requested with a non-positive or unrepresentable TTL
    #[error("Delegation TTL must be positive")]
    InvalidTtl,

    /// A delegation link's expiration is not in the future
    #[error("Delegation expired at {expired_at} ns since epoch")]
    ExpiredDelegation {
        /// Expiration of the offending link, nanoseconds since the Unix epoch
        expired_at: u64,
    },

    /// A delegation chain failed structural or signature validation
    #[error("Invalid delegation chain: {0}")]
    InvalidChain(String),

    /// The incoming request did not carry a redirect scheme/host.
    ///
    /// This is fatal by design: falling back to a default destination
    /// would risk delivering credentials to the wrong caller.
    #[error("Missing redirect target: {0}")]
    MissingRedirectTarget(&'static str),

    /// A login was triggered while another attempt is awaiting the provider
    #[error("Authentication attempt already in progress")]
    AlreadyInProgress,

    /// Wire payload serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for handoff operations.
pub type HandoffResult<T> = Result<T, HandoffError>;

impl HandoffError {
    /// Check whether this error ends the current attempt.
    ///
    /// Fatal errors require a brand-new login trigger with fresh key
    /// material; `AlreadyInProgress` is the one error a caller may simply
    /// wait out.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HandoffError::AlreadyInProgress)
    }

    /// Get a stable error code for UI surfaces and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            HandoffError::MalformedKey(_) => "MALFORMED_KEY",
            HandoffError::Provider(_) => "PROVIDER_ERROR",
            HandoffError::Signing(_) => "SIGNING_ERROR",
            HandoffError::KeyGeneration(_) => "KEY_GENERATION_FAILED",
            HandoffError::InvalidTtl => "INVALID_TTL",
            HandoffError::ExpiredDelegation { .. } => "EXPIRED_DELEGATION",
            HandoffError::InvalidChain(_) => "INVALID_CHAIN",
            HandoffError::MissingRedirectTarget(_) => "MISSING_REDIRECT_TARGET",
            HandoffError::AlreadyInProgress => "ALREADY_IN_PROGRESS",
            HandoffError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
