//! Ephemeral session key material.
//!
//! Every authentication attempt is anchored to a fresh Ed25519 key pair
//! generated here. Public keys travel as hex-encoded DER
//! (`SubjectPublicKeyInfo`, RFC 8410) so they survive URL query strings;
//! private halves never leave the page that generated them.

use crate::error::{HandoffError, HandoffResult};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;

/// DER prefix for an Ed25519 `SubjectPublicKeyInfo` (RFC 8410).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Length of a DER-encoded Ed25519 public key (prefix + 32 raw bytes).
pub const PUBLIC_KEY_DER_LEN: usize = ED25519_SPKI_PREFIX.len() + 32;

/// An Ed25519 public key in its transport encodings.
///
/// The canonical byte form is DER; the canonical string form is lowercase
/// hex over the DER bytes. Round trip: `from_hex(to_hex(k)) == k`.
#[derive(Clone)]
pub struct SessionPublicKey {
    verifying_key: VerifyingKey,
}

impl SessionPublicKey {
    /// Parse a DER-encoded (`SubjectPublicKeyInfo`) Ed25519 public key.
    pub fn from_der(der: &[u8]) -> HandoffResult<Self> {
        if der.len() != PUBLIC_KEY_DER_LEN {
            return Err(HandoffError::MalformedKey(format!(
                "expected {} DER bytes, got {}",
                PUBLIC_KEY_DER_LEN,
                der.len()
            )));
        }
        if der[..ED25519_SPKI_PREFIX.len()] != ED25519_SPKI_PREFIX {
            return Err(HandoffError::MalformedKey(
                "not an Ed25519 SubjectPublicKeyInfo".to_string(),
            ));
        }
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&der[ED25519_SPKI_PREFIX.len()..]);
        let verifying_key = VerifyingKey::from_bytes(&raw)
            .map_err(|e| HandoffError::MalformedKey(e.to_string()))?;
        Ok(Self { verifying_key })
    }

    /// Encode to DER (`SubjectPublicKeyInfo`).
    pub fn to_der(&self) -> Vec<u8> {
        let mut der = Vec::with_capacity(PUBLIC_KEY_DER_LEN);
        der.extend_from_slice(&ED25519_SPKI_PREFIX);
        der.extend_from_slice(self.verifying_key.as_bytes());
        der
    }

    /// Decode from the hex form used in URL query parameters.
    pub fn from_hex(s: &str) -> HandoffResult<Self> {
        let der = hex::decode(s)
            .map_err(|e| HandoffError::MalformedKey(format!("invalid hex: {e}")))?;
        Self::from_der(&der)
    }

    /// Encode to the hex form used in URL query parameters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_der())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl PartialEq for SessionPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.verifying_key.as_bytes() == other.verifying_key.as_bytes()
    }
}

impl Eq for SessionPublicKey {}

impl std::fmt::Debug for SessionPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPublicKey")
            .field("der_hex", &self.to_hex())
            .finish()
    }
}

/// An ephemeral Ed25519 key pair for the lifetime of one attempt.
///
/// Created at the start of a login attempt and discarded when the attempt
/// completes or is abandoned; never persisted, never transmitted.
pub struct SessionKeyPair {
    signing_key: SigningKey,
}

impl SessionKeyPair {
    /// Generate a fresh key pair from the OS RNG.
    ///
    /// Fails only on platform RNG failure, which is fatal and
    /// non-retriable for the current attempt.
    pub fn generate() -> HandoffResult<Self> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| HandoffError::KeyGeneration(e.to_string()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// The public half of this pair.
    pub fn public_key(&self) -> SessionPublicKey {
        SessionPublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    pub(crate) fn sign_raw(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl std::fmt::Debug for SessionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyPair")
            .field("public_key", &self.public_key())
            .field("signing_key", &"[redacted]")
            .finish()
    }
}
