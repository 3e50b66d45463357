//! HMAC-SHA1 webhook signatures.
//!
//! ShotGrid signs each delivery with the shared secret and sends
//! `sha1=<hex digest>` in [`SIGNATURE_HEADER`]. The prefix is optional on
//! input. Digests are compared in constant time.

use super::AuthenticationError;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::fmt;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "X-SG-Signature";

const DIGEST_PREFIX: &str = "sha1=";

type HmacSha1 = Hmac<Sha1>;

/// Verifies and produces webhook signatures for one shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    keyed: HmacSha1,
}

impl SignatureVerifier {
    /// Keys a verifier with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::InvalidKey`] when the secret is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, AuthenticationError> {
        let key = secret.as_ref();
        if key.is_empty() {
            return Err(AuthenticationError::InvalidKey("secret is empty".to_owned()));
        }
        let keyed = HmacSha1::new_from_slice(key)
            .map_err(|err| AuthenticationError::InvalidKey(err.to_string()))?;
        Ok(Self { keyed })
    }

    /// Checks `signature` against `body`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::MissingSignature`] when no signature
    /// is present, [`AuthenticationError::MalformedSignature`] when it is not
    /// hex, and [`AuthenticationError::SignatureMismatch`] otherwise.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), AuthenticationError> {
        let presented = signature
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthenticationError::MissingSignature)?;
        let digest = presented.strip_prefix(DIGEST_PREFIX).unwrap_or(presented);
        let expected = hex::decode(digest).map_err(|_| AuthenticationError::MalformedSignature)?;

        let mut mac = self.keyed.clone();
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| AuthenticationError::SignatureMismatch)
    }

    /// Returns the `sha1=<hex>` signature of `body`.
    #[must_use]
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.keyed.clone();
        mac.update(body);
        format!("{DIGEST_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}
