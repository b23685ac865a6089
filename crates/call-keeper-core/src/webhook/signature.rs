//! Webhook signature verification.
//!
//! The telephony provider signs each delivery with a timestamped HMAC scheme:
//! the `x-elevenlabs-signature` header carries `t=<unix-seconds>,v0=<hex>`
//! where the digest is HMAC-SHA256 over `"{timestamp}.{raw body}"` keyed by a
//! pre-shared secret.
//!
//! Verification is a pure check: it performs no I/O and emits no response.
//! The HTTP layer maps each distinct [`SignatureError`] to a 401 with its own
//! message so failure modes stay distinguishable in logs and responses.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::Timestamp;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider signature
pub const SIGNATURE_HEADER: &str = "x-elevenlabs-signature";

/// Maximum accepted distance between the signature timestamp and the server
/// clock, in either direction (anti-replay window).
pub const DEFAULT_TOLERANCE_SECONDS: i64 = 1800;

// ============================================================================
// SecretString
// ============================================================================

/// A shared secret that is zeroized on drop and redacted from `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a raw secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret for use as key material
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretString").field(&"<REDACTED>").finish()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Signature verification failures.
///
/// Every variant is terminal for the request; none is retryable. The HTTP
/// layer maps all of them to 401.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header is missing")]
    MissingSignature,

    #[error("Signature header is malformed: {message}")]
    MalformedSignature { message: String },

    #[error("Signature timestamp is outside the tolerance window: {age_seconds}s (allowed ±{tolerance_seconds}s)")]
    StaleTimestamp {
        age_seconds: i64,
        tolerance_seconds: i64,
    },

    #[error("HMAC-SHA256 digest does not match")]
    DigestMismatch,

    #[error("Configured secret cannot be used as an HMAC key")]
    InvalidSecret,
}

// ============================================================================
// SignatureHeader
// ============================================================================

/// Parsed form of the `t=<unix-seconds>,v0=<hex>` signature header
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub digest: Vec<u8>,
}

impl SignatureHeader {
    /// Parse a raw header value.
    ///
    /// Both the `t=` and `v0=` parts must be present, in any order; the
    /// timestamp must be a decimal integer and the digest valid hex.
    /// Unrecognized parts are ignored so the provider can extend the scheme.
    pub fn parse(raw: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut digest_hex = None;

        for part in raw.split(',') {
            let part = part.trim();
            if let Some(value) = part.strip_prefix("t=") {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    SignatureError::MalformedSignature {
                        message: format!("timestamp '{}' is not an integer", value),
                    }
                })?);
            } else if let Some(value) = part.strip_prefix("v0=") {
                digest_hex = Some(value);
            }
        }

        let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedSignature {
            message: "missing 't=' part".to_string(),
        })?;
        let digest_hex = digest_hex.ok_or_else(|| SignatureError::MalformedSignature {
            message: "missing 'v0=' part".to_string(),
        })?;

        let digest = hex::decode(digest_hex).map_err(|_| SignatureError::MalformedSignature {
            message: "digest is not valid hex".to_string(),
        })?;

        Ok(Self { timestamp, digest })
    }
}

// ============================================================================
// Verification Outcome
// ============================================================================

/// Result of a successful verification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The signature was present, fresh, and matched.
    Verified,
    /// No secret is configured; verification was skipped (open mode).
    SkippedOpenMode,
}

// ============================================================================
// SignatureVerifier
// ============================================================================

/// Validates webhook authenticity and freshness against a pre-shared secret.
///
/// When constructed without a secret the verifier operates in **open mode**
/// and accepts every request. This is an explicit trust decision for
/// deployments where the provider cannot sign (e.g. local development); a
/// `WARN` is emitted at construction so operators notice.
pub struct SignatureVerifier {
    secret: Option<SecretString>,
    tolerance_seconds: i64,
}

impl SignatureVerifier {
    /// Construct a verifier. `None` selects open mode.
    pub fn new(secret: Option<SecretString>) -> Self {
        if secret.is_none() {
            warn!(
                "No webhook secret configured — signature verification is DISABLED. \
                 Every delivery will be accepted as authentic."
            );
        }
        Self {
            secret,
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
        }
    }

    /// Override the anti-replay tolerance window
    pub fn with_tolerance(mut self, tolerance_seconds: i64) -> Self {
        self.tolerance_seconds = tolerance_seconds;
        self
    }

    /// Whether this verifier will actually check signatures
    pub fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a request against the wall clock
    pub fn verify(
        &self,
        body: &[u8],
        header: Option<&str>,
    ) -> Result<VerificationOutcome, SignatureError> {
        self.verify_at(body, header, Timestamp::now())
    }

    /// Verify a request at an explicit point in time.
    ///
    /// Taking `now` as an argument keeps the tolerance window deterministic
    /// under test.
    pub fn verify_at(
        &self,
        body: &[u8],
        header: Option<&str>,
        now: Timestamp,
    ) -> Result<VerificationOutcome, SignatureError> {
        let Some(secret) = &self.secret else {
            return Ok(VerificationOutcome::SkippedOpenMode);
        };

        let raw = header.ok_or(SignatureError::MissingSignature)?;
        let parsed = SignatureHeader::parse(raw)?;

        let age_seconds = (now.epoch_seconds() - parsed.timestamp).abs();
        if age_seconds > self.tolerance_seconds {
            return Err(SignatureError::StaleTimestamp {
                age_seconds,
                tolerance_seconds: self.tolerance_seconds,
            });
        }

        let mut mac = HmacSha256::new_from_slice(secret.expose().as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(parsed.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);

        // verify_slice is constant-time; same accept/reject semantics as a
        // hex string comparison.
        mac.verify_slice(&parsed.digest)
            .map_err(|_| SignatureError::DigestMismatch)?;

        Ok(VerificationOutcome::Verified)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enforcing", &self.is_enforcing())
            .field("tolerance_seconds", &self.tolerance_seconds)
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
