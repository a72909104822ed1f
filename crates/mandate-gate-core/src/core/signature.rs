// crates/mandate-gate-core/src/core/signature.rs
// ============================================================================
// Module: Mandate Signature Service
// Description: Canonical serialization, signing, and verification of mandates.
// Purpose: Bind mandate content to a signer role with per-role secret material.
// Dependencies: hmac, serde, serde_jcs, serde_json, sha2, subtle
// ============================================================================

//! ## Overview
//! Mandate signatures are HMAC-SHA-256 digests over a canonical byte form of
//! the record. Canonicalization follows RFC 8785 (JCS): keys sorted, no
//! insignificant whitespace, with the `signature` field excluded so a record
//! can be verified against the bytes that were signed. Three independent
//! secrets are provisioned, one per signer role; possessing one role's secret
//! never allows forging a signature attributable to another role.
//!
//! Verification never returns an error: any malformed input, wrong secret, or
//! future-dated signature simply verifies as `false`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use hmac::Hmac;
use hmac::Mac;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::core::identifiers::SignerId;
use crate::core::time::Timestamp;

/// HMAC-SHA-256 instance used for all mandate signatures.
type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// SECTION: Signer Roles
// ============================================================================

/// Signer role determining which secret signs and verifies a mandate.
///
/// # Invariants
/// - Variants are stable for serialization and secret selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerRole {
    /// The human account owner; signs immediate carts and deferred intents.
    User,
    /// The autonomous delegate; signs deferred carts.
    Agent,
    /// The payment authority; signs all payment mandates.
    PaymentAuthority,
}

impl SignerRole {
    /// Returns a stable label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::PaymentAuthority => "payment_authority",
        }
    }
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Secret Material
// ============================================================================

/// Secret key bytes for one signer role.
///
/// # Invariants
/// - Never logged or serialized; `Debug` is redacted.
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Creates a secret key from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the key bytes for digest computation.
    #[must_use]
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

/// Secret material for all three signer roles.
///
/// # Invariants
/// - One independently rotatable secret per role, supplied at process start.
#[derive(Debug, Clone)]
pub struct SigningKeys {
    /// Secret for user-role signatures.
    user: SecretKey,
    /// Secret for agent-role signatures.
    agent: SecretKey,
    /// Secret for payment-authority-role signatures.
    payment_authority: SecretKey,
}

impl SigningKeys {
    /// Creates signing keys from per-role secrets.
    #[must_use]
    pub const fn new(user: SecretKey, agent: SecretKey, payment_authority: SecretKey) -> Self {
        Self {
            user,
            agent,
            payment_authority,
        }
    }

    /// Returns the secret for a signer role.
    #[must_use]
    pub const fn secret_for(&self, role: SignerRole) -> &SecretKey {
        match role {
            SignerRole::User => &self.user,
            SignerRole::Agent => &self.agent,
            SignerRole::PaymentAuthority => &self.payment_authority,
        }
    }
}

// ============================================================================
// SECTION: Signature Record
// ============================================================================

/// Signature algorithm tag.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA-256 over the canonical signing message.
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

/// Cryptographic signature attached to a mandate record.
///
/// # Invariants
/// - `signature_value` is 64 lowercase hex characters.
/// - `timestamp` must not be in the future relative to verification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature algorithm tag.
    pub algorithm: SignatureAlgorithm,
    /// Role whose secret produced the digest.
    pub signer_role: SignerRole,
    /// Identity of the signer (user id, agent id, or authority id).
    pub signer_identity: SignerId,
    /// When the signature was created.
    pub timestamp: Timestamp,
    /// Hex-encoded HMAC-SHA-256 digest.
    pub signature_value: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Record could not be serialized for canonicalization.
    #[error("mandate serialization failed: {0}")]
    Serialization(String),
    /// Record could not be canonicalized.
    #[error("mandate canonicalization failed: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Returns the canonical byte form of a record with the signature excluded.
///
/// Canonicalization is RFC 8785 (JCS): object keys sorted, no insignificant
/// whitespace. The top-level `signature` field is removed whether absent,
/// null, or populated, so signing and verification operate on the same bytes.
///
/// # Errors
///
/// Returns [`SignatureError`] when the record cannot be serialized or
/// canonicalized (for example, non-finite floats).
pub fn canonical_bytes<T: Serialize>(record: &T) -> Result<Vec<u8>, SignatureError> {
    let mut value =
        serde_json::to_value(record).map_err(|err| SignatureError::Serialization(err.to_string()))?;
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("signature");
    }
    serde_jcs::to_vec(&value).map_err(|err| SignatureError::Canonicalization(err.to_string()))
}

/// Builds the signing message for a record, signer, and timestamp.
fn signing_message<T: Serialize>(
    record: &T,
    signer_identity: &SignerId,
    timestamp: Timestamp,
) -> Result<Vec<u8>, SignatureError> {
    let mut message = canonical_bytes(record)?;
    message.push(b'|');
    message.extend_from_slice(signer_identity.as_str().as_bytes());
    message.push(b'|');
    message.extend_from_slice(timestamp.to_string().as_bytes());
    Ok(message)
}

/// Computes the lowercase hex HMAC-SHA-256 digest of a message.
fn digest_hex(secret: &SecretKey, message: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| SignatureError::Canonicalization(err.to_string()))?;
    mac.update(message);
    let digest = mac.finalize().into_bytes();
    let mut rendered = String::with_capacity(digest.len() * 2);
    for byte in digest {
        rendered.push_str(&format!("{byte:02x}"));
    }
    Ok(rendered)
}

// ============================================================================
// SECTION: Signing and Verification
// ============================================================================

/// Signs a record for a role, producing a [`Signature`].
///
/// The message is `canonical(record) | signer_identity | rfc3339(timestamp)`
/// and the digest is keyed by the role's secret.
///
/// # Errors
///
/// Returns [`SignatureError`] when the record cannot be canonicalized.
pub fn sign_record<T: Serialize>(
    record: &T,
    role: SignerRole,
    signer_identity: &SignerId,
    timestamp: Timestamp,
    keys: &SigningKeys,
) -> Result<Signature, SignatureError> {
    let message = signing_message(record, signer_identity, timestamp)?;
    let signature_value = digest_hex(keys.secret_for(role), &message)?;
    Ok(Signature {
        algorithm: SignatureAlgorithm::HmacSha256,
        signer_role: role,
        signer_identity: signer_identity.clone(),
        timestamp,
        signature_value,
    })
}

/// Verifies a record's signature against the secret for its recorded role.
///
/// Returns `false` (never an error) on any malformed input, including a
/// signature timestamp in the future relative to `now`. The digest comparison
/// is constant-time.
#[must_use]
pub fn verify_record<T: Serialize>(
    record: &T,
    signature: &Signature,
    keys: &SigningKeys,
    now: Timestamp,
) -> bool {
    if signature.timestamp > now {
        return false;
    }
    let Ok(message) = signing_message(record, &signature.signer_identity, signature.timestamp)
    else {
        return false;
    };
    let Ok(expected) = digest_hex(keys.secret_for(signature.signer_role), &message) else {
        return false;
    };
    if expected.len() != signature.signature_value.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.signature_value.as_bytes()).into()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::use_debug,
        reason = "Test-only output and panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::*;

    /// Returns distinct per-role keys for tests.
    fn test_keys() -> SigningKeys {
        SigningKeys::new(
            SecretKey::from("user-secret-0123456789abcdef"),
            SecretKey::from("agent-secret-0123456789abcdef"),
            SecretKey::from("authority-secret-0123456789abcdef"),
        )
    }

    #[test]
    fn canonical_bytes_sorts_keys_and_strips_signature() {
        let record = json!({
            "b": 2,
            "a": 1,
            "signature": {"signature_value": "ff"},
        });
        let bytes = canonical_bytes(&record).unwrap();
        assert_eq!(bytes, br#"{"a":1,"b":2}"#);
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let keys = test_keys();
        let record = json!({"mandate_id": "intent_hnp_abc", "user_id": "user_1"});
        let now = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let signature =
            sign_record(&record, SignerRole::User, &SignerId::new("user_1"), now, &keys).unwrap();
        assert_eq!(signature.signature_value.len(), 64);
        assert!(verify_record(&record, &signature, &keys, now));
    }

    #[test]
    fn future_signature_rejected() {
        let keys = test_keys();
        let record = json!({"mandate_id": "intent_hnp_abc"});
        let signed_at = Timestamp::from_unix_seconds(1_700_000_100).unwrap();
        let now = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let signature =
            sign_record(&record, SignerRole::User, &SignerId::new("user_1"), signed_at, &keys)
                .unwrap();
        assert!(!verify_record(&record, &signature, &keys, now));
    }

    #[test]
    fn role_secrets_are_isolated() {
        let keys = test_keys();
        let record = json!({"mandate_id": "cart_hnp_abc"});
        let now = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let mut signature =
            sign_record(&record, SignerRole::Agent, &SignerId::new("agent_1"), now, &keys).unwrap();
        assert!(verify_record(&record, &signature, &keys, now));

        // Relabeling the role makes the digest verify against the wrong secret.
        signature.signer_role = SignerRole::User;
        assert!(!verify_record(&record, &signature, &keys, now));
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let rendered = format!("{:?}", SecretKey::from("very-secret-material"));
        assert!(!rendered.contains("very-secret-material"));
    }
}
