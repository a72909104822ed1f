// crates/mandate-gate-providers/src/payments.rs
// ============================================================================
// Module: Token Payment Authority
// Description: Deterministic in-process payment authorization collaborator.
// Purpose: Provide reproducible approval behavior for tests and demos.
// Dependencies: mandate-gate-core, sha2
// ============================================================================

//! ## Overview
//! [`TokenPaymentAuthority`] operates on tokenized credentials only. Special
//! `tok_decline*` tokens trigger named decline scenarios; every other token
//! approves or declines deterministically from a digest of the request
//! (roughly nine approvals in ten), so test runs are reproducible without a
//! live gateway. Authorization codes derive from the request digest as well.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mandate_gate_core::AuthorizationOutcome;
use mandate_gate_core::CredentialToken;
use mandate_gate_core::Currency;
use mandate_gate_core::PaymentAuthority;
use mandate_gate_core::PaymentAuthorityError;
use mandate_gate_core::PaymentMetadata;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tokens that trigger specific decline scenarios.
const DECLINE_TOKENS: [(&str, &str); 4] = [
    ("tok_decline", "insufficient_funds"),
    ("tok_decline_fraud", "fraud_suspected"),
    ("tok_decline_expired", "card_expired"),
    ("tok_decline_invalid", "invalid_card"),
];

/// Decline reasons cycled for hash-declined requests.
const HASH_DECLINE_REASONS: [&str; 3] = ["insufficient_funds", "do_not_honor", "generic_decline"];

// ============================================================================
// SECTION: Authority
// ============================================================================

/// Deterministic token-based payment authority.
///
/// # Invariants
/// - Identical requests always produce identical outcomes and codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenPaymentAuthority {
    /// When true, every non-decline-token request is approved.
    approve_all: bool,
}

impl TokenPaymentAuthority {
    /// Creates an authority with hash-based approval (about 90%).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            approve_all: false,
        }
    }

    /// Creates an authority approving everything except decline tokens.
    #[must_use]
    pub const fn approving() -> Self {
        Self {
            approve_all: true,
        }
    }
}

/// Returns the leading 32 bits of the request digest.
fn request_hash(token: &CredentialToken, amount_cents: u64, currency: Currency) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(token.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(amount_cents.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(currency.code().as_bytes());
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Derives a stable authorization code for an approved request.
fn authorization_code(token: &CredentialToken, metadata: &PaymentMetadata) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(metadata.cart_ref.as_str().as_bytes());
    let digest = hasher.finalize();
    let mut code = String::from("auth_");
    for byte in digest.iter().take(6) {
        code.push_str(&format!("{byte:02x}"));
    }
    code
}

impl PaymentAuthority for TokenPaymentAuthority {
    fn authorize(
        &self,
        token: &CredentialToken,
        amount_cents: u64,
        currency: Currency,
        metadata: &PaymentMetadata,
    ) -> Result<AuthorizationOutcome, PaymentAuthorityError> {
        if let Some((_, reason)) =
            DECLINE_TOKENS.iter().find(|(decline_token, _)| *decline_token == token.as_str())
        {
            return Ok(AuthorizationOutcome::Declined {
                reason: (*reason).to_string(),
            });
        }

        let hash = request_hash(token, amount_cents, currency);
        let approved = self.approve_all || hash % 10 != 0;
        if approved {
            Ok(AuthorizationOutcome::Authorized {
                authorization_code: authorization_code(token, metadata),
            })
        } else {
            let reason = HASH_DECLINE_REASONS[usize::try_from(hash % 3).unwrap_or(0)];
            Ok(AuthorizationOutcome::Declined {
                reason: reason.to_string(),
            })
        }
    }
}
