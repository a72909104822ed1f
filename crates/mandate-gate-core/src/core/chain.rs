// crates/mandate-gate-core/src/core/chain.rs
// ============================================================================
// Module: Chain Validator
// Description: Signature and constraint validation over completed mandate chains.
// Purpose: Gate execution and produce the complete violation set for audit.
// Dependencies: crate::core::{identifiers, mandate, signature, time}, serde
// ============================================================================

//! ## Overview
//! The chain validator checks a completed authorization chain (an immediate
//! user-signed cart, or a deferred intent-and-cart pair) against signature
//! and constraint rules. Every check runs and every violation is collected;
//! callers need the complete failure set both to gate execution and to feed
//! audit logs, so validation never short-circuits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::IntentId;
use crate::core::identifiers::SignerId;
use crate::core::identifiers::UserId;
use crate::core::mandate::Cart;
use crate::core::mandate::Intent;
use crate::core::signature::SignerRole;
use crate::core::signature::SigningKeys;
use crate::core::signature::verify_record;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Violations
// ============================================================================

/// A single rule violation found while validating a chain.
///
/// # Invariants
/// - Variants are stable and serializable for audit logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The intent carries no signature.
    IntentSignatureMissing,
    /// The intent signature role is not the user role.
    IntentRoleMismatch {
        /// Role recorded on the intent signature.
        actual: SignerRole,
    },
    /// The intent signer identity does not equal the owning user.
    IntentSignerMismatch {
        /// Identity recorded on the intent signature.
        signer: SignerId,
        /// Owning user of the intent.
        user: UserId,
    },
    /// The intent signature does not verify against the intent content.
    IntentSignatureInvalid,
    /// The intent expiration has passed.
    IntentExpired {
        /// Declared expiration.
        expires_at: Timestamp,
        /// Validation time.
        checked_at: Timestamp,
    },
    /// The cart signature role is wrong for the flow.
    CartRoleMismatch {
        /// Role the flow requires.
        expected: SignerRole,
        /// Role recorded on the cart signature.
        actual: SignerRole,
    },
    /// The cart signer identity does not equal the owning user (immediate flow).
    CartSignerMismatch {
        /// Identity recorded on the cart signature.
        signer: SignerId,
        /// Owning user of the cart.
        user: UserId,
    },
    /// The cart signature does not verify against the cart content.
    CartSignatureInvalid,
    /// The deferred cart carries no intent reference.
    IntentReferenceMissing,
    /// The cart's intent reference does not equal the intent's identifier.
    IntentReferenceMismatch {
        /// Reference recorded on the cart.
        cart_ref: IntentId,
        /// Identifier of the intent being validated.
        intent_id: IntentId,
    },
    /// The cart's owning user does not equal the intent's owning user.
    UserMismatch {
        /// Owning user of the intent.
        intent_user: UserId,
        /// Owning user of the cart.
        cart_user: UserId,
    },
    /// The cart grand total exceeds the intent's price constraint.
    PriceExceeded {
        /// Cart grand total in cents.
        grand_total_cents: u64,
        /// Constraint ceiling in cents.
        max_price_cents: u64,
    },
    /// The cart delivery estimate exceeds the intent's delivery constraint.
    DeliveryExceeded {
        /// Cart delivery estimate in days.
        delivery_estimate_days: u32,
        /// Constraint ceiling in days.
        max_delivery_days: u32,
    },
    /// Cart totals are internally inconsistent.
    TotalsInconsistent {
        /// Description of the failed arithmetic check.
        detail: String,
    },
}

impl Violation {
    /// Returns a stable code for the violation kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IntentSignatureMissing => "intent_signature_missing",
            Self::IntentRoleMismatch { .. } => "intent_role_mismatch",
            Self::IntentSignerMismatch { .. } => "intent_signer_mismatch",
            Self::IntentSignatureInvalid => "intent_signature_invalid",
            Self::IntentExpired { .. } => "intent_expired",
            Self::CartRoleMismatch { .. } => "cart_role_mismatch",
            Self::CartSignerMismatch { .. } => "cart_signer_mismatch",
            Self::CartSignatureInvalid => "cart_signature_invalid",
            Self::IntentReferenceMissing => "intent_reference_missing",
            Self::IntentReferenceMismatch { .. } => "intent_reference_mismatch",
            Self::UserMismatch { .. } => "user_mismatch",
            Self::PriceExceeded { .. } => "price_exceeded",
            Self::DeliveryExceeded { .. } => "delivery_exceeded",
            Self::TotalsInconsistent { .. } => "totals_inconsistent",
        }
    }
}

// ============================================================================
// SECTION: Chain Report
// ============================================================================

/// Complete validation result for one chain evaluation.
///
/// # Invariants
/// - `valid` is true exactly when `violations` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// True when no violations were found.
    pub valid: bool,
    /// Every violation found, in check order.
    pub violations: Vec<Violation>,
}

impl ChainReport {
    /// Builds a report from collected violations.
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Validator over completed mandate chains.
///
/// # Invariants
/// - Holds no per-chain state; a single instance validates any chain.
#[derive(Debug, Clone)]
pub struct ChainValidator {
    /// Per-role secret material used for signature verification.
    keys: std::sync::Arc<SigningKeys>,
}

impl ChainValidator {
    /// Creates a validator over the provisioned signing keys.
    #[must_use]
    pub const fn new(keys: std::sync::Arc<SigningKeys>) -> Self {
        Self {
            keys,
        }
    }

    /// Validates an immediate (user-present) cart.
    ///
    /// Checks: user-role signature, signer identity equals the cart's owning
    /// user, cryptographic verification, and a defensive re-check of the
    /// cart's internal totals.
    #[must_use]
    pub fn validate_immediate(&self, cart: &Cart, now: Timestamp) -> ChainReport {
        let mut violations = Vec::new();

        if cart.signature.signer_role == SignerRole::User {
            if cart.signature.signer_identity.as_str() != cart.user_id.as_str() {
                violations.push(Violation::CartSignerMismatch {
                    signer: cart.signature.signer_identity.clone(),
                    user: cart.user_id.clone(),
                });
            }
            if !verify_record(cart, &cart.signature, &self.keys, now) {
                violations.push(Violation::CartSignatureInvalid);
            }
        } else {
            violations.push(Violation::CartRoleMismatch {
                expected: SignerRole::User,
                actual: cart.signature.signer_role,
            });
        }

        if let Err(err) = cart.validate() {
            violations.push(Violation::TotalsInconsistent {
                detail: err.to_string(),
            });
        }

        ChainReport::from_violations(violations)
    }

    /// Validates a deferred (user-not-present) intent-and-cart chain.
    ///
    /// Performs all checks and collects every violation: intent signature
    /// presence, role, signer identity, and cryptographic verification;
    /// intent expiry; cart agent-role signature and verification; chain
    /// linkage; user consistency; price and delivery constraints; and a
    /// defensive totals re-check.
    #[must_use]
    pub fn validate_deferred(&self, intent: &Intent, cart: &Cart, now: Timestamp) -> ChainReport {
        let mut violations = Vec::new();

        // 1-2: intent signature presence, role, signer identity, verification.
        match intent.signature.as_ref() {
            None => violations.push(Violation::IntentSignatureMissing),
            Some(signature) => {
                if signature.signer_role == SignerRole::User {
                    if signature.signer_identity.as_str() != intent.user_id.as_str() {
                        violations.push(Violation::IntentSignerMismatch {
                            signer: signature.signer_identity.clone(),
                            user: intent.user_id.clone(),
                        });
                    }
                    if !verify_record(intent, signature, &self.keys, now) {
                        violations.push(Violation::IntentSignatureInvalid);
                    }
                } else {
                    violations.push(Violation::IntentRoleMismatch {
                        actual: signature.signer_role,
                    });
                }
            }
        }

        // 3: intent expiry.
        if let Some(expires_at) = intent.expires_at
            && now > expires_at
        {
            violations.push(Violation::IntentExpired {
                expires_at,
                checked_at: now,
            });
        }

        // 4: the cart must be agent-signed; a user-signed deferred cart is
        // itself a violation, since the user already authorized via the intent.
        if cart.signature.signer_role == SignerRole::Agent {
            if !verify_record(cart, &cart.signature, &self.keys, now) {
                violations.push(Violation::CartSignatureInvalid);
            }
        } else {
            violations.push(Violation::CartRoleMismatch {
                expected: SignerRole::Agent,
                actual: cart.signature.signer_role,
            });
        }

        // 5: chain linkage.
        match cart.intent_ref.as_ref() {
            None => violations.push(Violation::IntentReferenceMissing),
            Some(cart_ref) => {
                if cart_ref != &intent.intent_id {
                    violations.push(Violation::IntentReferenceMismatch {
                        cart_ref: cart_ref.clone(),
                        intent_id: intent.intent_id.clone(),
                    });
                }
            }
        }

        // 6: user consistency across the chain.
        if intent.user_id != cart.user_id {
            violations.push(Violation::UserMismatch {
                intent_user: intent.user_id.clone(),
                cart_user: cart.user_id.clone(),
            });
        }

        // 7-8: constraint ceilings.
        if let Some(constraints) = intent.constraints {
            if cart.totals.grand_total_cents > constraints.max_price_cents {
                violations.push(Violation::PriceExceeded {
                    grand_total_cents: cart.totals.grand_total_cents,
                    max_price_cents: constraints.max_price_cents,
                });
            }
            if cart.delivery_estimate_days > constraints.max_delivery_days {
                violations.push(Violation::DeliveryExceeded {
                    delivery_estimate_days: cart.delivery_estimate_days,
                    max_delivery_days: constraints.max_delivery_days,
                });
            }
        }

        if let Err(err) = cart.validate() {
            violations.push(Violation::TotalsInconsistent {
                detail: err.to_string(),
            });
        }

        ChainReport::from_violations(violations)
    }
}
