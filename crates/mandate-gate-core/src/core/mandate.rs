// crates/mandate-gate-core/src/core/mandate.rs
// ============================================================================
// Module: Mandate Records
// Description: Intent, cart, and payment mandates with construction validation.
// Purpose: Capture the signed, immutable authorization chain for purchases.
// Dependencies: crate::core::{identifiers, signature, time}, serde
// ============================================================================

//! ## Overview
//! Mandates are the signed, immutable records of the authorization chain: an
//! [`Intent`] captures a purchase goal, a [`Cart`] prices a basket, and a
//! [`Payment`] requests authorization against a cart. Structural and
//! arithmetic invariants are validated once at the construction boundary;
//! the chain validator re-checks them defensively before execution.
//!
//! Records carrying a mandatory signature are built through draft types
//! ([`CartDraft`], [`PaymentDraft`]) whose canonical byte form matches the
//! final record with its signature excluded, so signing and verification
//! always operate on identical bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CartId;
use crate::core::identifiers::CredentialToken;
use crate::core::identifiers::IntentId;
use crate::core::identifiers::PaymentId;
use crate::core::identifiers::ProductId;
use crate::core::identifiers::PurchaseFlow;
use crate::core::identifiers::SignerId;
use crate::core::identifiers::UserId;
use crate::core::signature::Signature;
use crate::core::signature::SignatureError;
use crate::core::signature::SignerRole;
use crate::core::signature::SigningKeys;
use crate::core::signature::sign_record;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum lead time for a deferred intent expiration (1 hour).
pub const MIN_EXPIRATION_LEAD_SECS: i64 = 3_600;
/// Maximum lead time for a deferred intent expiration (30 days).
pub const MAX_EXPIRATION_LEAD_SECS: i64 = 30 * 86_400;
/// Maximum delivery constraint accepted for a deferred intent.
pub const MAX_DELIVERY_DAYS: u32 = 30;

// ============================================================================
// SECTION: Shared Value Types
// ============================================================================

/// Currency code for all monetary fields.
///
/// # Invariants
/// - All amounts are integer minor units (cents) of a single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    /// United States dollar.
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    /// Returns the ISO 4217 code for the currency.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Price and delivery constraints for a deferred intent.
///
/// # Invariants
/// - `max_price_cents` applies to the realized landed cost, not the sticker price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseConstraints {
    /// Maximum landed price the user will pay, in cents.
    pub max_price_cents: u64,
    /// Maximum delivery time the user will accept, in days.
    pub max_delivery_days: u32,
    /// Constraint currency.
    pub currency: Currency,
}

impl PurchaseConstraints {
    /// Validates constraint ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError::ConstraintOutOfRange`] when a bound is zero or
    /// the delivery ceiling exceeds the supported window.
    pub fn validate(&self) -> Result<(), MandateError> {
        if self.max_price_cents == 0 {
            return Err(MandateError::ConstraintOutOfRange {
                field: "max_price_cents",
            });
        }
        if self.max_delivery_days == 0 || self.max_delivery_days > MAX_DELIVERY_DAYS {
            return Err(MandateError::ConstraintOutOfRange {
                field: "max_delivery_days",
            });
        }
        Ok(())
    }
}

/// Merchant identification recorded on carts.
///
/// # Invariants
/// - Values are snapshots taken at cart construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantRef {
    /// Merchant identifier.
    pub merchant_id: String,
    /// Merchant display name.
    pub merchant_name: String,
    /// Merchant storefront URL.
    pub merchant_url: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Mandate construction and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum MandateError {
    /// Deferred intent is missing constraints.
    #[error("deferred intent requires constraints")]
    MissingConstraints,
    /// Deferred intent is missing an expiration.
    #[error("deferred intent requires an expiration")]
    MissingExpiration,
    /// Deferred intent is missing its user signature.
    #[error("deferred intent requires a user signature")]
    MissingSignature,
    /// Signature role does not match the record's requirements.
    #[error("signature role {actual} does not match required role {expected}")]
    SignerRoleMismatch {
        /// Role the record requires.
        expected: SignerRole,
        /// Role recorded on the signature.
        actual: SignerRole,
    },
    /// Signature identity does not match the record owner.
    #[error("signer {signer} does not match owning user {user}")]
    SignerIdentityMismatch {
        /// Identity recorded on the signature.
        signer: String,
        /// Owning user of the record.
        user: String,
    },
    /// Constraint bound is zero or outside the supported window.
    #[error("constraint out of range: {field}")]
    ConstraintOutOfRange {
        /// Name of the offending constraint field.
        field: &'static str,
    },
    /// Expiration is too close to the reference time.
    #[error("expiration {expires_at} is less than one hour after {reference}")]
    ExpirationTooSoon {
        /// Declared expiration.
        expires_at: Timestamp,
        /// Reference time used for validation.
        reference: Timestamp,
    },
    /// Expiration is too far from the reference time.
    #[error("expiration {expires_at} is more than thirty days after {reference}")]
    ExpirationTooFar {
        /// Declared expiration.
        expires_at: Timestamp,
        /// Reference time used for validation.
        reference: Timestamp,
    },
    /// Cart has no line items.
    #[error("cart requires at least one line item")]
    EmptyCart,
    /// Line total does not equal quantity times unit price.
    #[error("line total {actual} != {quantity} x {unit_price_cents} for {product_id}")]
    LineTotalMismatch {
        /// Product whose line failed validation.
        product_id: ProductId,
        /// Declared quantity.
        quantity: u32,
        /// Declared unit price in cents.
        unit_price_cents: u64,
        /// Declared line total in cents.
        actual: u64,
    },
    /// Subtotal does not equal the sum of line totals.
    #[error("subtotal {actual} != sum of line totals {expected}")]
    SubtotalMismatch {
        /// Sum of line totals in cents.
        expected: u64,
        /// Declared subtotal in cents.
        actual: u64,
    },
    /// Grand total does not equal subtotal + tax + shipping.
    #[error("grand total {actual} != subtotal + tax + shipping ({expected})")]
    GrandTotalMismatch {
        /// Expected grand total in cents.
        expected: u64,
        /// Declared grand total in cents.
        actual: u64,
    },
    /// Payment amount does not equal the referenced cart's grand total.
    #[error("payment amount {amount_cents} != cart grand total {grand_total_cents}")]
    AmountMismatch {
        /// Declared payment amount in cents.
        amount_cents: u64,
        /// Referenced cart grand total in cents.
        grand_total_cents: u64,
    },
    /// Operation requires a deferred intent.
    #[error("intent {intent_id} is not a deferred intent")]
    NotDeferred {
        /// Offending intent identifier.
        intent_id: IntentId,
    },
    /// Signing failed while finalizing a record.
    #[error(transparent)]
    Signing(#[from] SignatureError),
}

// ============================================================================
// SECTION: Intent Mandate
// ============================================================================

/// Intent mandate: a user's purchase goal.
///
/// # Invariants
/// - Deferred intents carry constraints, an expiration, and a user signature
///   whose signer identity equals the owning user.
/// - Immutable once signed; later carts reference intents, never mutate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Intent identifier (`intent_hp_*` or `intent_hnp_*`).
    pub intent_id: IntentId,
    /// Owning user.
    pub user_id: UserId,
    /// Purchase flow scenario.
    pub flow: PurchaseFlow,
    /// Free-text product query.
    pub product_query: String,
    /// Constraints bounding a deferred purchase.
    pub constraints: Option<PurchaseConstraints>,
    /// Expiration of the pre-authorization.
    pub expires_at: Option<Timestamp>,
    /// User signature (mandatory for deferred intents).
    pub signature: Option<Signature>,
}

impl Intent {
    /// Creates an unsigned immediate intent.
    #[must_use]
    pub fn new_immediate(user_id: UserId, product_query: impl Into<String>, at: Timestamp) -> Self {
        let product_query = product_query.into();
        let intent_id = IntentId::derive(
            PurchaseFlow::Immediate,
            &[user_id.as_str(), &product_query, &at.to_string()],
        );
        Self {
            intent_id,
            user_id,
            flow: PurchaseFlow::Immediate,
            product_query,
            constraints: None,
            expires_at: None,
            signature: None,
        }
    }

    /// Creates an unsigned deferred intent.
    #[must_use]
    pub fn new_deferred(
        user_id: UserId,
        product_query: impl Into<String>,
        constraints: PurchaseConstraints,
        expires_at: Timestamp,
        at: Timestamp,
    ) -> Self {
        let product_query = product_query.into();
        let intent_id = IntentId::derive(
            PurchaseFlow::Deferred,
            &[user_id.as_str(), &product_query, &at.to_string()],
        );
        Self {
            intent_id,
            user_id,
            flow: PurchaseFlow::Deferred,
            product_query,
            constraints: Some(constraints),
            expires_at: Some(expires_at),
            signature: None,
        }
    }

    /// Signs the intent as its owning user, consuming the unsigned record.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the record cannot be canonicalized.
    pub fn signed_as_user(
        mut self,
        at: Timestamp,
        keys: &SigningKeys,
    ) -> Result<Self, SignatureError> {
        self.signature = None;
        let signer = SignerId::new(self.user_id.as_str());
        let signature = sign_record(&self, SignerRole::User, &signer, at, keys)?;
        self.signature = Some(signature);
        Ok(self)
    }

    /// Validates structural requirements at the system boundary.
    ///
    /// Deferred intents must carry constraints, an expiration inside the
    /// supported lead window relative to `now`, and a user-role signature
    /// whose signer identity equals the owning user. Cryptographic
    /// verification is the chain validator's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError`] naming the first unmet requirement.
    pub fn validate(&self, now: Timestamp) -> Result<(), MandateError> {
        if self.flow == PurchaseFlow::Immediate {
            return Ok(());
        }
        let constraints = self.constraints.ok_or(MandateError::MissingConstraints)?;
        constraints.validate()?;
        let expires_at = self.expires_at.ok_or(MandateError::MissingExpiration)?;
        let floor = now.checked_add_seconds(MIN_EXPIRATION_LEAD_SECS);
        let ceiling = now.checked_add_seconds(MAX_EXPIRATION_LEAD_SECS);
        if floor.is_none_or(|floor| expires_at <= floor) {
            return Err(MandateError::ExpirationTooSoon {
                expires_at,
                reference: now,
            });
        }
        if ceiling.is_none_or(|ceiling| expires_at > ceiling) {
            return Err(MandateError::ExpirationTooFar {
                expires_at,
                reference: now,
            });
        }
        let signature = self.signature.as_ref().ok_or(MandateError::MissingSignature)?;
        if signature.signer_role != SignerRole::User {
            return Err(MandateError::SignerRoleMismatch {
                expected: SignerRole::User,
                actual: signature.signer_role,
            });
        }
        if signature.signer_identity.as_str() != self.user_id.as_str() {
            return Err(MandateError::SignerIdentityMismatch {
                signer: signature.signer_identity.to_string(),
                user: self.user_id.to_string(),
            });
        }
        Ok(())
    }

    /// Returns true when the intent expiration has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

// ============================================================================
// SECTION: Cart Mandate
// ============================================================================

/// Individual product line in a cart.
///
/// # Invariants
/// - `line_total_cents` equals `quantity * unit_price_cents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier.
    pub product_id: ProductId,
    /// Product display name.
    pub product_name: String,
    /// Quantity ordered.
    pub quantity: u32,
    /// Unit price in cents.
    pub unit_price_cents: u64,
    /// Line total in cents.
    pub line_total_cents: u64,
}

impl LineItem {
    /// Creates a line item with its total computed from quantity and price.
    #[must_use]
    pub fn priced(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price_cents: u64,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price_cents,
            line_total_cents: u64::from(quantity) * unit_price_cents,
        }
    }
}

/// Cart total breakdown.
///
/// # Invariants
/// - `grand_total_cents` equals `subtotal + tax + shipping`.
/// - `subtotal_cents` equals the sum of line totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of line totals in cents.
    pub subtotal_cents: u64,
    /// Tax in cents.
    pub tax_cents: u64,
    /// Shipping in cents.
    pub shipping_cents: u64,
    /// Grand total in cents.
    pub grand_total_cents: u64,
    /// Totals currency.
    pub currency: Currency,
}

impl CartTotals {
    /// Creates totals with the grand total computed from its components.
    #[must_use]
    pub const fn from_parts(
        subtotal_cents: u64,
        tax_cents: u64,
        shipping_cents: u64,
        currency: Currency,
    ) -> Self {
        Self {
            subtotal_cents,
            tax_cents,
            shipping_cents,
            grand_total_cents: subtotal_cents + tax_cents + shipping_cents,
            currency,
        }
    }
}

/// Checks cart arithmetic: line totals, subtotal, and grand total.
fn check_cart_arithmetic(items: &[LineItem], totals: &CartTotals) -> Result<(), MandateError> {
    if items.is_empty() {
        return Err(MandateError::EmptyCart);
    }
    let mut expected_subtotal: u64 = 0;
    for item in items {
        let expected = u64::from(item.quantity) * item.unit_price_cents;
        if item.line_total_cents != expected {
            return Err(MandateError::LineTotalMismatch {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                actual: item.line_total_cents,
            });
        }
        expected_subtotal += item.line_total_cents;
    }
    if totals.subtotal_cents != expected_subtotal {
        return Err(MandateError::SubtotalMismatch {
            expected: expected_subtotal,
            actual: totals.subtotal_cents,
        });
    }
    let expected_grand = totals.subtotal_cents + totals.tax_cents + totals.shipping_cents;
    if totals.grand_total_cents != expected_grand {
        return Err(MandateError::GrandTotalMismatch {
            expected: expected_grand,
            actual: totals.grand_total_cents,
        });
    }
    Ok(())
}

/// Unsigned cart awaiting its single signature.
///
/// # Invariants
/// - Serializes with the same field names as [`Cart`] minus `signature`, so
///   the signed digest covers exactly the final record content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDraft {
    /// Cart identifier (`cart_hp_*` or `cart_hnp_*`).
    pub cart_id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// Line items.
    pub items: Vec<LineItem>,
    /// Total breakdown.
    pub totals: CartTotals,
    /// Merchant snapshot.
    pub merchant: MerchantRef,
    /// Delivery estimate in days.
    pub delivery_estimate_days: u32,
    /// Originating intent (mandatory for deferred carts).
    pub intent_ref: Option<IntentId>,
}

impl CartDraft {
    /// Builds a single-line-item deferred cart draft.
    ///
    /// The cart identifier derives from the intent, product, and build time,
    /// so repeated construction from the same inputs mints the same cart.
    #[must_use]
    pub fn single_item_deferred(
        user_id: UserId,
        intent_ref: IntentId,
        item: LineItem,
        totals: CartTotals,
        merchant: MerchantRef,
        delivery_estimate_days: u32,
        at: Timestamp,
    ) -> Self {
        let cart_id = CartId::derive(
            PurchaseFlow::Deferred,
            &[intent_ref.as_str(), item.product_id.as_str(), &at.to_string()],
        );
        Self {
            cart_id,
            user_id,
            items: vec![item],
            totals,
            merchant,
            delivery_estimate_days,
            intent_ref: Some(intent_ref),
        }
    }

    /// Validates cart arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError`] naming the first arithmetic violation.
    pub fn validate(&self) -> Result<(), MandateError> {
        check_cart_arithmetic(&self.items, &self.totals)
    }

    /// Signs the draft, producing an immutable [`Cart`].
    ///
    /// # Errors
    ///
    /// Returns [`MandateError`] when arithmetic validation or signing fails.
    pub fn sign(
        self,
        role: SignerRole,
        signer: &SignerId,
        at: Timestamp,
        keys: &SigningKeys,
    ) -> Result<Cart, MandateError> {
        self.validate()?;
        let signature = sign_record(&self, role, signer, at, keys)?;
        Ok(Cart {
            cart_id: self.cart_id,
            user_id: self.user_id,
            items: self.items,
            totals: self.totals,
            merchant: self.merchant,
            delivery_estimate_days: self.delivery_estimate_days,
            intent_ref: self.intent_ref,
            signature,
        })
    }
}

/// Cart mandate: a priced basket with exactly one signature.
///
/// # Invariants
/// - Immediate carts are user-signed; deferred carts are agent-signed and
///   reference their originating intent.
/// - Immutable once signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart identifier (`cart_hp_*` or `cart_hnp_*`).
    pub cart_id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// Line items.
    pub items: Vec<LineItem>,
    /// Total breakdown.
    pub totals: CartTotals,
    /// Merchant snapshot.
    pub merchant: MerchantRef,
    /// Delivery estimate in days.
    pub delivery_estimate_days: u32,
    /// Originating intent (mandatory for deferred carts).
    pub intent_ref: Option<IntentId>,
    /// The cart's single signature.
    pub signature: Signature,
}

impl Cart {
    /// Validates cart arithmetic defensively.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError`] naming the first arithmetic violation.
    pub fn validate(&self) -> Result<(), MandateError> {
        check_cart_arithmetic(&self.items, &self.totals)
    }
}

// ============================================================================
// SECTION: Payment Mandate
// ============================================================================

/// Unsigned payment awaiting the payment-authority signature.
///
/// # Invariants
/// - Serializes with the same field names as [`Payment`] minus `signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDraft {
    /// Payment identifier (`payment_*`).
    pub payment_id: PaymentId,
    /// Owning user.
    pub user_id: UserId,
    /// Referenced cart.
    pub cart_ref: CartId,
    /// Referenced intent, when part of a deferred chain.
    pub intent_ref: Option<IntentId>,
    /// Amount in cents; must equal the cart grand total.
    pub amount_cents: u64,
    /// Payment currency.
    pub currency: Currency,
    /// Tokenized payment credential.
    pub credential_token: CredentialToken,
    /// True when the purchase executes without the user present.
    pub unattended: bool,
    /// When the authorization request was created.
    pub created_at: Timestamp,
}

impl PaymentDraft {
    /// Builds a payment draft against a cart.
    #[must_use]
    pub fn for_cart(
        cart: &Cart,
        credential_token: CredentialToken,
        unattended: bool,
        at: Timestamp,
    ) -> Self {
        let payment_id =
            PaymentId::derive(&[cart.cart_id.as_str(), credential_token.as_str(), &at.to_string()]);
        Self {
            payment_id,
            user_id: cart.user_id.clone(),
            cart_ref: cart.cart_id.clone(),
            intent_ref: cart.intent_ref.clone(),
            amount_cents: cart.totals.grand_total_cents,
            currency: cart.totals.currency,
            credential_token,
            unattended,
            created_at: at,
        }
    }

    /// Signs the draft as the payment authority, producing a [`Payment`].
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the record cannot be canonicalized.
    pub fn sign(
        self,
        authority: &SignerId,
        at: Timestamp,
        keys: &SigningKeys,
    ) -> Result<Payment, SignatureError> {
        let signature = sign_record(&self, SignerRole::PaymentAuthority, authority, at, keys)?;
        Ok(Payment {
            payment_id: self.payment_id,
            user_id: self.user_id,
            cart_ref: self.cart_ref,
            intent_ref: self.intent_ref,
            amount_cents: self.amount_cents,
            currency: self.currency,
            credential_token: self.credential_token,
            unattended: self.unattended,
            created_at: self.created_at,
            signature,
        })
    }
}

/// Payment mandate: an authorization request against a cart.
///
/// # Invariants
/// - Always signed by the payment-authority role.
/// - `amount_cents` equals the referenced cart's grand total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier (`payment_*`).
    pub payment_id: PaymentId,
    /// Owning user.
    pub user_id: UserId,
    /// Referenced cart.
    pub cart_ref: CartId,
    /// Referenced intent, when part of a deferred chain.
    pub intent_ref: Option<IntentId>,
    /// Amount in cents; must equal the cart grand total.
    pub amount_cents: u64,
    /// Payment currency.
    pub currency: Currency,
    /// Tokenized payment credential.
    pub credential_token: CredentialToken,
    /// True when the purchase executes without the user present.
    pub unattended: bool,
    /// When the authorization request was created.
    pub created_at: Timestamp,
    /// Payment-authority signature.
    pub signature: Signature,
}

impl Payment {
    /// Validates the payment amount against its referenced cart.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError::AmountMismatch`] when the amounts differ.
    pub fn validate_against(&self, cart: &Cart) -> Result<(), MandateError> {
        if self.amount_cents != cart.totals.grand_total_cents {
            return Err(MandateError::AmountMismatch {
                amount_cents: self.amount_cents,
                grand_total_cents: cart.totals.grand_total_cents,
            });
        }
        Ok(())
    }
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
        reason = "Panic-based assertions are permitted in tests."
    )]

    use crate::core::signature::SecretKey;
    use crate::core::signature::verify_record;

    use super::*;

    /// Returns distinct per-role keys for tests.
    fn test_keys() -> SigningKeys {
        SigningKeys::new(
            SecretKey::from("user-secret-0123456789abcdef"),
            SecretKey::from("agent-secret-0123456789abcdef"),
            SecretKey::from("authority-secret-0123456789abcdef"),
        )
    }

    /// Returns a fixed reference time for tests.
    fn t0() -> Timestamp {
        Timestamp::from_unix_seconds(1_700_000_000).unwrap()
    }

    /// Returns standard deferred constraints for tests.
    const fn constraints() -> PurchaseConstraints {
        PurchaseConstraints {
            max_price_cents: 5_500,
            max_delivery_days: 7,
            currency: Currency::Usd,
        }
    }

    #[test]
    fn deferred_intent_validates_when_complete() {
        let now = t0();
        let expires = now.checked_add_seconds(7 * 86_400).unwrap();
        let intent =
            Intent::new_deferred(UserId::new("user_demo_001"), "coffee maker", constraints(), expires, now)
                .signed_as_user(now, &test_keys())
                .unwrap();
        intent.validate(now).unwrap();
        assert!(intent.intent_id.as_str().starts_with("intent_hnp_"));
    }

    #[test]
    fn unsigned_deferred_intent_is_rejected() {
        let now = t0();
        let expires = now.checked_add_seconds(7 * 86_400).unwrap();
        let intent =
            Intent::new_deferred(UserId::new("user_demo_001"), "coffee maker", constraints(), expires, now);
        assert!(matches!(intent.validate(now), Err(MandateError::MissingSignature)));
    }

    #[test]
    fn expiration_window_is_enforced() {
        let now = t0();
        let keys = test_keys();

        let soon = now.checked_add_seconds(MIN_EXPIRATION_LEAD_SECS - 1).unwrap();
        let intent =
            Intent::new_deferred(UserId::new("user_demo_001"), "coffee maker", constraints(), soon, now)
                .signed_as_user(now, &keys)
                .unwrap();
        assert!(matches!(intent.validate(now), Err(MandateError::ExpirationTooSoon { .. })));

        let far = now.checked_add_seconds(MAX_EXPIRATION_LEAD_SECS + 1).unwrap();
        let intent =
            Intent::new_deferred(UserId::new("user_demo_001"), "coffee maker", constraints(), far, now)
                .signed_as_user(now, &keys)
                .unwrap();
        assert!(matches!(intent.validate(now), Err(MandateError::ExpirationTooFar { .. })));
    }

    #[test]
    fn immediate_intent_needs_no_signature() {
        let now = t0();
        let intent = Intent::new_immediate(UserId::new("user_demo_001"), "desk lamp", now);
        intent.validate(now).unwrap();
        assert!(intent.intent_id.as_str().starts_with("intent_hp_"));
    }

    /// Returns a merchant snapshot for tests.
    fn merchant() -> MerchantRef {
        MerchantRef {
            merchant_id: "merchant_demo".to_string(),
            merchant_name: "Demo Store".to_string(),
            merchant_url: "https://demo.example.com".to_string(),
        }
    }

    #[test]
    fn cart_draft_signs_and_verifies() {
        let now = t0();
        let keys = test_keys();
        let item = LineItem::priced(ProductId::new("prod_coffee_001"), "Coffee Maker", 1, 4_000);
        let totals = CartTotals::from_parts(4_000, 320, 1_000, Currency::Usd);
        let draft = CartDraft::single_item_deferred(
            UserId::new("user_demo_001"),
            IntentId::new("intent_hnp_abc"),
            item,
            totals,
            merchant(),
            5,
            now,
        );
        let cart = draft.sign(SignerRole::Agent, &SignerId::new("delegate_agent"), now, &keys).unwrap();
        assert!(cart.cart_id.as_str().starts_with("cart_hnp_"));
        assert_eq!(cart.totals.grand_total_cents, 5_320);
        assert!(verify_record(&cart, &cart.signature, &keys, now));
    }

    #[test]
    fn cart_arithmetic_is_checked_at_signing() {
        let now = t0();
        let keys = test_keys();
        let mut item = LineItem::priced(ProductId::new("prod_coffee_001"), "Coffee Maker", 2, 4_000);
        item.line_total_cents = 4_000;
        let totals = CartTotals::from_parts(4_000, 320, 1_000, Currency::Usd);
        let draft = CartDraft::single_item_deferred(
            UserId::new("user_demo_001"),
            IntentId::new("intent_hnp_abc"),
            item,
            totals,
            merchant(),
            5,
            now,
        );
        let err = draft.sign(SignerRole::Agent, &SignerId::new("delegate_agent"), now, &keys);
        assert!(matches!(err, Err(MandateError::LineTotalMismatch { .. })));
    }

    #[test]
    fn grand_total_mismatch_is_detected() {
        let items =
            vec![LineItem::priced(ProductId::new("prod_coffee_001"), "Coffee Maker", 1, 4_000)];
        let mut totals = CartTotals::from_parts(4_000, 320, 1_000, Currency::Usd);
        totals.grand_total_cents = 9_999;
        assert!(matches!(
            check_cart_arithmetic(&items, &totals),
            Err(MandateError::GrandTotalMismatch { .. })
        ));
    }

    #[test]
    fn payment_amount_matches_cart() {
        let now = t0();
        let keys = test_keys();
        let item = LineItem::priced(ProductId::new("prod_coffee_001"), "Coffee Maker", 1, 4_000);
        let totals = CartTotals::from_parts(4_000, 320, 1_000, Currency::Usd);
        let cart = CartDraft::single_item_deferred(
            UserId::new("user_demo_001"),
            IntentId::new("intent_hnp_abc"),
            item,
            totals,
            merchant(),
            5,
            now,
        )
        .sign(SignerRole::Agent, &SignerId::new("delegate_agent"), now, &keys)
        .unwrap();
        let payment = PaymentDraft::for_cart(&cart, CredentialToken::new("tok_visa_4242"), true, now)
            .sign(&SignerId::new("payment_authority"), now, &keys)
            .unwrap();
        assert!(payment.payment_id.as_str().starts_with("payment_"));
        assert_eq!(payment.amount_cents, 5_320);
        payment.validate_against(&cart).unwrap();
        assert!(verify_record(&payment, &payment.signature, &keys, now));
    }
}
