// crates/mandate-gate-core/src/core/transaction.rs
// ============================================================================
// Module: Transaction Records
// Description: Append-only outcome records for attempted payments.
// Purpose: Anchor the audit trail linking intent, cart, and payment mandates.
// Dependencies: crate::core::{identifiers, mandate, time}, serde
// ============================================================================

//! ## Overview
//! A [`Transaction`] is the durable record of one attempted payment's
//! outcome. It is created exactly once per completed attempt and never
//! mutated afterward; together with the mandate id triple it carries, it is
//! the anchor every audit walks back from.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CartId;
use crate::core::identifiers::IntentId;
use crate::core::identifiers::PaymentId;
use crate::core::identifiers::TransactionId;
use crate::core::identifiers::UserId;
use crate::core::mandate::Currency;
use crate::core::mandate::Payment;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Transaction Status
// ============================================================================

/// Outcome status of an attempted payment.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Payment authority approved the payment.
    Authorized,
    /// Payment authority declined the payment.
    Declined,
    /// Authorization lapsed before completion.
    Expired,
    /// The attempt failed after the exactly-once guard was consumed.
    Failed,
}

impl TransactionStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Declined => "declined",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Transaction Record
// ============================================================================

/// Durable, append-only record of an attempted payment's outcome.
///
/// # Invariants
/// - Created exactly once per completed attempt; never mutated afterward.
/// - `authorization_code` is present only for authorized outcomes;
///   `decline_reason` only for declined or failed outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier (`txn_*`).
    pub transaction_id: TransactionId,
    /// Referenced intent, when part of a deferred chain.
    pub intent_ref: Option<IntentId>,
    /// Referenced cart.
    pub cart_ref: CartId,
    /// Referenced payment.
    pub payment_ref: PaymentId,
    /// Owning user.
    pub user_id: UserId,
    /// Outcome status.
    pub status: TransactionStatus,
    /// Authorization code, present on success.
    pub authorization_code: Option<String>,
    /// Decline or failure reason, present otherwise.
    pub decline_reason: Option<String>,
    /// Amount in cents.
    pub amount_cents: u64,
    /// Transaction currency.
    pub currency: Currency,
    /// When the outcome was recorded.
    pub created_at: Timestamp,
}

impl Transaction {
    /// Records an outcome for a payment attempt.
    #[must_use]
    pub fn for_payment(
        payment: &Payment,
        status: TransactionStatus,
        authorization_code: Option<String>,
        decline_reason: Option<String>,
        at: Timestamp,
    ) -> Self {
        let transaction_id =
            TransactionId::derive(&[payment.payment_id.as_str(), status.as_str(), &at.to_string()]);
        Self {
            transaction_id,
            intent_ref: payment.intent_ref.clone(),
            cart_ref: payment.cart_ref.clone(),
            payment_ref: payment.payment_id.clone(),
            user_id: payment.user_id.clone(),
            status,
            authorization_code,
            decline_reason,
            amount_cents: payment.amount_cents,
            currency: payment.currency,
            created_at: at,
        }
    }
}
