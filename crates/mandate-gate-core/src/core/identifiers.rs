// crates/mandate-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Mandate Gate Identifiers
// Description: Canonical opaque identifiers for mandates, users, and products.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout Mandate Gate.
//! Identifiers are opaque and serialize as strings on the wire. Mandate
//! identifiers carry a kind prefix (and, for intents and carts, a flow tag)
//! so records are attributable to a flow without loading their bodies:
//! `intent_hp_*`/`intent_hnp_*`, `cart_hp_*`/`cart_hnp_*`, `payment_*`,
//! `txn_*`. Fresh identifiers derive their suffix from a content digest so
//! minting stays deterministic and replayable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Flow Tag
// ============================================================================

/// Purchase flow tag shared by identifiers and mandate scenarios.
///
/// # Invariants
/// - Variants are stable for serialization and identifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseFlow {
    /// Purchase authorized and executed in the same interaction.
    Immediate,
    /// Purchase pre-authorized via a signed intent and executed autonomously.
    Deferred,
}

impl PurchaseFlow {
    /// Returns the identifier infix for the flow (`hp` or `hnp`).
    #[must_use]
    pub const fn id_tag(self) -> &'static str {
        match self {
            Self::Immediate => "hp",
            Self::Deferred => "hnp",
        }
    }

    /// Returns a stable label for the flow.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Deferred => "deferred",
        }
    }
}

impl fmt::Display for PurchaseFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Digest Suffixes
// ============================================================================

/// Length of the hex suffix derived for fresh identifiers.
const ID_SUFFIX_LEN: usize = 16;

/// Derives a deterministic identifier suffix from the provided parts.
///
/// The suffix is the leading hex of a SHA-256 digest over the parts joined
/// with `|`, so identical inputs always mint identical identifiers.
#[must_use]
pub fn digest_suffix(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            hasher.update(b"|");
        }
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for byte in digest.iter().take(ID_SUFFIX_LEN / 2) {
        suffix.push_str(&format!("{byte:02x}"));
    }
    suffix
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Declares a string-backed identifier newtype in the canonical shape.
macro_rules! string_identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_identifier! {
    /// User identifier owning intents, carts, and transactions.
    UserId
}

string_identifier! {
    /// Product identifier within the catalog collaborator.
    ProductId
}

string_identifier! {
    /// Signer identity recorded inside a signature (user, agent, or authority id).
    SignerId
}

string_identifier! {
    /// Tokenized payment credential reference (`tok_*`); never raw card data.
    CredentialToken
}

string_identifier! {
    /// Intent mandate identifier (`intent_hp_*` or `intent_hnp_*`).
    IntentId
}

string_identifier! {
    /// Cart mandate identifier (`cart_hp_*` or `cart_hnp_*`).
    CartId
}

string_identifier! {
    /// Payment mandate identifier (`payment_*`).
    PaymentId
}

string_identifier! {
    /// Transaction record identifier (`txn_*`).
    TransactionId
}

impl IntentId {
    /// Mints a flow-tagged intent identifier from a content digest.
    #[must_use]
    pub fn derive(flow: PurchaseFlow, parts: &[&str]) -> Self {
        Self(format!("intent_{}_{}", flow.id_tag(), digest_suffix(parts)))
    }

    /// Returns the flow encoded in the identifier prefix, when present.
    #[must_use]
    pub fn flow(&self) -> Option<PurchaseFlow> {
        flow_from_prefix(&self.0, "intent_")
    }
}

impl CartId {
    /// Mints a flow-tagged cart identifier from a content digest.
    #[must_use]
    pub fn derive(flow: PurchaseFlow, parts: &[&str]) -> Self {
        Self(format!("cart_{}_{}", flow.id_tag(), digest_suffix(parts)))
    }

    /// Returns the flow encoded in the identifier prefix, when present.
    #[must_use]
    pub fn flow(&self) -> Option<PurchaseFlow> {
        flow_from_prefix(&self.0, "cart_")
    }
}

impl PaymentId {
    /// Mints a payment identifier from a content digest.
    #[must_use]
    pub fn derive(parts: &[&str]) -> Self {
        Self(format!("payment_{}", digest_suffix(parts)))
    }
}

impl TransactionId {
    /// Mints a transaction identifier from a content digest.
    #[must_use]
    pub fn derive(parts: &[&str]) -> Self {
        Self(format!("txn_{}", digest_suffix(parts)))
    }
}

/// Parses the flow tag following a mandate kind prefix.
fn flow_from_prefix(id: &str, prefix: &str) -> Option<PurchaseFlow> {
    let rest = id.strip_prefix(prefix)?;
    if rest.starts_with("hnp_") {
        Some(PurchaseFlow::Deferred)
    } else if rest.starts_with("hp_") {
        Some(PurchaseFlow::Immediate)
    } else {
        None
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use super::*;

    #[test]
    fn digest_suffix_is_deterministic() {
        let a = digest_suffix(&["intent_hnp_abc", "prod_1"]);
        let b = digest_suffix(&["intent_hnp_abc", "prod_1"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_SUFFIX_LEN);
    }

    #[test]
    fn digest_suffix_separates_parts() {
        let joined = digest_suffix(&["ab", "c"]);
        let shifted = digest_suffix(&["a", "bc"]);
        assert_ne!(joined, shifted);
    }

    #[test]
    fn intent_id_round_trips_flow() {
        let deferred = IntentId::derive(PurchaseFlow::Deferred, &["user_1", "query"]);
        assert!(deferred.as_str().starts_with("intent_hnp_"));
        assert_eq!(deferred.flow(), Some(PurchaseFlow::Deferred));

        let immediate = IntentId::derive(PurchaseFlow::Immediate, &["user_1", "query"]);
        assert!(immediate.as_str().starts_with("intent_hp_"));
        assert_eq!(immediate.flow(), Some(PurchaseFlow::Immediate));
    }

    #[test]
    fn unprefixed_id_has_no_flow() {
        let id = CartId::new("cart_other_abc");
        assert_eq!(id.flow(), None);
    }
}
