// crates/mandate-gate-core/src/runtime/pricing.rs
// ============================================================================
// Module: Pricing Policy
// Description: Landed-cost arithmetic shared by selection and validation.
// Purpose: Keep candidate selection and cart construction numerically identical.
// Dependencies: crate::core::mandate
// ============================================================================

//! ## Overview
//! Price constraints apply to the realized landed cost (sticker price plus
//! tax plus flat shipping), never the sticker price alone. The same integer formula
//! builds cart totals and screens candidates, so a candidate accepted by
//! selection always produces a cart that passes constraint validation.
//! Tax rate and shipping are system-wide configuration, defaulting to 8%
//! (800 basis points) and 1000 cents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::mandate::CartTotals;
use crate::core::mandate::Currency;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Basis points in a whole.
const BPS_SCALE: u64 = 10_000;
/// Default tax rate in basis points (8%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 800;
/// Default flat shipping in cents.
pub const DEFAULT_FLAT_SHIPPING_CENTS: u64 = 1_000;

// ============================================================================
// SECTION: Pricing Policy
// ============================================================================

/// System-wide tax and shipping policy.
///
/// # Invariants
/// - All arithmetic is integer math with floor division; selection and cart
///   construction must produce identical values from identical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Tax rate in basis points.
    pub tax_rate_bps: u32,
    /// Flat shipping in cents.
    pub flat_shipping_cents: u64,
    /// Currency for all computed totals.
    pub currency: Currency,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            flat_shipping_cents: DEFAULT_FLAT_SHIPPING_CENTS,
            currency: Currency::Usd,
        }
    }
}

impl PricingPolicy {
    /// Returns the tax for a subtotal, floored.
    #[must_use]
    pub const fn tax_for(&self, subtotal_cents: u64) -> u64 {
        subtotal_cents * self.tax_rate_bps as u64 / BPS_SCALE
    }

    /// Returns the landed cost for a sticker price: price + tax + shipping.
    #[must_use]
    pub const fn landed_cost(&self, unit_price_cents: u64) -> u64 {
        unit_price_cents + self.tax_for(unit_price_cents) + self.flat_shipping_cents
    }

    /// Builds cart totals for a subtotal under this policy.
    #[must_use]
    pub const fn totals_for(&self, subtotal_cents: u64) -> CartTotals {
        CartTotals::from_parts(
            subtotal_cents,
            self.tax_for(subtotal_cents),
            self.flat_shipping_cents,
            self.currency,
        )
    }

    /// Returns the highest sticker price whose landed cost fits a ceiling.
    ///
    /// Inverts the landed-cost formula with floor division; used to bound
    /// catalog queries so obviously-unaffordable candidates are filtered at
    /// the source.
    #[must_use]
    pub const fn max_unit_price(&self, max_landed_cents: u64) -> u64 {
        max_landed_cents.saturating_sub(self.flat_shipping_cents) * BPS_SCALE
            / (BPS_SCALE + self.tax_rate_bps as u64)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
