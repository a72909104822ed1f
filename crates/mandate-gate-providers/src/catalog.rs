// crates/mandate-gate-providers/src/catalog.rs
// ============================================================================
// Module: Static Catalog Provider
// Description: In-process product catalog with adjustable live conditions.
// Purpose: Provide a deterministic catalog collaborator for tests and demos.
// Dependencies: mandate-gate-core, serde
// ============================================================================

//! ## Overview
//! [`StaticCatalog`] serves a fixed product set in insertion order; the
//! order is load-bearing, since candidate selection takes the first match.
//! Prices and stock are adjustable at runtime so deferred-purchase conditions
//! (a price drop, restock) can be simulated without a real merchant backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use mandate_gate_core::CatalogCandidate;
use mandate_gate_core::CatalogError;
use mandate_gate_core::CatalogProvider;
use mandate_gate_core::ProductId;
use mandate_gate_core::StockStatus;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Products
// ============================================================================

/// One product served by the static catalog.
///
/// # Invariants
/// - `price_cents` is the sticker price before tax and shipping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Product identifier.
    pub product_id: ProductId,
    /// Product display name.
    pub name: String,
    /// Product description matched by queries.
    pub description: String,
    /// Category label.
    pub category: String,
    /// Sticker price in cents.
    pub price_cents: u64,
    /// Stock status.
    pub stock: StockStatus,
    /// Delivery estimate in days.
    pub delivery_estimate_days: u32,
}

// ============================================================================
// SECTION: Static Catalog
// ============================================================================

/// In-process catalog over a fixed, mutable product list.
///
/// # Invariants
/// - Search results preserve insertion order.
#[derive(Debug)]
pub struct StaticCatalog {
    /// Guarded product list.
    products: Mutex<Vec<CatalogProduct>>,
}

impl StaticCatalog {
    /// Creates a catalog over the provided products.
    #[must_use]
    pub fn new(products: Vec<CatalogProduct>) -> Self {
        Self {
            products: Mutex::new(products),
        }
    }

    /// Creates the built-in demo catalog.
    #[must_use]
    pub fn demo() -> Self {
        /// Shorthand for one demo product row.
        fn product(
            id: &str,
            name: &str,
            description: &str,
            category: &str,
            price_cents: u64,
            stock: StockStatus,
            delivery_estimate_days: u32,
        ) -> CatalogProduct {
            CatalogProduct {
                product_id: ProductId::new(id),
                name: name.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                price_cents,
                stock,
                delivery_estimate_days,
            }
        }
        Self::new(vec![
            product(
                "prod_airpods_001",
                "Apple AirPods Pro",
                "Active noise cancellation, wireless charging case",
                "Electronics",
                24_900,
                StockStatus::InStock,
                1,
            ),
            product(
                "prod_headphones_001",
                "Sony WH-1000XM5 Headphones",
                "Industry-leading noise canceling headphones",
                "Electronics",
                39_900,
                StockStatus::InStock,
                2,
            ),
            product(
                "prod_tablet_001",
                "Samsung Galaxy Tab S9",
                "11-inch Android tablet with S Pen",
                "Electronics",
                79_900,
                StockStatus::OutOfStock,
                7,
            ),
            product(
                "prod_coffee_001",
                "Philips HD7462 Coffee Maker",
                "12-cup programmable coffee maker with timer",
                "Kitchen",
                6_900,
                StockStatus::InStock,
                2,
            ),
            product(
                "prod_blender_001",
                "Ninja Professional Blender",
                "1000-watt blender with 72oz pitcher",
                "Kitchen",
                8_999,
                StockStatus::InStock,
                1,
            ),
            product(
                "prod_sneakers_001",
                "Nike Air Max 270",
                "Men's running shoes, size 10",
                "Fashion",
                14_999,
                StockStatus::InStock,
                2,
            ),
            product(
                "prod_vacuum_001",
                "Dyson V11 Cordless Vacuum",
                "Powerful cordless vacuum with LCD screen",
                "Home",
                59_999,
                StockStatus::InStock,
                2,
            ),
            product(
                "prod_lamp_001",
                "Modern LED Desk Lamp",
                "Adjustable brightness and color temperature",
                "Home",
                4_599,
                StockStatus::InStock,
                1,
            ),
        ])
    }

    /// Locks the product list, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, Vec<CatalogProduct>> {
        self.products.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a product's sticker price; returns false for unknown products.
    ///
    /// Used to simulate the price movement a monitoring job is waiting for.
    pub fn set_price(&self, product_id: &ProductId, price_cents: u64) -> bool {
        let mut products = self.lock();
        match products.iter_mut().find(|product| &product.product_id == product_id) {
            Some(product) => {
                product.price_cents = price_cents;
                true
            }
            None => false,
        }
    }

    /// Sets a product's stock status; returns false for unknown products.
    pub fn set_stock(&self, product_id: &ProductId, stock: StockStatus) -> bool {
        let mut products = self.lock();
        match products.iter_mut().find(|product| &product.product_id == product_id) {
            Some(product) => {
                product.stock = stock;
                true
            }
            None => false,
        }
    }
}

impl CatalogProvider for StaticCatalog {
    fn search(
        &self,
        query: &str,
        max_unit_price_cents: Option<u64>,
    ) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let needle = query.trim().to_lowercase();
        let products = self.lock();
        let candidates = products
            .iter()
            .filter(|product| {
                needle.is_empty()
                    || product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            })
            .filter(|product| {
                max_unit_price_cents.is_none_or(|ceiling| product.price_cents <= ceiling)
            })
            .map(|product| CatalogCandidate {
                product_id: product.product_id.clone(),
                product_name: product.name.clone(),
                price_cents: product.price_cents,
                stock: product.stock,
                delivery_estimate_days: product.delivery_estimate_days,
            })
            .collect();
        Ok(candidates)
    }
}
