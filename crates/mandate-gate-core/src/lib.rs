// crates/mandate-gate-core/src/lib.rs
// ============================================================================
// Module: Mandate Gate Core
// Description: Mandate chain validation engine and purchase coordination core.
// Purpose: Expose the deterministic domain model, interfaces, and runtime.
// Dependencies: hmac, serde, serde_jcs, serde_json, sha2, subtle, thiserror, time
// ============================================================================

//! ## Overview
//! Mandate Gate lets a user pre-authorize a future purchase bounded by
//! explicit constraints and delegates the timing decision to an autonomous
//! process. This crate is the deterministic core: signature creation and
//! verification over structured authorization records, chain-linkage and
//! constraint validation between those records, and the coordinator that
//! evaluates live conditions and executes a guarded, exactly-once purchase.
//!
//! The core never reads wall-clock time and performs no I/O of its own;
//! hosts supply timestamps and collaborator implementations through the
//! [`interfaces`] module.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod memory;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::chain::ChainReport;
pub use crate::core::chain::ChainValidator;
pub use crate::core::chain::Violation;
pub use crate::core::identifiers::CartId;
pub use crate::core::identifiers::CredentialToken;
pub use crate::core::identifiers::IntentId;
pub use crate::core::identifiers::PaymentId;
pub use crate::core::identifiers::ProductId;
pub use crate::core::identifiers::PurchaseFlow;
pub use crate::core::identifiers::SignerId;
pub use crate::core::identifiers::TransactionId;
pub use crate::core::identifiers::UserId;
pub use crate::core::job::MonitorJob;
pub use crate::core::job::TerminalReason;
pub use crate::core::mandate::Cart;
pub use crate::core::mandate::CartDraft;
pub use crate::core::mandate::CartTotals;
pub use crate::core::mandate::Currency;
pub use crate::core::mandate::Intent;
pub use crate::core::mandate::LineItem;
pub use crate::core::mandate::MandateError;
pub use crate::core::mandate::MerchantRef;
pub use crate::core::mandate::Payment;
pub use crate::core::mandate::PaymentDraft;
pub use crate::core::mandate::PurchaseConstraints;
pub use crate::core::signature::SecretKey;
pub use crate::core::signature::Signature;
pub use crate::core::signature::SignatureAlgorithm;
pub use crate::core::signature::SignatureError;
pub use crate::core::signature::SignerRole;
pub use crate::core::signature::SigningKeys;
pub use crate::core::signature::canonical_bytes;
pub use crate::core::signature::sign_record;
pub use crate::core::signature::verify_record;
pub use crate::core::time::TimeError;
pub use crate::core::time::Timestamp;
pub use crate::core::transaction::Transaction;
pub use crate::core::transaction::TransactionStatus;
pub use crate::interfaces::AuthorizationOutcome;
pub use crate::interfaces::CatalogCandidate;
pub use crate::interfaces::CatalogError;
pub use crate::interfaces::CatalogProvider;
pub use crate::interfaces::CredentialsError;
pub use crate::interfaces::CredentialsProvider;
pub use crate::interfaces::JobStoreError;
pub use crate::interfaces::MandateStore;
pub use crate::interfaces::MonitorJobStore;
pub use crate::interfaces::PaymentAuthority;
pub use crate::interfaces::PaymentAuthorityError;
pub use crate::interfaces::PaymentMetadata;
pub use crate::interfaces::PaymentMethod;
pub use crate::interfaces::StockStatus;
pub use crate::interfaces::StoreError;
pub use crate::memory::MemoryJobStore;
pub use crate::memory::MemoryMandateStore;
pub use crate::runtime::coordinator::CoordinatorBuildError;
pub use crate::runtime::coordinator::CoordinatorConfig;
pub use crate::runtime::coordinator::CoordinatorError;
pub use crate::runtime::coordinator::EvaluationOutcome;
pub use crate::runtime::coordinator::NoMatchReason;
pub use crate::runtime::coordinator::PurchaseCoordinator;
pub use crate::runtime::coordinator::PurchaseCoordinatorBuilder;
pub use crate::runtime::pricing::PricingPolicy;
