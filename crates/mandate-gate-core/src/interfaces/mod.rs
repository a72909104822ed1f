// crates/mandate-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Mandate Gate Interfaces
// Description: Backend-agnostic interfaces for catalog, payment, credentials, and storage.
// Purpose: Define the contract surfaces used by the coordinator and scheduler.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Mandate Gate integrates with external collaborators
//! without embedding backend-specific details. Implementations must fail
//! closed on missing or invalid data, and every external call is expected to
//! carry a bounded timeout owned by the implementation.
//!
//! The exactly-once guard rests entirely on [`MonitorJobStore::claim`]: an
//! atomic compare-and-set on a job's active flag that must be transactional
//! with respect to concurrent readers of the same job id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CartId;
use crate::core::identifiers::CredentialToken;
use crate::core::identifiers::IntentId;
use crate::core::identifiers::PaymentId;
use crate::core::identifiers::ProductId;
use crate::core::identifiers::TransactionId;
use crate::core::identifiers::UserId;
use crate::core::job::MonitorJob;
use crate::core::job::TerminalReason;
use crate::core::mandate::Cart;
use crate::core::mandate::Currency;
use crate::core::mandate::Intent;
use crate::core::mandate::Payment;
use crate::core::time::Timestamp;
use crate::core::transaction::Transaction;

// ============================================================================
// SECTION: Catalog Provider
// ============================================================================

/// Stock status reported by the catalog.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// Product is available for purchase.
    InStock,
    /// Product is not currently available.
    OutOfStock,
}

/// One purchase candidate returned by a catalog query.
///
/// # Invariants
/// - Values are a point-in-time snapshot; candidates are re-queried per check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    /// Product identifier.
    pub product_id: ProductId,
    /// Product display name.
    pub product_name: String,
    /// Sticker price in cents (before tax and shipping).
    pub price_cents: u64,
    /// Stock status.
    pub stock: StockStatus,
    /// Delivery estimate in days.
    pub delivery_estimate_days: u32,
}

/// Catalog collaborator errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog backend reported an error.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    /// Catalog call exceeded its bounded timeout.
    #[error("catalog timed out: {0}")]
    Timeout(String),
}

/// Backend-agnostic product catalog.
///
/// The returned order is load-bearing: candidate selection takes the first
/// match in catalog order, so implementations must return a stable ordering.
pub trait CatalogProvider: Send + Sync {
    /// Searches the catalog for candidates matching a query.
    ///
    /// `max_unit_price_cents`, when set, bounds the sticker price of returned
    /// candidates; constraint enforcement against the landed cost remains the
    /// caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn search(
        &self,
        query: &str,
        max_unit_price_cents: Option<u64>,
    ) -> Result<Vec<CatalogCandidate>, CatalogError>;
}

// ============================================================================
// SECTION: Payment Authority
// ============================================================================

/// Metadata attached to an authorization request.
///
/// # Invariants
/// - Identifiers refer to the same chain the amount was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// Owning user.
    pub user_id: UserId,
    /// Cart the amount was computed from.
    pub cart_ref: CartId,
    /// Originating intent, when part of a deferred chain.
    pub intent_ref: Option<IntentId>,
}

/// Result of a payment authorization attempt.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthorizationOutcome {
    /// Payment was authorized.
    Authorized {
        /// Authorization code issued by the authority.
        authorization_code: String,
    },
    /// Payment was declined.
    Declined {
        /// Standardized decline reason.
        reason: String,
    },
}

/// Payment authority errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PaymentAuthorityError {
    /// Payment authority reported an error.
    #[error("payment authority unavailable: {0}")]
    Unavailable(String),
    /// Authorization call exceeded its bounded timeout.
    #[error("payment authority timed out: {0}")]
    Timeout(String),
}

/// Backend-agnostic payment authorization gateway.
///
/// Operates on tokenized credentials only; the approval decision itself is
/// opaque to the core.
pub trait PaymentAuthority: Send + Sync {
    /// Requests authorization for an amount against a tokenized credential.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentAuthorityError`] when the authority cannot be reached;
    /// declines are an [`AuthorizationOutcome`], not an error.
    fn authorize(
        &self,
        token: &CredentialToken,
        amount_cents: u64,
        currency: Currency,
        metadata: &PaymentMetadata,
    ) -> Result<AuthorizationOutcome, PaymentAuthorityError>;
}

// ============================================================================
// SECTION: Credentials Provider
// ============================================================================

/// Tokenized payment method returned by the credentials collaborator.
///
/// # Invariants
/// - `token` is a tokenized reference (`tok_*`); raw card data never appears.
/// - Exactly one method per user is flagged default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Tokenized credential reference.
    pub token: CredentialToken,
    /// Card network or method kind label.
    pub kind: String,
    /// Last four digits for display.
    pub last_four: String,
    /// Expiration month (1-12).
    pub expiry_month: u8,
    /// Expiration year.
    pub expiry_year: u16,
    /// True for the user's default method.
    pub is_default: bool,
}

/// Credentials collaborator errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No payment methods are configured for the user.
    #[error("no payment methods available for user {0}")]
    NoMethods(UserId),
    /// Credentials backend reported an error.
    #[error("credentials provider unavailable: {0}")]
    Unavailable(String),
}

/// Backend-agnostic tokenized credentials provider.
pub trait CredentialsProvider: Send + Sync {
    /// Returns the user's tokenized payment methods.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError`] when methods cannot be retrieved.
    fn methods_for(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, CredentialsError>;

    /// Returns the user's default payment method, when one is flagged.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError`] when methods cannot be retrieved.
    fn default_method(&self, user_id: &UserId) -> Result<Option<PaymentMethod>, CredentialsError> {
        let methods = self.methods_for(user_id)?;
        Ok(methods.into_iter().find(|method| method.is_default))
    }
}

// ============================================================================
// SECTION: Mandate Store
// ============================================================================

/// Mandate store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("mandate store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("mandate store corruption: {0}")]
    Corrupt(String),
    /// Record already exists; mandates are append-only.
    #[error("mandate store duplicate record: {0}")]
    Duplicate(String),
    /// Store data is invalid.
    #[error("mandate store invalid data: {0}")]
    Invalid(String),
}

/// Append-only persistence contract for mandates and transactions.
///
/// Records are immutable once inserted; a second insert under the same
/// identifier is a [`StoreError::Duplicate`].
pub trait MandateStore: Send + Sync {
    /// Persists an intent mandate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_intent(&self, intent: &Intent) -> Result<(), StoreError>;

    /// Loads an intent mandate by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_intent(&self, intent_id: &IntentId) -> Result<Option<Intent>, StoreError>;

    /// Persists a cart mandate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError>;

    /// Loads a cart mandate by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, StoreError>;

    /// Persists a payment mandate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Loads a payment mandate by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError>;

    /// Persists a transaction record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Loads a transaction record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Lists transactions for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_transactions_for(&self, user_id: &UserId) -> Result<Vec<Transaction>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Monitor Job Store
// ============================================================================

/// Monitor job store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// Store I/O error.
    #[error("job store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("job store corruption: {0}")]
    Corrupt(String),
    /// Referenced job does not exist.
    #[error("job store missing job: {0}")]
    NotFound(String),
    /// Store data is invalid.
    #[error("job store invalid data: {0}")]
    Invalid(String),
}

/// Durable store for monitoring jobs.
///
/// The exactly-once guard depends only on this interface offering an atomic
/// compare-and-set on the active flag ([`MonitorJobStore::claim`]).
pub trait MonitorJobStore: Send + Sync {
    /// Inserts or replaces a job record.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when the write fails.
    fn upsert_job(&self, job: &MonitorJob) -> Result<(), JobStoreError>;

    /// Loads a job by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when loading fails.
    fn load_job(&self, job_id: &IntentId) -> Result<Option<MonitorJob>, JobStoreError>;

    /// Lists all active jobs.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when listing fails.
    fn list_active_jobs(&self) -> Result<Vec<MonitorJob>, JobStoreError>;

    /// Records a check timestamp for a job.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when the write fails.
    fn record_check(&self, job_id: &IntentId, at: Timestamp) -> Result<(), JobStoreError>;

    /// Atomically flips the job's active flag from true to false.
    ///
    /// Returns `true` when this caller performed the flip and `false` when
    /// the job was already inactive (or absent). This is the exactly-once
    /// guard: of any number of concurrent claims for the same job id,
    /// exactly one observes `true`.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when the store cannot perform the
    /// read-modify-write atomically.
    fn claim(&self, job_id: &IntentId) -> Result<bool, JobStoreError>;

    /// Tags a job with its terminal reason after its outcome is known.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when the write fails.
    fn tag_terminal(&self, job_id: &IntentId, reason: TerminalReason) -> Result<(), JobStoreError>;

    /// Deactivates an active job and tags it in one atomic step.
    ///
    /// Returns `true` when this caller performed the transition; used for
    /// cancellation and expiry, where the reason is known up front.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when the write fails.
    fn deactivate(
        &self,
        job_id: &IntentId,
        reason: TerminalReason,
    ) -> Result<bool, JobStoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), JobStoreError> {
        Ok(())
    }
}
