// crates/mandate-gate-core/src/runtime/coordinator.rs
// ============================================================================
// Module: Autonomous Purchase Coordinator
// Description: Condition evaluation and guarded, exactly-once purchase execution.
// Purpose: Execute a deferred authorization only within its signed bounds.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The coordinator evaluates whether live catalog conditions satisfy a
//! deferred authorization and, when they do, executes the guarded purchase.
//! Selection scans candidates in catalog order and takes the first whose
//! landed cost, delivery estimate, and stock status all fit the constraints.
//!
//! Ordering is the safety story: everything that can fail transiently
//! (catalog query, cart construction, chain re-validation, credential
//! lookup) happens *before* the exactly-once claim, so those failures leave the job
//! active for the next tick. Only after the claim commits does the
//! coordinator touch the payment authority, and from that point every
//! outcome, success or not, is terminal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::chain::ChainValidator;
use crate::core::chain::Violation;
use crate::core::identifiers::IntentId;
use crate::core::identifiers::SignerId;
use crate::core::identifiers::TransactionId;
use crate::core::identifiers::UserId;
use crate::core::job::MonitorJob;
use crate::core::job::TerminalReason;
use crate::core::mandate::Cart;
use crate::core::mandate::CartDraft;
use crate::core::mandate::LineItem;
use crate::core::mandate::MandateError;
use crate::core::mandate::MerchantRef;
use crate::core::mandate::PaymentDraft;
use crate::core::mandate::PurchaseConstraints;
use crate::core::signature::SignatureError;
use crate::core::signature::SignerRole;
use crate::core::signature::SigningKeys;
use crate::core::time::Timestamp;
use crate::core::transaction::Transaction;
use crate::core::transaction::TransactionStatus;
use crate::interfaces::AuthorizationOutcome;
use crate::interfaces::CatalogCandidate;
use crate::interfaces::CatalogError;
use crate::interfaces::CatalogProvider;
use crate::interfaces::CredentialsError;
use crate::interfaces::CredentialsProvider;
use crate::interfaces::JobStoreError;
use crate::interfaces::MandateStore;
use crate::interfaces::MonitorJobStore;
use crate::interfaces::PaymentAuthority;
use crate::interfaces::PaymentAuthorityError;
use crate::interfaces::PaymentMetadata;
use crate::interfaces::PaymentMethod;
use crate::interfaces::StockStatus;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Coordinator identity and pricing configuration.
///
/// # Invariants
/// - `agent_id` signs deferred carts; `authority_id` signs payments.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Pricing policy shared by selection and cart construction.
    pub pricing: crate::runtime::pricing::PricingPolicy,
    /// Signer identity for the autonomous delegate.
    pub agent_id: SignerId,
    /// Signer identity for the payment authority.
    pub authority_id: SignerId,
    /// Merchant snapshot recorded on coordinator-built carts.
    pub merchant: MerchantRef,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pricing: crate::runtime::pricing::PricingPolicy::default(),
            agent_id: SignerId::new("delegate_agent"),
            authority_id: SignerId::new("payment_authority"),
            merchant: MerchantRef {
                merchant_id: "merchant_mandate_gate".to_string(),
                merchant_name: "Mandate Gate Store".to_string(),
                merchant_url: "https://store.mandate-gate.example".to_string(),
            },
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Diagnostic reason for a no-op evaluation.
///
/// # Invariants
/// - Variants are stable for serialization and telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    /// The catalog returned no candidates for the query.
    NoCandidates,
    /// The leading candidate's landed cost exceeds the price constraint.
    PriceTooHigh,
    /// The leading candidate's delivery estimate exceeds the constraint.
    DeliveryTooSlow,
    /// The leading candidate is out of stock.
    OutOfStock,
}

impl NoMatchReason {
    /// Returns a stable label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoCandidates => "no_candidates",
            Self::PriceTooHigh => "price_too_high",
            Self::DeliveryTooSlow => "delivery_too_slow",
            Self::OutOfStock => "out_of_stock",
        }
    }
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one coordinator evaluation.
///
/// # Invariants
/// - `Purchased`, `Declined`, and `IntentExpired` are terminal for the job;
///   `NoMatch` and `AlreadyClaimed` leave the job untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// The purchase executed and was authorized.
    Purchased {
        /// Transaction recording the outcome.
        transaction_id: TransactionId,
        /// Authorization code issued by the payment authority.
        authorization_code: String,
        /// Authorized amount in cents.
        amount_cents: u64,
    },
    /// The purchase executed and was declined; terminal, never retried.
    Declined {
        /// Transaction recording the outcome.
        transaction_id: TransactionId,
        /// Standardized decline reason.
        reason: String,
    },
    /// No candidate satisfied the constraints; the job stays active.
    NoMatch {
        /// Diagnostic reason for the miss.
        reason: NoMatchReason,
    },
    /// The intent expired; the job was deactivated with reason `expired`.
    IntentExpired,
    /// Another evaluation already consumed the exactly-once guard; no-op.
    AlreadyClaimed,
}

impl EvaluationOutcome {
    /// Returns a stable label for telemetry.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Purchased { .. } => "purchased",
            Self::Declined { .. } => "declined",
            Self::NoMatch { .. } => "no_match",
            Self::IntentExpired => "intent_expired",
            Self::AlreadyClaimed => "already_claimed",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Coordinator errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling. Errors surfaced before
///   the claim leave the job active; errors after it are terminal.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The job's originating intent is missing from the mandate store.
    #[error("intent not found for job: {0}")]
    IntentNotFound(IntentId),
    /// Chain re-validation found violations.
    #[error("mandate chain invalid: {}", violation_codes(violations))]
    ChainInvalid {
        /// Complete violation set from the re-check.
        violations: Vec<Violation>,
    },
    /// The user has no default tokenized credential.
    #[error("no usable payment credential for user {0}")]
    CredentialsUnavailable(UserId),
    /// Catalog collaborator failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Credentials collaborator failed.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    /// Payment authority failed after the guard flip; terminal.
    #[error(transparent)]
    Payment(#[from] PaymentAuthorityError),
    /// Mandate store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Job store failed.
    #[error(transparent)]
    JobStore(#[from] JobStoreError),
    /// Mandate construction failed.
    #[error(transparent)]
    Mandate(#[from] MandateError),
    /// Record signing failed.
    #[error(transparent)]
    Signing(#[from] SignatureError),
}

/// Renders violation codes for error display.
fn violation_codes(violations: &[Violation]) -> String {
    violations.iter().map(Violation::code).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder errors for the coordinator.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CoordinatorBuildError {
    /// No catalog provider was configured.
    #[error("coordinator catalog provider is not configured")]
    MissingCatalog,
    /// No payment authority was configured.
    #[error("coordinator payment authority is not configured")]
    MissingPaymentAuthority,
    /// No credentials provider was configured.
    #[error("coordinator credentials provider is not configured")]
    MissingCredentials,
    /// No mandate store was configured.
    #[error("coordinator mandate store is not configured")]
    MissingMandateStore,
    /// No job store was configured.
    #[error("coordinator job store is not configured")]
    MissingJobStore,
    /// No signing keys were configured.
    #[error("coordinator signing keys are not configured")]
    MissingSigningKeys,
}

/// Builder for a purchase coordinator.
///
/// # Invariants
/// - `build` succeeds only when every collaborator and the keys are set.
#[derive(Default)]
pub struct PurchaseCoordinatorBuilder {
    /// Catalog collaborator.
    catalog: Option<Arc<dyn CatalogProvider>>,
    /// Payment authority collaborator.
    payments: Option<Arc<dyn PaymentAuthority>>,
    /// Credentials collaborator.
    credentials: Option<Arc<dyn CredentialsProvider>>,
    /// Mandate store.
    mandates: Option<Arc<dyn MandateStore>>,
    /// Job store.
    jobs: Option<Arc<dyn MonitorJobStore>>,
    /// Signing keys.
    keys: Option<Arc<SigningKeys>>,
    /// Identity and pricing configuration.
    config: CoordinatorConfig,
}

impl PurchaseCoordinatorBuilder {
    /// Registers the catalog collaborator.
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<dyn CatalogProvider>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Registers the payment authority collaborator.
    #[must_use]
    pub fn payment_authority(mut self, payments: Arc<dyn PaymentAuthority>) -> Self {
        self.payments = Some(payments);
        self
    }

    /// Registers the credentials collaborator.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Registers the mandate store.
    #[must_use]
    pub fn mandate_store(mut self, mandates: Arc<dyn MandateStore>) -> Self {
        self.mandates = Some(mandates);
        self
    }

    /// Registers the job store.
    #[must_use]
    pub fn job_store(mut self, jobs: Arc<dyn MonitorJobStore>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Registers the signing keys.
    #[must_use]
    pub fn signing_keys(mut self, keys: Arc<SigningKeys>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Overrides the identity and pricing configuration.
    #[must_use]
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorBuildError`] naming the first missing dependency.
    pub fn build(self) -> Result<PurchaseCoordinator, CoordinatorBuildError> {
        let keys = self.keys.ok_or(CoordinatorBuildError::MissingSigningKeys)?;
        Ok(PurchaseCoordinator {
            catalog: self.catalog.ok_or(CoordinatorBuildError::MissingCatalog)?,
            payments: self.payments.ok_or(CoordinatorBuildError::MissingPaymentAuthority)?,
            credentials: self.credentials.ok_or(CoordinatorBuildError::MissingCredentials)?,
            mandates: self.mandates.ok_or(CoordinatorBuildError::MissingMandateStore)?,
            jobs: self.jobs.ok_or(CoordinatorBuildError::MissingJobStore)?,
            validator: ChainValidator::new(Arc::clone(&keys)),
            keys,
            config: self.config,
        })
    }
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Autonomous purchase coordinator over injected collaborators.
///
/// # Invariants
/// - Holds no per-evaluation state; concurrent evaluations of the same job
///   are resolved by the job store's atomic claim, not by this type.
pub struct PurchaseCoordinator {
    /// Catalog collaborator.
    catalog: Arc<dyn CatalogProvider>,
    /// Payment authority collaborator.
    payments: Arc<dyn PaymentAuthority>,
    /// Credentials collaborator.
    credentials: Arc<dyn CredentialsProvider>,
    /// Mandate store.
    mandates: Arc<dyn MandateStore>,
    /// Job store carrying the exactly-once guard.
    jobs: Arc<dyn MonitorJobStore>,
    /// Chain validator for defense-in-depth re-checks.
    validator: ChainValidator,
    /// Per-role secret material.
    keys: Arc<SigningKeys>,
    /// Identity and pricing configuration.
    config: CoordinatorConfig,
}

impl PurchaseCoordinator {
    /// Returns a builder for the coordinator.
    #[must_use]
    pub fn builder() -> PurchaseCoordinatorBuilder {
        PurchaseCoordinatorBuilder::default()
    }

    /// Returns the chain validator sharing this coordinator's keys.
    #[must_use]
    pub const fn validator(&self) -> &ChainValidator {
        &self.validator
    }

    /// Evaluates a monitoring job against live catalog conditions.
    ///
    /// Failures before the exactly-once claim (catalog errors, validation
    /// violations, missing credentials) leave the job active so the next
    /// tick retries; everything after the claim is terminal.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] describing the failure; the job remains
    /// active unless the error occurred after the claim.
    pub fn evaluate(
        &self,
        job: &MonitorJob,
        now: Timestamp,
    ) -> Result<EvaluationOutcome, CoordinatorError> {
        let Some(intent) = self.mandates.load_intent(&job.job_id)? else {
            self.jobs.deactivate(&job.job_id, TerminalReason::Failed)?;
            return Err(CoordinatorError::IntentNotFound(job.job_id.clone()));
        };

        if intent.is_expired(now) {
            self.jobs.deactivate(&job.job_id, TerminalReason::Expired)?;
            return Ok(EvaluationOutcome::IntentExpired);
        }

        let constraints = job.constraints;
        let unit_cap = self.config.pricing.max_unit_price(constraints.max_price_cents);
        let candidates = self.catalog.search(&job.product_query, Some(unit_cap))?;

        let Some(candidate) = self.select_candidate(&candidates, constraints) else {
            return Ok(EvaluationOutcome::NoMatch {
                reason: self.no_match_reason(&candidates, constraints),
            });
        };

        let cart = self.build_deferred_cart(&intent.intent_id, &intent.user_id, candidate, now)?;

        // Defense in depth: the same constraints used for selection are
        // re-checked through the full chain validator before any money moves.
        let report = self.validator.validate_deferred(&intent, &cart, now);
        if !report.valid {
            return Err(CoordinatorError::ChainInvalid {
                violations: report.violations,
            });
        }

        let method = self
            .credentials
            .default_method(&intent.user_id)?
            .ok_or_else(|| CoordinatorError::CredentialsUnavailable(intent.user_id.clone()))?;

        // The exactly-once guard. A scheduler may dispatch overlapping
        // evaluations of the same job; whoever loses this flip stops here
        // with no side effects.
        if !self.jobs.claim(&job.job_id)? {
            return Ok(EvaluationOutcome::AlreadyClaimed);
        }

        match self.settle_claimed_purchase(&cart, &method, now) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.jobs.tag_terminal(&job.job_id, TerminalReason::Failed)?;
                Err(err)
            }
        }
    }

    /// Executes an immediate, user-present checkout against a signed cart.
    ///
    /// No job or guard is involved: the user authorized this exact cart.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::ChainInvalid`] when validation fails and
    /// collaborator errors otherwise.
    pub fn execute_immediate(
        &self,
        cart: &Cart,
        now: Timestamp,
    ) -> Result<EvaluationOutcome, CoordinatorError> {
        let report = self.validator.validate_immediate(cart, now);
        if !report.valid {
            return Err(CoordinatorError::ChainInvalid {
                violations: report.violations,
            });
        }
        let method = self
            .credentials
            .default_method(&cart.user_id)?
            .ok_or_else(|| CoordinatorError::CredentialsUnavailable(cart.user_id.clone()))?;
        self.mandates.insert_cart(cart)?;
        self.authorize_and_record(cart, &method, false, now)
    }

    /// Selects the first candidate satisfying all constraints in catalog order.
    fn select_candidate<'a>(
        &self,
        candidates: &'a [CatalogCandidate],
        constraints: PurchaseConstraints,
    ) -> Option<&'a CatalogCandidate> {
        candidates.iter().find(|candidate| {
            self.config.pricing.landed_cost(candidate.price_cents) <= constraints.max_price_cents
                && candidate.delivery_estimate_days <= constraints.max_delivery_days
                && candidate.stock == StockStatus::InStock
        })
    }

    /// Derives the diagnostic reason from the leading candidate's failed checks.
    fn no_match_reason(
        &self,
        candidates: &[CatalogCandidate],
        constraints: PurchaseConstraints,
    ) -> NoMatchReason {
        let Some(first) = candidates.first() else {
            return NoMatchReason::NoCandidates;
        };
        if self.config.pricing.landed_cost(first.price_cents) > constraints.max_price_cents {
            NoMatchReason::PriceTooHigh
        } else if first.delivery_estimate_days > constraints.max_delivery_days {
            NoMatchReason::DeliveryTooSlow
        } else if first.stock != StockStatus::InStock {
            NoMatchReason::OutOfStock
        } else {
            // The leading candidate passed every check, so a later candidate
            // must have matched; treat as an empty miss defensively.
            NoMatchReason::NoCandidates
        }
    }

    /// Builds and agent-signs the single-line-item cart for a candidate.
    fn build_deferred_cart(
        &self,
        intent_id: &IntentId,
        user_id: &UserId,
        candidate: &CatalogCandidate,
        now: Timestamp,
    ) -> Result<Cart, CoordinatorError> {
        let item = LineItem::priced(
            candidate.product_id.clone(),
            candidate.product_name.clone(),
            1,
            candidate.price_cents,
        );
        let totals = self.config.pricing.totals_for(item.line_total_cents);
        let draft = CartDraft::single_item_deferred(
            user_id.clone(),
            intent_id.clone(),
            item,
            totals,
            self.config.merchant.clone(),
            candidate.delivery_estimate_days,
            now,
        );
        Ok(draft.sign(SignerRole::Agent, &self.config.agent_id, now, &self.keys)?)
    }

    /// Persists the cart, mints the payment, and settles a claimed purchase.
    fn settle_claimed_purchase(
        &self,
        cart: &Cart,
        method: &PaymentMethod,
        now: Timestamp,
    ) -> Result<EvaluationOutcome, CoordinatorError> {
        self.mandates.insert_cart(cart)?;
        let outcome = self.authorize_and_record(cart, method, true, now)?;
        let terminal = match outcome {
            EvaluationOutcome::Purchased { .. } => TerminalReason::Completed,
            _ => TerminalReason::Failed,
        };
        if let Some(intent_ref) = cart.intent_ref.as_ref() {
            self.jobs.tag_terminal(intent_ref, terminal)?;
        }
        Ok(outcome)
    }

    /// Mints the payment mandate, requests authorization, and records the
    /// transaction outcome.
    fn authorize_and_record(
        &self,
        cart: &Cart,
        method: &PaymentMethod,
        unattended: bool,
        now: Timestamp,
    ) -> Result<EvaluationOutcome, CoordinatorError> {
        let payment = PaymentDraft::for_cart(cart, method.token.clone(), unattended, now)
            .sign(&self.config.authority_id, now, &self.keys)?;
        self.mandates.insert_payment(&payment)?;

        let metadata = PaymentMetadata {
            user_id: payment.user_id.clone(),
            cart_ref: payment.cart_ref.clone(),
            intent_ref: payment.intent_ref.clone(),
        };
        match self.payments.authorize(
            &payment.credential_token,
            payment.amount_cents,
            payment.currency,
            &metadata,
        ) {
            Ok(AuthorizationOutcome::Authorized {
                authorization_code,
            }) => {
                let transaction = Transaction::for_payment(
                    &payment,
                    TransactionStatus::Authorized,
                    Some(authorization_code.clone()),
                    None,
                    now,
                );
                self.mandates.insert_transaction(&transaction)?;
                Ok(EvaluationOutcome::Purchased {
                    transaction_id: transaction.transaction_id,
                    authorization_code,
                    amount_cents: payment.amount_cents,
                })
            }
            Ok(AuthorizationOutcome::Declined {
                reason,
            }) => {
                let transaction = Transaction::for_payment(
                    &payment,
                    TransactionStatus::Declined,
                    None,
                    Some(reason.clone()),
                    now,
                );
                self.mandates.insert_transaction(&transaction)?;
                Ok(EvaluationOutcome::Declined {
                    transaction_id: transaction.transaction_id,
                    reason,
                })
            }
            Err(err) => {
                // Past the guard: record the failed attempt as the audit
                // anchor before surfacing the transport error.
                let transaction = Transaction::for_payment(
                    &payment,
                    TransactionStatus::Failed,
                    None,
                    Some(err.to_string()),
                    now,
                );
                self.mandates.insert_transaction(&transaction)?;
                Err(err.into())
            }
        }
    }
}
