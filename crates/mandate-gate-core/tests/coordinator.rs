// crates/mandate-gate-core/tests/coordinator.rs
// ============================================================================
// Module: Purchase Coordinator Tests
// Description: Verifies selection, guarded execution, and failure semantics.
// ============================================================================
//! ## Overview
//! Exercises candidate selection against landed cost, the exactly-once claim
//! under concurrent evaluation, terminal handling of declines and post-claim
//! failures, and the pre-claim failure modes that must leave a job active.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use mandate_gate_core::AuthorizationOutcome;
use mandate_gate_core::CatalogCandidate;
use mandate_gate_core::CatalogError;
use mandate_gate_core::CatalogProvider;
use mandate_gate_core::CoordinatorError;
use mandate_gate_core::CredentialsError;
use mandate_gate_core::CredentialsProvider;
use mandate_gate_core::CredentialToken;
use mandate_gate_core::Currency;
use mandate_gate_core::EvaluationOutcome;
use mandate_gate_core::Intent;
use mandate_gate_core::MandateStore;
use mandate_gate_core::MemoryJobStore;
use mandate_gate_core::MemoryMandateStore;
use mandate_gate_core::MonitorJob;
use mandate_gate_core::MonitorJobStore;
use mandate_gate_core::NoMatchReason;
use mandate_gate_core::PaymentAuthority;
use mandate_gate_core::PaymentAuthorityError;
use mandate_gate_core::PaymentMetadata;
use mandate_gate_core::PaymentMethod;
use mandate_gate_core::ProductId;
use mandate_gate_core::PurchaseConstraints;
use mandate_gate_core::PurchaseCoordinator;
use mandate_gate_core::SecretKey;
use mandate_gate_core::SigningKeys;
use mandate_gate_core::StockStatus;
use mandate_gate_core::TerminalReason;
use mandate_gate_core::Timestamp;
use mandate_gate_core::TransactionStatus;
use mandate_gate_core::UserId;

// ============================================================================
// SECTION: Test Collaborators
// ============================================================================

/// Catalog double returning a scripted candidate list or a scripted error.
struct ScriptedCatalog {
    /// Candidates returned in order, or an error message.
    result: Mutex<Result<Vec<CatalogCandidate>, String>>,
}

impl ScriptedCatalog {
    /// Returns a catalog yielding the given candidates.
    fn with_candidates(candidates: Vec<CatalogCandidate>) -> Self {
        Self {
            result: Mutex::new(Ok(candidates)),
        }
    }

    /// Returns a catalog that always fails.
    fn failing(message: &str) -> Self {
        Self {
            result: Mutex::new(Err(message.to_string())),
        }
    }
}

impl CatalogProvider for ScriptedCatalog {
    fn search(
        &self,
        _query: &str,
        _max_unit_price_cents: Option<u64>,
    ) -> Result<Vec<CatalogCandidate>, CatalogError> {
        match &*self.result.lock().unwrap() {
            Ok(candidates) => Ok(candidates.clone()),
            Err(message) => Err(CatalogError::Unavailable(message.clone())),
        }
    }
}

/// Authorization behavior for the scripted authority.
#[derive(Clone, Copy)]
enum AuthorityMode {
    /// Approve every request.
    Approve,
    /// Decline every request.
    Decline,
    /// Fail transport on every request.
    Fail,
}

/// Payment authority double with a fixed behavior and a call counter.
struct ScriptedAuthority {
    /// Scripted behavior.
    mode: AuthorityMode,
    /// Number of authorize calls observed.
    calls: Mutex<u32>,
}

impl ScriptedAuthority {
    /// Returns an authority with the given behavior.
    fn new(mode: AuthorityMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of authorize calls observed.
    fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl PaymentAuthority for ScriptedAuthority {
    fn authorize(
        &self,
        _token: &CredentialToken,
        _amount_cents: u64,
        _currency: Currency,
        _metadata: &PaymentMetadata,
    ) -> Result<AuthorizationOutcome, PaymentAuthorityError> {
        *self.calls.lock().unwrap() += 1;
        match self.mode {
            AuthorityMode::Approve => Ok(AuthorizationOutcome::Authorized {
                authorization_code: "auth_test_000001".to_string(),
            }),
            AuthorityMode::Decline => Ok(AuthorizationOutcome::Declined {
                reason: "insufficient_funds".to_string(),
            }),
            AuthorityMode::Fail => {
                Err(PaymentAuthorityError::Timeout("authorize deadline exceeded".to_string()))
            }
        }
    }
}

/// Credentials double with a single default visa token.
struct OneCardCredentials {
    /// When false, the user has no methods at all.
    has_methods: bool,
}

impl CredentialsProvider for OneCardCredentials {
    fn methods_for(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, CredentialsError> {
        if !self.has_methods {
            return Err(CredentialsError::NoMethods(user_id.clone()));
        }
        Ok(vec![PaymentMethod {
            token: CredentialToken::new("tok_visa_4242"),
            kind: "visa".to_string(),
            last_four: "4242".to_string(),
            expiry_month: 12,
            expiry_year: 2_027,
            is_default: true,
        }])
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns distinct per-role signing keys.
fn keys() -> Arc<SigningKeys> {
    Arc::new(SigningKeys::new(
        SecretKey::from("user-secret-0123456789abcdef"),
        SecretKey::from("agent-secret-0123456789abcdef"),
        SecretKey::from("authority-secret-0123456789abcdef"),
    ))
}

/// Returns the fixed reference time used across coordinator tests.
fn t0() -> Timestamp {
    Timestamp::from_unix_seconds(1_700_000_000).unwrap()
}

/// Returns the reference constraints: max 5500 cents landed, 7 days.
const fn constraints() -> PurchaseConstraints {
    PurchaseConstraints {
        max_price_cents: 5_500,
        max_delivery_days: 7,
        currency: Currency::Usd,
    }
}

/// Returns an in-stock candidate with the given price and delivery.
fn candidate(id: &str, price_cents: u64, delivery_days: u32, stock: StockStatus) -> CatalogCandidate {
    CatalogCandidate {
        product_id: ProductId::new(id),
        product_name: format!("Product {id}"),
        price_cents,
        stock,
        delivery_estimate_days: delivery_days,
    }
}

/// Shared wiring for one coordinator test: stores, intent, and job.
struct Fixture {
    /// Coordinator under test.
    coordinator: Arc<PurchaseCoordinator>,
    /// Mandate store shared with the coordinator.
    mandates: Arc<MemoryMandateStore>,
    /// Job store shared with the coordinator.
    jobs: Arc<MemoryJobStore>,
    /// Active monitoring job snapshot.
    job: MonitorJob,
}

/// Builds a coordinator over memory stores with a registered deferred intent.
fn fixture(catalog: ScriptedCatalog, authority: Arc<ScriptedAuthority>, has_methods: bool) -> Fixture {
    let keys = keys();
    let now = t0();
    let mandates = Arc::new(MemoryMandateStore::new());
    let jobs = Arc::new(MemoryJobStore::new());

    let intent = Intent::new_deferred(
        UserId::new("user_demo_001"),
        "coffee maker",
        constraints(),
        now.checked_add_seconds(7 * 86_400).unwrap(),
        now,
    )
    .signed_as_user(now, &keys)
    .unwrap();
    intent.validate(now).unwrap();
    mandates.insert_intent(&intent).unwrap();

    let job = MonitorJob::for_intent(&intent, 300, now).unwrap();
    jobs.upsert_job(&job).unwrap();

    let coordinator = Arc::new(
        PurchaseCoordinator::builder()
            .catalog(Arc::new(catalog))
            .payment_authority(authority)
            .credentials(Arc::new(OneCardCredentials {
                has_methods,
            }))
            .mandate_store(Arc::clone(&mandates) as Arc<dyn MandateStore>)
            .job_store(Arc::clone(&jobs) as Arc<dyn MonitorJobStore>)
            .signing_keys(keys)
            .build()
            .unwrap(),
    );

    Fixture {
        coordinator,
        mandates,
        jobs,
        job,
    }
}

// ============================================================================
// SECTION: Selection and the Reference Scenario
// ============================================================================

#[test]
fn reference_scenario_buys_first_candidate_within_landed_cost() {
    // 4350 lands at 5698 > 5500 and is skipped; 4000 lands at 5320 <= 5500.
    let catalog = ScriptedCatalog::with_candidates(vec![
        candidate("prod_a", 4_350, 5, StockStatus::InStock),
        candidate("prod_b", 4_000, 5, StockStatus::InStock),
    ]);
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
    let fx = fixture(catalog, Arc::clone(&authority), true);
    let now = t0().checked_add_seconds(300).unwrap();

    let outcome = fx.coordinator.evaluate(&fx.job, now).unwrap();
    let EvaluationOutcome::Purchased {
        transaction_id,
        amount_cents,
        ..
    } = outcome
    else {
        panic!("expected purchase, got {outcome:?}");
    };
    assert_eq!(amount_cents, 5_320);
    assert_eq!(authority.call_count(), 1);

    let transaction = fx.mandates.load_transaction(&transaction_id).unwrap().unwrap();
    assert_eq!(transaction.status, TransactionStatus::Authorized);
    assert_eq!(transaction.amount_cents, 5_320);
    assert_eq!(transaction.intent_ref.as_ref(), Some(&fx.job.job_id));

    // The chain persisted: cart and payment are loadable from the triple.
    let cart = fx.mandates.load_cart(&transaction.cart_ref).unwrap().unwrap();
    assert_eq!(cart.items[0].product_id, ProductId::new("prod_b"));
    let payment = fx.mandates.load_payment(&transaction.payment_ref).unwrap().unwrap();
    assert!(payment.unattended);
    assert_eq!(payment.amount_cents, cart.totals.grand_total_cents);

    let job = fx.jobs.load_job(&fx.job.job_id).unwrap().unwrap();
    assert!(!job.active);
    assert_eq!(job.terminal_reason, Some(TerminalReason::Completed));
}

#[test]
fn no_match_reports_leading_candidate_diagnostics() {
    let cases = [
        (vec![candidate("prod_a", 6_000, 5, StockStatus::InStock)], NoMatchReason::PriceTooHigh),
        (vec![candidate("prod_a", 4_000, 12, StockStatus::InStock)], NoMatchReason::DeliveryTooSlow),
        (vec![candidate("prod_a", 4_000, 5, StockStatus::OutOfStock)], NoMatchReason::OutOfStock),
        (Vec::new(), NoMatchReason::NoCandidates),
    ];
    for (candidates, expected) in cases {
        let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
        let fx = fixture(ScriptedCatalog::with_candidates(candidates), authority.clone(), true);
        let outcome = fx.coordinator.evaluate(&fx.job, t0()).unwrap();
        assert_eq!(
            outcome,
            EvaluationOutcome::NoMatch {
                reason: expected
            }
        );
        // No match leaves the job active and moves no money.
        assert!(fx.jobs.load_job(&fx.job.job_id).unwrap().unwrap().active);
        assert_eq!(authority.call_count(), 0);
    }
}

// ============================================================================
// SECTION: Exactly-Once Guard
// ============================================================================

#[test]
fn concurrent_evaluations_produce_exactly_one_transaction() {
    let catalog = ScriptedCatalog::with_candidates(vec![candidate(
        "prod_b",
        4_000,
        5,
        StockStatus::InStock,
    )]);
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
    let fx = fixture(catalog, Arc::clone(&authority), true);
    let now = t0().checked_add_seconds(300).unwrap();

    let outcomes: Vec<EvaluationOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let coordinator = Arc::clone(&fx.coordinator);
                let job = fx.job.clone();
                scope.spawn(move || coordinator.evaluate(&job, now).unwrap())
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let purchased = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, EvaluationOutcome::Purchased { .. }))
        .count();
    let no_ops = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, EvaluationOutcome::AlreadyClaimed))
        .count();
    assert_eq!(purchased, 1, "exactly one evaluation must win: {outcomes:?}");
    assert_eq!(no_ops, 1, "the loser must observe the flipped guard: {outcomes:?}");

    assert_eq!(authority.call_count(), 1);
    let transactions =
        fx.mandates.list_transactions_for(&UserId::new("user_demo_001")).unwrap();
    assert_eq!(transactions.len(), 1);
}

#[test]
fn declined_payment_is_terminal_and_never_retried() {
    let catalog = ScriptedCatalog::with_candidates(vec![candidate(
        "prod_b",
        4_000,
        5,
        StockStatus::InStock,
    )]);
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Decline));
    let fx = fixture(catalog, Arc::clone(&authority), true);
    let now = t0().checked_add_seconds(300).unwrap();

    let outcome = fx.coordinator.evaluate(&fx.job, now).unwrap();
    let EvaluationOutcome::Declined {
        transaction_id,
        reason,
    } = outcome
    else {
        panic!("expected decline, got {outcome:?}");
    };
    assert_eq!(reason, "insufficient_funds");

    let job = fx.jobs.load_job(&fx.job.job_id).unwrap().unwrap();
    assert!(!job.active);
    assert_eq!(job.terminal_reason, Some(TerminalReason::Failed));
    let transaction = fx.mandates.load_transaction(&transaction_id).unwrap().unwrap();
    assert_eq!(transaction.status, TransactionStatus::Declined);

    // A retried evaluation observes the consumed guard and does nothing.
    let retry = fx.coordinator.evaluate(&fx.job, now.checked_add_seconds(300).unwrap()).unwrap();
    assert_eq!(retry, EvaluationOutcome::AlreadyClaimed);
    assert_eq!(authority.call_count(), 1);
}

#[test]
fn transport_failure_after_claim_is_terminal_with_failed_transaction() {
    let catalog = ScriptedCatalog::with_candidates(vec![candidate(
        "prod_b",
        4_000,
        5,
        StockStatus::InStock,
    )]);
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Fail));
    let fx = fixture(catalog, Arc::clone(&authority), true);
    let now = t0().checked_add_seconds(300).unwrap();

    let err = fx.coordinator.evaluate(&fx.job, now).unwrap_err();
    assert!(matches!(err, CoordinatorError::Payment(_)));

    let job = fx.jobs.load_job(&fx.job.job_id).unwrap().unwrap();
    assert!(!job.active);
    assert_eq!(job.terminal_reason, Some(TerminalReason::Failed));

    let transactions =
        fx.mandates.list_transactions_for(&UserId::new("user_demo_001")).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, TransactionStatus::Failed);
}

// ============================================================================
// SECTION: Pre-Claim Failures Leave the Job Active
// ============================================================================

#[test]
fn catalog_failure_before_claim_keeps_job_active() {
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
    let fx = fixture(ScriptedCatalog::failing("connect timeout"), Arc::clone(&authority), true);

    let err = fx.coordinator.evaluate(&fx.job, t0()).unwrap_err();
    assert!(matches!(err, CoordinatorError::Catalog(_)));

    let job = fx.jobs.load_job(&fx.job.job_id).unwrap().unwrap();
    assert!(job.active, "transient failure must not consume the guard");
    assert_eq!(authority.call_count(), 0);
}

#[test]
fn missing_credentials_before_claim_keep_job_active() {
    let catalog = ScriptedCatalog::with_candidates(vec![candidate(
        "prod_b",
        4_000,
        5,
        StockStatus::InStock,
    )]);
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
    let fx = fixture(catalog, Arc::clone(&authority), false);

    let err = fx.coordinator.evaluate(&fx.job, t0()).unwrap_err();
    assert!(matches!(err, CoordinatorError::Credentials(_)));

    let job = fx.jobs.load_job(&fx.job.job_id).unwrap().unwrap();
    assert!(job.active);
    assert_eq!(authority.call_count(), 0);
}

// ============================================================================
// SECTION: Immediate Checkout
// ============================================================================

/// Builds a user-signed immediate cart for the fixture user.
fn immediate_cart(now: Timestamp, keys: &SigningKeys) -> mandate_gate_core::Cart {
    let item = mandate_gate_core::LineItem::priced(
        ProductId::new("prod_lamp_001"),
        "Desk Lamp",
        1,
        4_599,
    );
    let totals = mandate_gate_core::CartTotals::from_parts(4_599, 367, 1_000, Currency::Usd);
    mandate_gate_core::CartDraft {
        cart_id: mandate_gate_core::CartId::derive(
            mandate_gate_core::PurchaseFlow::Immediate,
            &["user_demo_001", "prod_lamp_001"],
        ),
        user_id: UserId::new("user_demo_001"),
        items: vec![item],
        totals,
        merchant: mandate_gate_core::MerchantRef {
            merchant_id: "merchant_demo".to_string(),
            merchant_name: "Demo Store".to_string(),
            merchant_url: "https://demo.example.com".to_string(),
        },
        delivery_estimate_days: 1,
        intent_ref: None,
    }
    .sign(
        mandate_gate_core::SignerRole::User,
        &mandate_gate_core::SignerId::new("user_demo_001"),
        now,
        keys,
    )
    .unwrap()
}

#[test]
fn immediate_checkout_records_an_attended_payment() {
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
    let fx = fixture(ScriptedCatalog::with_candidates(Vec::new()), Arc::clone(&authority), true);
    let now = t0();
    let cart = immediate_cart(now, &keys());

    let outcome = fx.coordinator.execute_immediate(&cart, now).unwrap();
    let EvaluationOutcome::Purchased {
        transaction_id,
        amount_cents,
        ..
    } = outcome
    else {
        panic!("expected purchase, got {outcome:?}");
    };
    assert_eq!(amount_cents, 5_966);

    let transaction = fx.mandates.load_transaction(&transaction_id).unwrap().unwrap();
    assert_eq!(transaction.intent_ref, None);
    let payment = fx.mandates.load_payment(&transaction.payment_ref).unwrap().unwrap();
    assert!(!payment.unattended, "a user-present payment is attended");
}

#[test]
fn immediate_checkout_rejects_an_invalid_chain() {
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
    let fx = fixture(ScriptedCatalog::with_candidates(Vec::new()), Arc::clone(&authority), true);
    let now = t0();
    let mut cart = immediate_cart(now, &keys());
    cart.totals.grand_total_cents = 1;

    let err = fx.coordinator.execute_immediate(&cart, now).unwrap_err();
    assert!(matches!(err, CoordinatorError::ChainInvalid { .. }));
    assert_eq!(authority.call_count(), 0);
}

// ============================================================================
// SECTION: Expiry
// ============================================================================

#[test]
fn expired_intent_deactivates_without_transaction() {
    let catalog = ScriptedCatalog::with_candidates(vec![candidate(
        "prod_b",
        4_000,
        5,
        StockStatus::InStock,
    )]);
    let authority = Arc::new(ScriptedAuthority::new(AuthorityMode::Approve));
    let fx = fixture(catalog, Arc::clone(&authority), true);
    let after_expiry = fx.job.expires_at.checked_add_seconds(60).unwrap();

    let outcome = fx.coordinator.evaluate(&fx.job, after_expiry).unwrap();
    assert_eq!(outcome, EvaluationOutcome::IntentExpired);

    let job = fx.jobs.load_job(&fx.job.job_id).unwrap().unwrap();
    assert!(!job.active);
    assert_eq!(job.terminal_reason, Some(TerminalReason::Expired));
    assert!(fx.mandates.list_transactions_for(&UserId::new("user_demo_001")).unwrap().is_empty());
    assert_eq!(authority.call_count(), 0);
}
