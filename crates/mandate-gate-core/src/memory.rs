// crates/mandate-gate-core/src/memory.rs
// ============================================================================
// Module: In-Memory Reference Stores
// Description: Mutex-guarded map-backed stores for tests and examples.
// Purpose: Provide contract-faithful store implementations without a backend.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! These stores implement the persistence contracts over mutex-guarded maps.
//! They honor the same semantics as durable backends: append-only mandates,
//! and a claim that is atomic with respect to concurrent callers, so the
//! coordinator and scheduler can be exercised end to end without a database.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::core::identifiers::CartId;
use crate::core::identifiers::IntentId;
use crate::core::identifiers::PaymentId;
use crate::core::identifiers::TransactionId;
use crate::core::identifiers::UserId;
use crate::core::job::MonitorJob;
use crate::core::job::TerminalReason;
use crate::core::mandate::Cart;
use crate::core::mandate::Intent;
use crate::core::mandate::Payment;
use crate::core::time::Timestamp;
use crate::core::transaction::Transaction;
use crate::interfaces::JobStoreError;
use crate::interfaces::MandateStore;
use crate::interfaces::MonitorJobStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Memory Mandate Store
// ============================================================================

/// Map-backed mandate records guarded by one mutex.
#[derive(Debug, Default)]
struct MandateRecords {
    /// Intent mandates by identifier.
    intents: BTreeMap<IntentId, Intent>,
    /// Cart mandates by identifier.
    carts: BTreeMap<CartId, Cart>,
    /// Payment mandates by identifier.
    payments: BTreeMap<PaymentId, Payment>,
    /// Transactions in insertion order.
    transactions: Vec<Transaction>,
}

/// In-memory append-only mandate store.
///
/// # Invariants
/// - Inserting an existing identifier fails with [`StoreError::Duplicate`].
#[derive(Debug, Default)]
pub struct MemoryMandateStore {
    /// Guarded record maps.
    records: Mutex<MandateRecords>,
}

impl MemoryMandateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record maps, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, MandateRecords> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MandateStore for MemoryMandateStore {
    fn insert_intent(&self, intent: &Intent) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records.intents.contains_key(&intent.intent_id) {
            return Err(StoreError::Duplicate(intent.intent_id.to_string()));
        }
        records.intents.insert(intent.intent_id.clone(), intent.clone());
        Ok(())
    }

    fn load_intent(&self, intent_id: &IntentId) -> Result<Option<Intent>, StoreError> {
        Ok(self.lock().intents.get(intent_id).cloned())
    }

    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records.carts.contains_key(&cart.cart_id) {
            return Err(StoreError::Duplicate(cart.cart_id.to_string()));
        }
        records.carts.insert(cart.cart_id.clone(), cart.clone());
        Ok(())
    }

    fn load_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, StoreError> {
        Ok(self.lock().carts.get(cart_id).cloned())
    }

    fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records.payments.contains_key(&payment.payment_id) {
            return Err(StoreError::Duplicate(payment.payment_id.to_string()));
        }
        records.payments.insert(payment.payment_id.clone(), payment.clone());
        Ok(())
    }

    fn load_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.lock().payments.get(payment_id).cloned())
    }

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records
            .transactions
            .iter()
            .any(|existing| existing.transaction_id == transaction.transaction_id)
        {
            return Err(StoreError::Duplicate(transaction.transaction_id.to_string()));
        }
        records.transactions.push(transaction.clone());
        Ok(())
    }

    fn load_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .find(|transaction| &transaction.transaction_id == transaction_id)
            .cloned())
    }

    fn list_transactions_for(&self, user_id: &UserId) -> Result<Vec<Transaction>, StoreError> {
        let mut matching: Vec<Transaction> = self
            .lock()
            .transactions
            .iter()
            .filter(|transaction| &transaction.user_id == user_id)
            .cloned()
            .collect();
        matching.reverse();
        Ok(matching)
    }
}

// ============================================================================
// SECTION: Memory Job Store
// ============================================================================

/// In-memory monitor job store with a mutex-atomic claim.
///
/// # Invariants
/// - `claim` and `deactivate` perform their read-modify-write under one lock,
///   so exactly one of any number of concurrent claims succeeds.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    /// Guarded job map.
    jobs: Mutex<BTreeMap<IntentId, MonitorJob>>,
}

impl MemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the job map, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<IntentId, MonitorJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MonitorJobStore for MemoryJobStore {
    fn upsert_job(&self, job: &MonitorJob) -> Result<(), JobStoreError> {
        self.lock().insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    fn load_job(&self, job_id: &IntentId) -> Result<Option<MonitorJob>, JobStoreError> {
        Ok(self.lock().get(job_id).cloned())
    }

    fn list_active_jobs(&self) -> Result<Vec<MonitorJob>, JobStoreError> {
        Ok(self.lock().values().filter(|job| job.active).cloned().collect())
    }

    fn record_check(&self, job_id: &IntentId, at: Timestamp) -> Result<(), JobStoreError> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        job.last_check_at = Some(at);
        Ok(())
    }

    fn claim(&self, job_id: &IntentId) -> Result<bool, JobStoreError> {
        let mut jobs = self.lock();
        match jobs.get_mut(job_id) {
            Some(job) if job.active => {
                job.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn tag_terminal(&self, job_id: &IntentId, reason: TerminalReason) -> Result<(), JobStoreError> {
        let mut jobs = self.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        job.terminal_reason = Some(reason);
        Ok(())
    }

    fn deactivate(
        &self,
        job_id: &IntentId,
        reason: TerminalReason,
    ) -> Result<bool, JobStoreError> {
        let mut jobs = self.lock();
        match jobs.get_mut(job_id) {
            Some(job) if job.active => {
                job.active = false;
                job.terminal_reason = Some(reason);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
