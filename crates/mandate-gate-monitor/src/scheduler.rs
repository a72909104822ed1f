// crates/mandate-gate-monitor/src/scheduler.rs
// ============================================================================
// Module: Monitoring Scheduler
// Description: Periodic evaluation of active monitoring jobs with a worker bound.
// Purpose: Drive the coordinator from durable job state that survives restart.
// Dependencies: mandate-gate-core, tokio, time
// ============================================================================

//! ## Overview
//! The scheduler owns no job state of its own: every tick reads the durable
//! job table, sweeps expirations, and dispatches due jobs to a bounded
//! blocking-worker pool. Because the table is reread each tick, a restarted
//! process resumes exactly where the previous one stopped; interval and
//! expiration come back from the store, not from memory.
//!
//! Evaluations of different jobs are unordered and independent; evaluations
//! of the same job are not serialized here. Ticks may overlap under load or
//! timer jitter, and correctness rests entirely on the job store's atomic
//! claim, which the coordinator consumes before any money moves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use mandate_gate_core::Intent;
use mandate_gate_core::IntentId;
use mandate_gate_core::JobStoreError;
use mandate_gate_core::MandateError;
use mandate_gate_core::MandateStore;
use mandate_gate_core::MonitorJob;
use mandate_gate_core::MonitorJobStore;
use mandate_gate_core::PurchaseCoordinator;
use mandate_gate_core::StoreError;
use mandate_gate_core::TerminalReason;
use mandate_gate_core::Timestamp;
use mandate_gate_core::UserId;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::telemetry::MonitorMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Scheduler cadence and concurrency settings.
///
/// # Invariants
/// - `max_concurrent_checks` bounds in-flight evaluations across ticks.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    /// Interval between scheduler ticks.
    pub tick_interval: Duration,
    /// Default seconds between condition checks for new jobs.
    pub check_interval_secs: u64,
    /// Maximum concurrent job evaluations.
    pub max_concurrent_checks: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            check_interval_secs: 300,
            max_concurrent_checks: 4,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scheduler errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Intent failed boundary validation at registration.
    #[error(transparent)]
    Mandate(#[from] MandateError),
    /// Mandate store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Job store failed.
    #[error(transparent)]
    JobStore(#[from] JobStoreError),
    /// Referenced job does not exist.
    #[error("monitoring job not found: {0}")]
    JobNotFound(IntentId),
    /// Caller does not own the referenced job.
    #[error("user {user_id} does not own monitoring job {job_id}")]
    NotOwner {
        /// Referenced job.
        job_id: IntentId,
        /// Caller identity.
        user_id: UserId,
    },
    /// Worker pool could not accept the evaluation.
    #[error("evaluation dispatch failed: {0}")]
    Dispatch(String),
}

// ============================================================================
// SECTION: Tick Report
// ============================================================================

/// Summary of one scheduler tick.
///
/// # Invariants
/// - `evaluated` carries stable outcome labels per dispatched job.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Jobs deactivated by the expiry sweep this tick.
    pub expired: Vec<IntentId>,
    /// Jobs evaluated this tick with their outcome labels.
    pub evaluated: Vec<(IntentId, &'static str)>,
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Periodic monitoring scheduler over an injected job store.
///
/// # Invariants
/// - Holds no job state in memory; the durable store is authoritative.
pub struct MonitorScheduler {
    /// Coordinator performing evaluations.
    coordinator: Arc<PurchaseCoordinator>,
    /// Mandate store for intent registration.
    mandates: Arc<dyn MandateStore>,
    /// Durable job store.
    jobs: Arc<dyn MonitorJobStore>,
    /// Metrics sink.
    metrics: Arc<dyn MonitorMetrics>,
    /// Cadence and concurrency settings.
    settings: MonitorSettings,
    /// Worker-pool permits bounding concurrent evaluations.
    permits: Arc<Semaphore>,
}

impl MonitorScheduler {
    /// Creates a scheduler with a no-op metrics sink.
    #[must_use]
    pub fn new(
        coordinator: Arc<PurchaseCoordinator>,
        mandates: Arc<dyn MandateStore>,
        jobs: Arc<dyn MonitorJobStore>,
        settings: MonitorSettings,
    ) -> Self {
        Self::with_metrics(coordinator, mandates, jobs, settings, Arc::new(NoopMetrics))
    }

    /// Creates a scheduler with an explicit metrics sink.
    #[must_use]
    pub fn with_metrics(
        coordinator: Arc<PurchaseCoordinator>,
        mandates: Arc<dyn MandateStore>,
        jobs: Arc<dyn MonitorJobStore>,
        settings: MonitorSettings,
        metrics: Arc<dyn MonitorMetrics>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_checks.max(1)));
        Self {
            coordinator,
            mandates,
            jobs,
            metrics,
            settings,
            permits,
        }
    }

    /// Registers a signed deferred intent for monitoring.
    ///
    /// Validates the intent at the boundary, persists it, and creates the
    /// active job with the configured check interval.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] when validation or persistence fails.
    pub fn register(&self, intent: Intent, now: Timestamp) -> Result<MonitorJob, MonitorError> {
        intent.validate(now)?;
        let job = MonitorJob::for_intent(&intent, self.settings.check_interval_secs, now)?;
        self.mandates.insert_intent(&intent)?;
        self.jobs.upsert_job(&job)?;
        Ok(job)
    }

    /// Cancels an active job on behalf of its owning user.
    ///
    /// Returns `true` when this call performed the transition. A cancel that
    /// loses the race to an in-flight purchase past the guard flip returns
    /// `false`; that outcome is accepted and the purchase stands.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::JobNotFound`] for unknown jobs and
    /// [`MonitorError::NotOwner`] when the caller does not own the job.
    pub fn cancel(&self, job_id: &IntentId, user_id: &UserId) -> Result<bool, MonitorError> {
        let job = self
            .jobs
            .load_job(job_id)?
            .ok_or_else(|| MonitorError::JobNotFound(job_id.clone()))?;
        if &job.user_id != user_id {
            return Err(MonitorError::NotOwner {
                job_id: job_id.clone(),
                user_id: user_id.clone(),
            });
        }
        Ok(self.jobs.deactivate(job_id, TerminalReason::Cancelled)?)
    }

    /// Returns the stored state of one job.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] when the store fails.
    pub fn job_status(&self, job_id: &IntentId) -> Result<Option<MonitorJob>, MonitorError> {
        Ok(self.jobs.load_job(job_id)?)
    }

    /// Returns every persisted active job.
    ///
    /// Called on process start to observe resumed state; ticking itself
    /// always rereads the store, so no replay step is required.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] when the store fails.
    pub fn resume(&self) -> Result<Vec<MonitorJob>, MonitorError> {
        Ok(self.jobs.list_active_jobs()?)
    }

    /// Runs one scheduler tick at the supplied time.
    ///
    /// Expired jobs are deactivated with reason `expired`; each due job gets
    /// its `last_check_at` recorded unconditionally and is then evaluated on
    /// the bounded blocking pool. The report carries one outcome label per
    /// evaluated job (`error` for failed evaluations).
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] when the job store cannot be read.
    pub async fn tick(&self, now: Timestamp) -> Result<TickReport, MonitorError> {
        let mut report = TickReport::default();
        let mut dispatched = Vec::new();

        for job in self.jobs.list_active_jobs()? {
            if job.is_expired(now) {
                if self.jobs.deactivate(&job.job_id, TerminalReason::Expired)? {
                    self.metrics.check_completed(&job.job_id, "expired");
                    report.expired.push(job.job_id.clone());
                }
                continue;
            }
            if !job.is_due(now) {
                continue;
            }

            self.jobs.record_check(&job.job_id, now)?;
            self.metrics.check_started(&job.job_id);

            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|err| MonitorError::Dispatch(err.to_string()))?;
            let coordinator = Arc::clone(&self.coordinator);
            let job_id = job.job_id.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                coordinator.evaluate(&job, now)
            });
            dispatched.push((job_id, handle));
        }

        for (job_id, handle) in dispatched {
            let label = match handle.await {
                Ok(Ok(outcome)) => outcome.label(),
                Ok(Err(_)) | Err(_) => "error",
            };
            self.metrics.check_completed(&job_id, label);
            report.evaluated.push((job_id, label));
        }

        Ok(report)
    }

    /// Runs the periodic tick loop until `shutdown` observes a change.
    ///
    /// Missed ticks are coalesced rather than bursted. Each tick runs as its
    /// own task, so a slow tick never blocks the next one; overlapping
    /// evaluations of the same job are resolved by the exactly-once claim.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let scheduler = Arc::clone(&self);
                    let now = Timestamp::from_datetime(OffsetDateTime::now_utc());
                    tokio::spawn(async move {
                        let _ = scheduler.tick(now).await;
                    });
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }
    }
}
