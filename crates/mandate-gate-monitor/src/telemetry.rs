// crates/mandate-gate-monitor/src/telemetry.rs
// ============================================================================
// Module: Monitor Telemetry
// Description: Observability hooks for scheduler ticks and job evaluations.
// Purpose: Provide metric events without hard observability dependencies.
// Dependencies: mandate-gate-core
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for scheduler activity. It is
//! intentionally dependency-light so deployments can plug in Prometheus or
//! OpenTelemetry without redesign. Labels are stable strings; events never
//! carry mandate bodies or secret material.

// ============================================================================
// SECTION: Imports
// ============================================================================

use mandate_gate_core::IntentId;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for scheduler ticks and evaluations.
pub trait MonitorMetrics: Send + Sync {
    /// Records the start of one job evaluation.
    fn check_started(&self, job_id: &IntentId);

    /// Records the outcome label of one job evaluation.
    ///
    /// Outcome labels are the stable evaluation labels (`purchased`,
    /// `declined`, `no_match`, `intent_expired`, `already_claimed`) plus
    /// `error` for failed evaluations and `expired` for expiry sweeps.
    fn check_completed(&self, job_id: &IntentId, outcome: &'static str);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MonitorMetrics for NoopMetrics {
    fn check_started(&self, _job_id: &IntentId) {}

    fn check_completed(&self, _job_id: &IntentId, _outcome: &'static str) {}
}
