// crates/mandate-gate-monitor/src/lib.rs
// ============================================================================
// Module: Mandate Gate Monitor
// Description: Durable monitoring scheduler for deferred purchase intents.
// Purpose: Tick active jobs, evaluate conditions, and survive restarts.
// Dependencies: mandate-gate-core, tokio, time
// ============================================================================

//! ## Overview
//! This crate hosts the monitoring scheduler: an explicit instance over an
//! injected durable job store, with a bounded worker pool for evaluations
//! and a dependency-light metrics seam. State lives in the store: process
//! restart resumes ticking from persisted intervals and expirations without
//! a recovery protocol.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod scheduler;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use scheduler::MonitorError;
pub use scheduler::MonitorScheduler;
pub use scheduler::MonitorSettings;
pub use scheduler::TickReport;
pub use telemetry::MonitorMetrics;
pub use telemetry::NoopMetrics;
