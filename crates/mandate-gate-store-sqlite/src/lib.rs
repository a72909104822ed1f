// crates/mandate-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Mandate Gate SQLite Store
// Description: Durable persistence backend for mandates and monitoring jobs.
// Purpose: Satisfy the core store contracts with SQLite durability.
// Dependencies: mandate-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate implements [`mandate_gate_core::MandateStore`] and
//! [`mandate_gate_core::MonitorJobStore`] over one `SQLite` database. Jobs
//! persisted here survive process restart: the scheduler reloads active jobs
//! from this store on start, and the exactly-once guard is a conditional
//! `UPDATE` on the job row.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJournalMode;
pub use store::SqliteMandateStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
