// crates/mandate-gate-core/src/core/mod.rs
// ============================================================================
// Module: Mandate Gate Core Types
// Description: Identifiers, time, signatures, mandates, jobs, and validation.
// Purpose: Group the deterministic domain model shared by every layer.
// Dependencies: serde, serde_jcs, sha2, hmac, subtle, time
// ============================================================================

//! ## Overview
//! Core types are pure and deterministic: no wall-clock reads, no I/O, no
//! backend assumptions. Hosts supply timestamps explicitly and persistence
//! goes through the interfaces module.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod chain;
pub mod identifiers;
pub mod job;
pub mod mandate;
pub mod signature;
pub mod time;
pub mod transaction;
