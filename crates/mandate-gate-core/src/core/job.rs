// crates/mandate-gate-core/src/core/job.rs
// ============================================================================
// Module: Monitoring Jobs
// Description: Scheduling records for deferred intents under live monitoring.
// Purpose: Track active monitoring state with a single terminal transition.
// Dependencies: crate::core::{identifiers, mandate, time}, serde
// ============================================================================

//! ## Overview
//! A [`MonitorJob`] is the scheduling unit for a deferred intent: it snapshots
//! the intent's constraints, records check cadence and expiration, and holds
//! the active flag that the exactly-once guard flips. It is the only mutable
//! record in the model; every mandate, once signed, is immutable. Jobs are
//! retained after deactivation for audit, tagged with a terminal reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::IntentId;
use crate::core::identifiers::PurchaseFlow;
use crate::core::identifiers::UserId;
use crate::core::mandate::Intent;
use crate::core::mandate::MandateError;
use crate::core::mandate::PurchaseConstraints;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Terminal Reasons
// ============================================================================

/// Reason a job left the active state.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
/// - A job carries at most one terminal reason, set exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// An autonomous purchase completed successfully.
    Completed,
    /// The intent expired before conditions were met.
    Expired,
    /// The user cancelled monitoring.
    Cancelled,
    /// The purchase attempt failed or was declined after the guard flip.
    Failed,
}

impl TerminalReason {
    /// Returns a stable label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Parses a stable label back into a reason.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "completed" => Some(Self::Completed),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Monitor Job
// ============================================================================

/// Scheduling record for a deferred intent under live monitoring.
///
/// # Invariants
/// - `job_id` equals the originating intent identifier (1:1 relationship).
/// - `active` transitions true to false exactly once; no transition back.
/// - Deactivated jobs are retained for audit, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorJob {
    /// Job identifier; equals the originating intent identifier.
    pub job_id: IntentId,
    /// Owning user.
    pub user_id: UserId,
    /// Product query snapshot from the intent.
    pub product_query: String,
    /// Constraint snapshot from the intent.
    pub constraints: PurchaseConstraints,
    /// Seconds between condition checks.
    pub check_interval_secs: u64,
    /// True while the job is eligible for evaluation.
    pub active: bool,
    /// When the job was last checked, if ever.
    pub last_check_at: Option<Timestamp>,
    /// When the job was created.
    pub created_at: Timestamp,
    /// When the pre-authorization expires.
    pub expires_at: Timestamp,
    /// Why the job left the active state, once it has.
    pub terminal_reason: Option<TerminalReason>,
}

impl MonitorJob {
    /// Creates an active job from a signed deferred intent.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError::NotDeferred`] for immediate intents and
    /// [`MandateError`] variants for incomplete deferred intents.
    pub fn for_intent(
        intent: &Intent,
        check_interval_secs: u64,
        now: Timestamp,
    ) -> Result<Self, MandateError> {
        if intent.flow != PurchaseFlow::Deferred {
            return Err(MandateError::NotDeferred {
                intent_id: intent.intent_id.clone(),
            });
        }
        let constraints = intent.constraints.ok_or(MandateError::MissingConstraints)?;
        let expires_at = intent.expires_at.ok_or(MandateError::MissingExpiration)?;
        Ok(Self {
            job_id: intent.intent_id.clone(),
            user_id: intent.user_id.clone(),
            product_query: intent.product_query.clone(),
            constraints,
            check_interval_secs,
            active: true,
            last_check_at: None,
            created_at: now,
            expires_at,
            terminal_reason: None,
        })
    }

    /// Returns true when the job expiration has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Returns true when the job is due for a check at `now`.
    ///
    /// A job that has never been checked is immediately due; otherwise it is
    /// due once a full check interval has elapsed since the last check.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        if !self.active {
            return false;
        }
        match self.last_check_at {
            None => true,
            Some(last) => {
                let interval = i64::try_from(self.check_interval_secs).unwrap_or(i64::MAX);
                now.seconds_since(last) >= interval
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
