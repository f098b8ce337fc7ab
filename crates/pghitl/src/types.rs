//! Core types for pghitl: approval requests, sweep reports, and statistics.
//!
//! This module defines the main data structures used for approval-lifecycle
//! operations and reporting.
//!
//! ## What
//!
//! - [`ApprovalRequest`] represents a persisted human-approval decision point.
//! - [`ApprovalStatus`] is the request state machine.
//! - [`SweepReport`] summarizes one expiry-sweep cycle.
//! - [`RequestStats`] provides per-status counts for monitoring.
//!
//! ## How
//!
//! Use these types when interacting with the request store, inspecting sweep
//! results, and rendering CLI output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self};
use tabled::Tabled;
use uuid::Uuid;

/// Approval request status enumeration.
///
/// Transitions only move forward: `Pending` is the sole non-terminal state,
/// and every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a human decision
    Pending,
    /// Approved by a human
    Approved,
    /// Rejected by a human
    Rejected,
    /// Deadline passed before a decision was made
    Expired,
    /// Withdrawn by the owning workflow
    Canceled,
}

impl ApprovalStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
            ApprovalStatus::Expired => write!(f, "expired"),
            ApprovalStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            "expired" => Ok(ApprovalStatus::Expired),
            "canceled" => Ok(ApprovalStatus::Canceled),
            _ => Err(format!("Invalid approval status: {}", s)),
        }
    }
}

/// A human decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// The terminal status this decision transitions a request into.
    pub fn status(&self) -> ApprovalStatus {
        match self {
            Decision::Approved => ApprovalStatus::Approved,
            Decision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// A persisted approval request.
///
/// Rows are never deleted; terminal rows remain as the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, Tabled, sqlx::FromRow)]
pub struct ApprovalRequest {
    /// Unique request ID
    pub id: Uuid,
    /// Identifier of the owning workflow execution (opaque to pghitl)
    pub workflow_id: String,
    /// Logical agent/workflow node that raised the request
    pub agent_name: String,
    /// Human-readable summary, bounded length for display
    pub task_description: String,
    /// Current lifecycle status
    pub status: ApprovalStatus,
    /// Timestamp when the request was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status transition
    pub updated_at: DateTime<Utc>,
    /// Deadline after which a pending request is no longer actionable
    pub expires_at: DateTime<Utc>,
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApprovalRequest {{ id: {}, workflow_id: {}, agent_name: {}, status: {}, expires_at: {} }}",
            self.id, self.workflow_id, self.agent_name, self.status, self.expires_at
        )
    }
}

/// Input data for creating a new approval request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApprovalRequest {
    pub workflow_id: String,
    pub agent_name: String,
    pub task_description: String,
    pub expires_at: DateTime<Utc>,
}

/// Summary of one expiry-sweep cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct SweepReport {
    /// Overdue pending requests selected this cycle
    pub found: u64,
    /// Requests actually transitioned to expired
    pub expired: u64,
    /// Selected requests that were no longer pending at write time
    pub skipped: u64,
    /// Expiry notifications that failed to deliver
    pub notify_failures: u64,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sweep complete: found={} expired={} skipped={}",
            self.found, self.expired, self.skipped
        )?;
        if self.notify_failures > 0 {
            write!(f, " notify_failures={}", self.notify_failures)?;
        }
        Ok(())
    }
}

/// Per-status request counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestStats {
    /// Total number of requests
    pub total: i64,
    /// Requests awaiting a decision
    pub pending: i64,
    /// Approved requests
    pub approved: i64,
    /// Rejected requests
    pub rejected: i64,
    /// Expired requests
    pub expired: i64,
    /// Canceled requests
    pub canceled: i64,
    /// Earliest deadline among pending requests
    pub oldest_pending_expiry: Option<DateTime<Utc>>,
}

impl Tabled for RequestStats {
    const LENGTH: usize = 7;

    fn fields(&self) -> Vec<std::borrow::Cow<'static, str>> {
        vec![
            self.total.to_string().into(),
            self.pending.to_string().into(),
            self.approved.to_string().into(),
            self.rejected.to_string().into(),
            self.expired.to_string().into(),
            self.canceled.to_string().into(),
            display_option_datetime(&self.oldest_pending_expiry).into(),
        ]
    }

    fn headers() -> Vec<std::borrow::Cow<'static, str>> {
        vec![
            "total",
            "pending",
            "approved",
            "rejected",
            "expired",
            "canceled",
            "oldest_pending_expiry",
        ]
        .into_iter()
        .map(|s| s.into())
        .collect()
    }
}

/// Helper function to format Option<DateTime<Utc>> for Tabled
pub fn display_option_datetime(o: &Option<DateTime<Utc>>) -> String {
    match o {
        Some(dt) => dt.to_rfc3339(),
        None => "N/A".to_string(),
    }
}
