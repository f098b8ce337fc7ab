//! Core database abstraction for pghitl.
//!
//! This module defines the [`RequestStore`] trait, the single source of truth
//! for approval-request status, and the [`Notifier`] contract through which
//! the owning orchestrator learns about expirations.
//!
//! All mutation of `approval_requests` rows goes through [`RequestStore`];
//! no other component writes to the table directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{ApprovalRequest, ApprovalStatus, Decision, NewApprovalRequest, RequestStats};

pub mod postgres;

pub use postgres::PostgresStore;

/// Durable bookkeeping of approval requests.
///
/// Every status transition is conditional on the row still being `pending`:
/// the first terminal transition wins and later writers are skipped, never
/// overwritten. Rows are never deleted; terminal rows form the audit trail.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert a new request with `status = pending`.
    ///
    /// `created_at` and `updated_at` are both set to the current time.
    /// Fails with [`crate::error::Error::Validation`] if a required field is
    /// empty, the description exceeds the display bound, or `expires_at` is
    /// not strictly after the creation time. Nothing is persisted on failure.
    async fn create(&self, request: NewApprovalRequest) -> Result<ApprovalRequest>;

    /// Insert a new request at a specific time (for testing/time mocking).
    ///
    /// This allows tests to control the creation time for deterministic
    /// expiry behavior.
    async fn create_at(
        &self,
        request: NewApprovalRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest>;

    /// Fetch a request by id.
    async fn get(&self, id: Uuid) -> Result<ApprovalRequest>;

    /// List requests, newest first, optionally filtered by status.
    async fn list(
        &self,
        status: Option<ApprovalStatus>,
        limit: i64,
    ) -> Result<Vec<ApprovalRequest>>;

    /// Return up to `limit` requests with `status = pending` and
    /// `expires_at < now`, ordered by `expires_at` descending with ties
    /// broken by `id`.
    ///
    /// The order is stable and deterministic so repeated sweeps (and test
    /// assertions) see the same batch.
    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ApprovalRequest>>;

    /// Transition every request in `ids` that is still `pending` to
    /// `expired`, setting `updated_at = now`.
    ///
    /// The batch is applied as a single statement: it either fully commits or
    /// fully rolls back. Rows that concurrently received a human decision are
    /// skipped. Returns the ids actually transitioned.
    async fn mark_expired(&self, ids: &[Uuid], now: DateTime<Utc>) -> Result<Vec<Uuid>>;

    /// Transition a `pending` request to `approved` or `rejected`.
    ///
    /// Fails with [`crate::error::Error::InvalidState`] if the request is no
    /// longer pending (e.g., already expired); no mutation occurs in that
    /// case.
    async fn set_decision(
        &self,
        id: Uuid,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest>;

    /// Transition a `pending` request to `canceled`.
    ///
    /// Same conditional semantics as [`RequestStore::set_decision`].
    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<ApprovalRequest>;

    /// Per-status request counts plus the earliest pending deadline.
    async fn stats(&self) -> Result<RequestStats>;

    /// Total number of rows in the table, regardless of status.
    async fn count(&self) -> Result<i64>;

    /// Idempotently create the `approval_status` type, the
    /// `approval_requests` table, and its indexes.
    async fn install(&self) -> Result<()>;

    /// Verify the pghitl schema is correctly installed.
    ///
    /// Checks that the table exists with the expected columns.
    async fn verify(&self) -> Result<()>;
}

/// Contract through which the orchestrator learns that an approval expired.
///
/// Delivery is at-least-once: implementations MUST be idempotent under
/// duplicate notifications for the same `(workflow_id, request_id)` pair.
/// The orchestrator owns workflow termination; pghitl only signals.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Signal that the approval request `request_id` belonging to
    /// `workflow_id` expired and the workflow should be canceled.
    async fn notify_expired(&self, workflow_id: &str, request_id: Uuid) -> Result<()>;
}

/// Default [`Notifier`] that records cancellations as structured log events.
///
/// Suitable for deployments where the orchestrator tails logs; production
/// orchestrators supply their own implementation.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_expired(&self, workflow_id: &str, request_id: Uuid) -> Result<()> {
        tracing::info!(
            workflow_id = %workflow_id,
            request_id = %request_id,
            "approval request expired, workflow cancellation requested"
        );
        Ok(())
    }
}
