//! Shared test doubles for sweeper and store-contract tests.
//!
//! `MemoryStore` mirrors the Postgres store's conditional-update semantics in
//! memory so lifecycle tests run without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use pghitl::error::{Error, Result};
use pghitl::store::{Notifier, RequestStore};
use pghitl::types::{
    ApprovalRequest, ApprovalStatus, Decision, NewApprovalRequest, RequestStats,
};

/// In-memory request store with the same "first terminal transition wins"
/// semantics as the Postgres implementation.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Uuid, ApprovalRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directly read a row, bypassing the store API (test assertions only).
    pub fn row(&self, id: Uuid) -> Option<ApprovalRequest> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn transition(
        &self,
        id: Uuid,
        to: ApprovalStatus,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(Error::RequestNotFound { id })?;
        if row.status != ApprovalStatus::Pending {
            return Err(Error::InvalidState {
                id,
                from: row.status,
                to,
            });
        }
        row.status = to;
        row.updated_at = now;
        Ok(row.clone())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn create(&self, request: NewApprovalRequest) -> Result<ApprovalRequest> {
        self.create_at(request, Utc::now()).await
    }

    async fn create_at(
        &self,
        request: NewApprovalRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        if request.workflow_id.trim().is_empty()
            || request.agent_name.trim().is_empty()
            || request.task_description.trim().is_empty()
        {
            return Err(Error::Validation {
                reason: "required field is empty".to_string(),
            });
        }
        if request.expires_at <= now {
            return Err(Error::Validation {
                reason: "expires_at must be after created_at".to_string(),
            });
        }

        let row = ApprovalRequest {
            id: Uuid::new_v4(),
            workflow_id: request.workflow_id,
            agent_name: request.agent_name,
            task_description: request.task_description,
            status: ApprovalStatus::Pending,
            created_at: now,
            updated_at: now,
            expires_at: request.expires_at,
        };
        self.rows.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<ApprovalRequest> {
        self.row(id).ok_or(Error::RequestNotFound { id })
    }

    async fn list(
        &self,
        status: Option<ApprovalStatus>,
        limit: i64,
    ) -> Result<Vec<ApprovalRequest>> {
        let rows = self.rows.lock().unwrap();
        let mut requests: Vec<ApprovalRequest> = rows
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests.truncate(limit as usize);
        Ok(requests)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ApprovalRequest>> {
        let rows = self.rows.lock().unwrap();
        let mut overdue: Vec<ApprovalRequest> = rows
            .values()
            .filter(|r| r.status == ApprovalStatus::Pending && r.expires_at < now)
            .cloned()
            .collect();
        overdue.sort_by(|a, b| b.expires_at.cmp(&a.expires_at).then(a.id.cmp(&b.id)));
        overdue.truncate(limit as usize);
        Ok(overdue)
    }

    async fn mark_expired(&self, ids: &[Uuid], now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut rows = self.rows.lock().unwrap();
        let mut expired = Vec::new();
        for id in ids {
            if let Some(row) = rows.get_mut(id) {
                if row.status == ApprovalStatus::Pending {
                    row.status = ApprovalStatus::Expired;
                    row.updated_at = now;
                    expired.push(*id);
                }
            }
        }
        Ok(expired)
    }

    async fn set_decision(
        &self,
        id: Uuid,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        self.transition(id, decision.status(), now)
    }

    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<ApprovalRequest> {
        self.transition(id, ApprovalStatus::Canceled, now)
    }

    async fn stats(&self) -> Result<RequestStats> {
        let rows = self.rows.lock().unwrap();
        let count_with = |s: ApprovalStatus| rows.values().filter(|r| r.status == s).count() as i64;
        Ok(RequestStats {
            total: rows.len() as i64,
            pending: count_with(ApprovalStatus::Pending),
            approved: count_with(ApprovalStatus::Approved),
            rejected: count_with(ApprovalStatus::Rejected),
            expired: count_with(ApprovalStatus::Expired),
            canceled: count_with(ApprovalStatus::Canceled),
            oldest_pending_expiry: rows
                .values()
                .filter(|r| r.status == ApprovalStatus::Pending)
                .map(|r| r.expires_at)
                .min(),
        })
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn install(&self) -> Result<()> {
        Ok(())
    }

    async fn verify(&self) -> Result<()> {
        Ok(())
    }
}

/// Store whose every operation fails with a connectivity error.
pub struct UnavailableStore;

fn unavailable() -> Error {
    Error::ConnectionFailed {
        source: "connection refused".into(),
        context: "test store is unreachable".to_string(),
    }
}

#[async_trait]
impl RequestStore for UnavailableStore {
    async fn create(&self, _request: NewApprovalRequest) -> Result<ApprovalRequest> {
        Err(unavailable())
    }

    async fn create_at(
        &self,
        _request: NewApprovalRequest,
        _now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        Err(unavailable())
    }

    async fn get(&self, _id: Uuid) -> Result<ApprovalRequest> {
        Err(unavailable())
    }

    async fn list(
        &self,
        _status: Option<ApprovalStatus>,
        _limit: i64,
    ) -> Result<Vec<ApprovalRequest>> {
        Err(unavailable())
    }

    async fn find_expired(&self, _now: DateTime<Utc>, _limit: i64) -> Result<Vec<ApprovalRequest>> {
        Err(unavailable())
    }

    async fn mark_expired(&self, _ids: &[Uuid], _now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        Err(unavailable())
    }

    async fn set_decision(
        &self,
        _id: Uuid,
        _decision: Decision,
        _now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        Err(unavailable())
    }

    async fn cancel(&self, _id: Uuid, _now: DateTime<Utc>) -> Result<ApprovalRequest> {
        Err(unavailable())
    }

    async fn stats(&self) -> Result<RequestStats> {
        Err(unavailable())
    }

    async fn count(&self) -> Result<i64> {
        Err(unavailable())
    }

    async fn install(&self) -> Result<()> {
        Err(unavailable())
    }

    async fn verify(&self) -> Result<()> {
        Err(unavailable())
    }
}

/// Notifier that records every delivery for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<(String, Uuid)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(String, Uuid)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_expired(&self, workflow_id: &str, request_id: Uuid) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((workflow_id.to_string(), request_id));
        Ok(())
    }
}

/// Notifier whose every delivery fails.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_expired(&self, workflow_id: &str, request_id: Uuid) -> Result<()> {
        Err(Error::Notification {
            workflow_id: workflow_id.to_string(),
            request_id,
            reason: "delivery channel down".to_string(),
        })
    }
}

/// Build a request input with the given workflow id and deadline.
pub fn request_input(workflow_id: &str, expires_at: DateTime<Utc>) -> NewApprovalRequest {
    NewApprovalRequest {
        workflow_id: workflow_id.to_string(),
        agent_name: "test-agent".to_string(),
        task_description: "Needs human sign-off".to_string(),
        expires_at,
    }
}
