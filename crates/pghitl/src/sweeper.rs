//! Expiry sweeper: periodic reclamation of overdue pending requests.
//!
//! ## What
//!
//! - [`Sweeper`] runs one reclamation cycle at a time: find overdue pending
//!   requests, conditionally transition them to `expired`, and signal the
//!   [`Notifier`](crate::store::Notifier) for each workflow affected.
//!
//! ## How
//!
//! An external scheduler (cron, a deployment's periodic job runner) invokes
//! [`Sweeper::run_once`] on a fixed interval. The cycle holds no in-process
//! locks between the read and the write; correctness against concurrent
//! sweeper replicas and human decisions relies on the store's per-row
//! conditional update. A store failure aborts the cycle with no side effects;
//! the next scheduled invocation is the retry.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::store::{Notifier, RequestStore};
use crate::types::SweepReport;

/// Runs expiry-sweep cycles against a request store.
#[derive(Debug, Clone)]
pub struct Sweeper {
    batch_size: i64,
}

impl Sweeper {
    /// Create a sweeper that reclaims at most `batch_size` requests per cycle.
    pub fn new(batch_size: i64) -> Self {
        Self { batch_size }
    }

    /// Execute exactly one sweep cycle at time `now`.
    ///
    /// Returns a [`SweepReport`] with the number of overdue requests found,
    /// the number actually expired, and the number skipped because a human
    /// decision won the race between the read and the conditional write.
    ///
    /// Notification failures never roll back an expiry and never abort the
    /// cycle; they are logged and counted in the report. Redelivery is the
    /// notifier's responsibility.
    pub async fn run_once(
        &self,
        store: &dyn RequestStore,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
    ) -> Result<SweepReport> {
        let overdue = store.find_expired(now, self.batch_size).await?;
        if overdue.is_empty() {
            tracing::debug!("no overdue pending requests");
            return Ok(SweepReport::default());
        }

        let found = overdue.len() as u64;
        let workflows: HashMap<Uuid, String> = overdue
            .iter()
            .map(|r| (r.id, r.workflow_id.clone()))
            .collect();

        let ids: Vec<Uuid> = overdue.iter().map(|r| r.id).collect();
        let expired_ids = store.mark_expired(&ids, now).await?;
        let expired = expired_ids.len() as u64;
        let skipped = found - expired;

        let mut notify_failures = 0u64;
        for id in &expired_ids {
            // Present for every expired id: the batch came from the same read.
            let workflow_id = &workflows[id];
            if let Err(e) = notifier.notify_expired(workflow_id, *id).await {
                tracing::warn!(
                    workflow_id = %workflow_id,
                    request_id = %id,
                    error = %e,
                    "expiry notification failed; transition stands"
                );
                notify_failures += 1;
            }
        }

        let report = SweepReport {
            found,
            expired,
            skipped,
            notify_failures,
        };
        tracing::info!(
            found = report.found,
            expired = report.expired,
            skipped = report.skipped,
            "sweep cycle finished"
        );
        Ok(report)
    }
}
