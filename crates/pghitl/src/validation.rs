//! Input validation for approval requests.
//!
//! Validation runs synchronously before anything touches the database; a
//! request that fails validation is never persisted.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::types::NewApprovalRequest;

/// Upper bound on `task_description` length, in characters.
///
/// Descriptions are surfaced in CLI tables and approval UIs; anything longer
/// belongs in the workflow's own records.
pub const MAX_TASK_DESCRIPTION_LEN: usize = 1024;

/// Validate a new approval request against a creation timestamp.
///
/// Rejects empty required fields, over-long descriptions, and expiry
/// deadlines that are not strictly in the future of `created_at`.
pub fn validate_new_request(request: &NewApprovalRequest, created_at: DateTime<Utc>) -> Result<()> {
    if request.workflow_id.trim().is_empty() {
        return Err(Error::Validation {
            reason: "workflow_id cannot be empty".to_string(),
        });
    }

    if request.agent_name.trim().is_empty() {
        return Err(Error::Validation {
            reason: "agent_name cannot be empty".to_string(),
        });
    }

    if request.task_description.trim().is_empty() {
        return Err(Error::Validation {
            reason: "task_description cannot be empty".to_string(),
        });
    }

    let len = request.task_description.chars().count();
    if len > MAX_TASK_DESCRIPTION_LEN {
        return Err(Error::Validation {
            reason: format!(
                "task_description length {} exceeds limit {}",
                len, MAX_TASK_DESCRIPTION_LEN
            ),
        });
    }

    if request.expires_at <= created_at {
        return Err(Error::Validation {
            reason: format!(
                "expires_at ({}) must be after created_at ({})",
                request.expires_at, created_at
            ),
        });
    }

    Ok(())
}
