//! Error types and result handling for pghitl.
//!
//! This module defines the core error type [`Error`] used throughout the crate, as well as the [`Result`] alias for fallible operations.
//!
//! ## What
//!
//! - [`Error`] enumerates all error cases that can occur in pghitl, including database, configuration, validation, and lifecycle errors.
//! - [`Result<T>`] is a convenient alias for `Result<T, Error>`.
//!
//! ## How
//!
//! Use [`Error`] for error handling in your application code and when matching on error cases. Most crate APIs return [`Result<T>`].
use thiserror::Error;

use crate::types::ApprovalStatus;

/// Result type for pghitl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type for heterogeneous error sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for pghitl operations.
///
/// This enum covers all error cases that can occur when using pghitl,
/// including database connectivity, configuration, and approval-lifecycle
/// errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (SQLx errors)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database connection failed or was lost
    #[error("Database connection failed: {source}. Context: {context}")]
    ConnectionFailed { source: BoxError, context: String },

    /// JSON serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Required configuration field is missing
    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    /// Configuration field has an invalid value
    #[error("Invalid configuration value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// Database schema validation failed
    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },

    /// Input to `create` was rejected before anything was persisted
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// Attempted to transition a request that is no longer pending
    #[error("Invalid state transition for request '{id}': {from} -> {to}")]
    InvalidState {
        id: uuid::Uuid,
        from: ApprovalStatus,
        to: ApprovalStatus,
    },

    /// Attempted to access a request that doesn't exist
    #[error("Approval request with id '{id}' not found")]
    RequestNotFound { id: uuid::Uuid },

    /// Notification delivery to the workflow owner failed.
    ///
    /// An `expired` transition is never rolled back on this error; redelivery
    /// is the Notifier's responsibility.
    #[error("Notification failed for workflow '{workflow_id}' (request '{request_id}'): {reason}")]
    Notification {
        workflow_id: String,
        request_id: uuid::Uuid,
        reason: String,
    },

    /// Unexpected internal error occurred
    #[error("Internal error: {message}")]
    Internal { message: String },
}
