//! # pghitl
//!
//! **pghitl** is a PostgreSQL-backed lifecycle for human-in-the-loop approval
//! requests: asynchronous agent tasks pause pending human sign-off, every
//! request carries an expiry, and a maintenance sweep reclaims requests whose
//! deadline has passed, signaling the owning workflow to cancel.
//!
//! ## Features
//!
//! - **First terminal transition wins**: human decisions and the expiry sweep
//!   race safely through per-row conditional updates. No distributed locks.
//! - **Replica tolerant**: any number of sweeper instances may run against the
//!   same store.
//! - **Immutable audit trail**: rows are never deleted; terminal requests
//!   remain queryable.
//! - **CLI tools**: install the schema, create and decide requests, and run
//!   sweep cycles from the command line.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use pghitl::store::{LogNotifier, RequestStore};
//! use pghitl::types::NewApprovalRequest;
//! use pghitl::{Config, Sweeper};
//!
//! # async fn example() -> pghitl::error::Result<()> {
//! let config = Config::from_dsn("postgresql://localhost/mydb");
//! let store = pghitl::connect(&config).await?;
//!
//! // Setup (run once)
//! store.install().await?;
//!
//! // Agent: raise an approval request with a one-hour deadline
//! let request = store
//!     .create(NewApprovalRequest {
//!         workflow_id: "wf-2024-11-003".to_string(),
//!         agent_name: "deploy-agent".to_string(),
//!         task_description: "Deploy build 42 to production".to_string(),
//!         expires_at: Utc::now() + Duration::hours(1),
//!     })
//!     .await?;
//! println!("awaiting approval: {}", request.id);
//!
//! // Maintenance: run one expiry-sweep cycle
//! let sweeper = Sweeper::new(config.sweep_batch_size);
//! let report = sweeper.run_once(&store, &LogNotifier, Utc::now()).await?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod store;
pub mod sweeper;
pub mod types;
mod validation;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::store::postgres::connect;
pub use crate::store::{LogNotifier, Notifier, PostgresStore, RequestStore};
pub use crate::sweeper::Sweeper;
pub use crate::types::{
    ApprovalRequest, ApprovalStatus, Decision, NewApprovalRequest, RequestStats, SweepReport,
};
pub use crate::validation::MAX_TASK_DESCRIPTION_LEN;
