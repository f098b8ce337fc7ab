//! Postgres implementation of the RequestStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::RequestStore;
use crate::types::{ApprovalRequest, ApprovalStatus, Decision, NewApprovalRequest, RequestStats};
use crate::validation::validate_new_request;

// SQL constants. `{SCHEMA}` is substituted with the configured schema name
// (validated against Postgres identifier rules at config load).

const CREATE_STATUS_TYPE: &str = r#"
    DO $$ BEGIN
        CREATE TYPE {SCHEMA}.approval_status AS ENUM
            ('pending', 'approved', 'rejected', 'expired', 'canceled');
    EXCEPTION
        WHEN duplicate_object THEN NULL;
    END $$;
"#;

const CREATE_REQUESTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS {SCHEMA}.approval_requests (
        id UUID PRIMARY KEY,
        workflow_id TEXT NOT NULL,
        agent_name TEXT NOT NULL,
        task_description TEXT NOT NULL,
        status {SCHEMA}.approval_status NOT NULL DEFAULT 'pending',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL,
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL,
        expires_at TIMESTAMP WITH TIME ZONE NOT NULL
    );
"#;

const CREATE_PENDING_EXPIRY_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS approval_requests_pending_expiry_idx
    ON {SCHEMA}.approval_requests (expires_at)
    WHERE status = 'pending';
"#;

const CREATE_WORKFLOW_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS approval_requests_workflow_idx
    ON {SCHEMA}.approval_requests (workflow_id);
"#;

const TABLE_EXISTS_QUERY: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM information_schema.tables
        WHERE table_schema = $1 AND table_name = 'approval_requests'
    );
"#;

const COLUMN_COUNT_QUERY: &str = r#"
    SELECT COUNT(*) FROM information_schema.columns
    WHERE table_schema = $1
      AND table_name = 'approval_requests'
      AND column_name IN
        ('id', 'workflow_id', 'agent_name', 'task_description',
         'status', 'created_at', 'updated_at', 'expires_at');
"#;

const INSERT_REQUEST: &str = r#"
    INSERT INTO {SCHEMA}.approval_requests
        (id, workflow_id, agent_name, task_description, status, created_at, updated_at, expires_at)
    VALUES ($1, $2, $3, $4, 'pending', $5, $5, $6)
    RETURNING id, workflow_id, agent_name, task_description, status, created_at, updated_at, expires_at;
"#;

const GET_REQUEST_BY_ID: &str = r#"
    SELECT id, workflow_id, agent_name, task_description, status, created_at, updated_at, expires_at
    FROM {SCHEMA}.approval_requests
    WHERE id = $1;
"#;

const LIST_REQUESTS: &str = r#"
    SELECT id, workflow_id, agent_name, task_description, status, created_at, updated_at, expires_at
    FROM {SCHEMA}.approval_requests
    ORDER BY created_at DESC
    LIMIT $1;
"#;

const LIST_REQUESTS_BY_STATUS: &str = r#"
    SELECT id, workflow_id, agent_name, task_description, status, created_at, updated_at, expires_at
    FROM {SCHEMA}.approval_requests
    WHERE status = $1
    ORDER BY created_at DESC
    LIMIT $2;
"#;

const FIND_EXPIRED_REQUESTS: &str = r#"
    SELECT id, workflow_id, agent_name, task_description, status, created_at, updated_at, expires_at
    FROM {SCHEMA}.approval_requests
    WHERE status = 'pending' AND expires_at < $1
    ORDER BY expires_at DESC, id ASC
    LIMIT $2;
"#;

const MARK_EXPIRED_BATCH: &str = r#"
    UPDATE {SCHEMA}.approval_requests
    SET status = 'expired', updated_at = $2
    WHERE id = ANY($1) AND status = 'pending'
    RETURNING id;
"#;

const TRANSITION_PENDING_REQUEST: &str = r#"
    UPDATE {SCHEMA}.approval_requests
    SET status = $2, updated_at = $3
    WHERE id = $1 AND status = 'pending'
    RETURNING id, workflow_id, agent_name, task_description, status, created_at, updated_at, expires_at;
"#;

const REQUEST_STATS: &str = r#"
    SELECT
        COUNT(*) AS total,
        COUNT(*) FILTER (WHERE status = 'pending') AS pending,
        COUNT(*) FILTER (WHERE status = 'approved') AS approved,
        COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
        COUNT(*) FILTER (WHERE status = 'expired') AS expired,
        COUNT(*) FILTER (WHERE status = 'canceled') AS canceled,
        MIN(expires_at) FILTER (WHERE status = 'pending') AS oldest_pending_expiry
    FROM {SCHEMA}.approval_requests;
"#;

const COUNT_REQUESTS: &str = r#"
    SELECT COUNT(*) FROM {SCHEMA}.approval_requests;
"#;

/// Connect to Postgres and build a [`PostgresStore`] from configuration.
pub async fn connect(config: &Config) -> Result<PostgresStore> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.connection_timeout_seconds,
        ))
        .connect(&config.dsn)
        .await
        .map_err(|e| Error::ConnectionFailed {
            source: Box::new(e),
            context: "connecting to Postgres".to_string(),
        })?;

    Ok(PostgresStore::new(pool, config))
}

/// Postgres-backed [`RequestStore`].
///
/// All writes are per-row conditional on `status = 'pending'`, so concurrent
/// sweeper replicas and the human-decision channel race safely: the first
/// terminal transition commits, the second affects zero rows.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: Config,
}

impl PostgresStore {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            config: config.clone(),
        }
    }

    /// Get access to the underlying PgPool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the configuration for this store.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn sql(&self, template: &str) -> String {
        template.replace("{SCHEMA}", &self.config.schema)
    }

    /// Conditional `pending -> to` transition shared by decisions and cancel.
    async fn transition(
        &self,
        id: Uuid,
        to: ApprovalStatus,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        let updated: Option<ApprovalRequest> =
            sqlx::query_as::<_, ApprovalRequest>(&self.sql(TRANSITION_PENDING_REQUEST))
                .bind(id)
                .bind(to)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?;

        match updated {
            Some(request) => Ok(request),
            // Zero rows: the request is either absent or already terminal.
            None => {
                let current: Option<ApprovalRequest> =
                    sqlx::query_as::<_, ApprovalRequest>(&self.sql(GET_REQUEST_BY_ID))
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                match current {
                    Some(request) => Err(Error::InvalidState {
                        id,
                        from: request.status,
                        to,
                    }),
                    None => Err(Error::RequestNotFound { id }),
                }
            }
        }
    }
}

#[async_trait]
impl RequestStore for PostgresStore {
    async fn create(&self, request: NewApprovalRequest) -> Result<ApprovalRequest> {
        self.create_at(request, Utc::now()).await
    }

    async fn create_at(
        &self,
        request: NewApprovalRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        validate_new_request(&request, now)?;

        let created = sqlx::query_as::<_, ApprovalRequest>(&self.sql(INSERT_REQUEST))
            .bind(Uuid::new_v4())
            .bind(&request.workflow_id)
            .bind(&request.agent_name)
            .bind(&request.task_description)
            .bind(now)
            .bind(request.expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<ApprovalRequest> {
        let request: Option<ApprovalRequest> =
            sqlx::query_as::<_, ApprovalRequest>(&self.sql(GET_REQUEST_BY_ID))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        request.ok_or(Error::RequestNotFound { id })
    }

    async fn list(
        &self,
        status: Option<ApprovalStatus>,
        limit: i64,
    ) -> Result<Vec<ApprovalRequest>> {
        let requests = match status {
            Some(status) => {
                sqlx::query_as::<_, ApprovalRequest>(&self.sql(LIST_REQUESTS_BY_STATUS))
                    .bind(status)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, ApprovalRequest>(&self.sql(LIST_REQUESTS))
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(requests)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ApprovalRequest>> {
        let requests = sqlx::query_as::<_, ApprovalRequest>(&self.sql(FIND_EXPIRED_REQUESTS))
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(requests)
    }

    async fn mark_expired(&self, ids: &[Uuid], now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        // Single statement: the batch fully applies or fully rolls back, and
        // rows that lost the race to a human decision are left untouched.
        let expired: Vec<Uuid> = sqlx::query_scalar(&self.sql(MARK_EXPIRED_BATCH))
            .bind(ids)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(expired)
    }

    async fn set_decision(
        &self,
        id: Uuid,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest> {
        self.transition(id, decision.status(), now).await
    }

    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<ApprovalRequest> {
        self.transition(id, ApprovalStatus::Canceled, now).await
    }

    async fn stats(&self) -> Result<RequestStats> {
        let stats = sqlx::query_as::<_, RequestStats>(&self.sql(REQUEST_STATS))
            .fetch_one(&self.pool)
            .await?;
        Ok(stats)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&self.sql(COUNT_REQUESTS))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn install(&self) -> Result<()> {
        for statement in [
            CREATE_STATUS_TYPE,
            CREATE_REQUESTS_TABLE,
            CREATE_PENDING_EXPIRY_INDEX,
            CREATE_WORKFLOW_INDEX,
        ] {
            sqlx::query(&self.sql(statement)).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn verify(&self) -> Result<()> {
        let table_exists: bool = sqlx::query_scalar(TABLE_EXISTS_QUERY)
            .bind(&self.config.schema)
            .fetch_one(&self.pool)
            .await?;

        if !table_exists {
            return Err(Error::SchemaValidation {
                message: format!(
                    "table '{}.approval_requests' does not exist; run install first",
                    self.config.schema
                ),
            });
        }

        let column_count: i64 = sqlx::query_scalar(COLUMN_COUNT_QUERY)
            .bind(&self.config.schema)
            .fetch_one(&self.pool)
            .await?;

        if column_count != 8 {
            return Err(Error::SchemaValidation {
                message: format!(
                    "table '{}.approval_requests' has {} of 8 expected columns",
                    self.config.schema, column_count
                ),
            });
        }

        Ok(())
    }
}
