//! Command-line interface for pghitl: manage approval requests and run sweeps.
//!
//! This file implements the CLI entry point for pghitl, allowing operators to
//! install the schema, create and decide approval requests, and run expiry
//! sweep cycles on a schedule.
//!
//! ## What
//!
//! - Provides commands for schema management, request operations, and the
//!   maintenance sweep.
//! - Supports output in JSON and table formats.
//!
//! ## How
//!
//! Run the CLI with various subcommands to interact with pghitl. See `--help`
//! for usage details.
//!
//! ### Example
//!
//! ```sh
//! pghitl admin install
//! pghitl request create --workflow-id wf-1 --agent deploy-agent \
//!     --description "Deploy build 42" --expires-in 1h
//! pghitl sweep
//! ```
use clap::{Parser, Subcommand};
use pghitl::config::Config;
use pghitl::store::{LogNotifier, RequestStore};
use pghitl::types::{ApprovalStatus, Decision, NewApprovalRequest};
use pghitl::Sweeper;
use uuid::Uuid;

use std::fs::File;
use std::process;

use pghitl::output::{JsonOutputWriter, OutputWriter, TableOutputWriter};

#[derive(Parser)]
#[command(name = "pghitl")]
#[command(about = "A PostgreSQL-backed human-in-the-loop approval lifecycle CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL (highest priority, overrides all other config sources)
    #[arg(long, short = 'd')]
    dsn: Option<String>,

    /// Schema name for the approval_requests table (default: public, must exist before install)
    #[arg(long, short = 's')]
    schema: Option<String>,

    /// Config file path (overrides environment variables and defaults)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Log destination: stderr or file path
    #[arg(long, default_value = "stderr")]
    log_dest: String,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output format: json, table
    #[arg(long, default_value = "table")]
    format: String,

    /// Output destination: stdout or file path
    #[arg(long, default_value = "stdout")]
    out: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Admin Commands
    Admin {
        #[command(subcommand)]
        admin_command: AdminCommands,
    },
    /// Approval request Commands
    Request {
        #[command(subcommand)]
        request_command: RequestCommands,
    },
    /// Run exactly one expiry-sweep cycle and print a summary
    Sweep {
        /// Maximum number of overdue requests to reclaim this cycle
        /// (defaults to the configured sweep_batch_size)
        #[arg(long)]
        batch_size: Option<i64>,

        /// Sweep as-of this RFC3339 timestamp instead of the current time
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Install the pghitl schema (target schema must be pre-created)
    Install,
    /// Verify the pghitl installation
    Verify,
    /// Show per-status request counts
    Stats,
}

#[derive(Subcommand)]
enum RequestCommands {
    /// Create a new approval request
    Create {
        /// Identifier of the owning workflow execution
        #[arg(long)]
        workflow_id: String,

        /// Logical agent/workflow node raising the request
        #[arg(long)]
        agent: String,

        /// Human-readable task summary
        #[arg(long)]
        description: String,

        /// Time until the request expires (e.g., '30m', '2h')
        #[arg(long)]
        expires_in: String,
    },
    /// Get a request by ID
    Get {
        /// Request ID
        id: Uuid,
    },
    /// List requests, newest first
    List {
        /// Filter by status: pending, approved, rejected, expired, canceled
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of requests to list
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Approve a pending request
    Approve {
        /// Request ID
        id: Uuid,
    },
    /// Reject a pending request
    Reject {
        /// Request ID
        id: Uuid,
    },
    /// Cancel a pending request (workflow withdrawn)
    Cancel {
        /// Request ID
        id: Uuid,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        other => {
            eprintln!("Unknown log level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let writer: Box<dyn Fn() -> Box<dyn std::io::Write + Send> + Send + Sync> =
        if cli.log_dest == "stderr" {
            Box::new(|| Box::new(std::io::stderr()))
        } else {
            let file = std::fs::File::create(&cli.log_dest).expect("Failed to create log file");
            Box::new(move || Box::new(file.try_clone().expect("Failed to clone log file")))
        };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run_cli(cli).await {
        tracing::error!("Error: {}", e);
        process::exit(1);
    }
}

/// Run the CLI with the provided arguments and configuration.
///
/// This function handles loading configuration from multiple sources,
/// connecting to the store, and dispatching to the appropriate command
/// handlers.
async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    // Load configuration using the prioritized loading system
    // Priority order:
    // 1. --dsn CLI argument (if provided)
    // 2. --schema CLI argument (if provided)
    // 3. --config CLI argument (if provided)
    // 4. PGHITL_CONFIG_FILE environment variable
    // 5. PGHITL_DSN, PGHITL_SCHEMA and other environment variables
    // 6. Default config files (pghitl.yaml, pghitl.yml)
    let config = Config::load_with_schema_options(cli.dsn, cli.schema, cli.config)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    let store = pghitl::connect(&config).await?;

    let writer = match cli.format.to_lowercase().as_str() {
        "json" => OutputWriter::Json(JsonOutputWriter),
        _ => OutputWriter::Table(TableOutputWriter),
    };
    // Use an owned boxed writer so the underlying writer lives long enough for borrows
    let mut out_writer: Box<dyn std::io::Write> = match cli.out.as_str() {
        "stdout" => Box::new(std::io::stdout()),
        _ => Box::new(File::create(&cli.out)?),
    };
    let out: &mut dyn std::io::Write = out_writer.as_mut();

    match cli.command {
        Commands::Admin { admin_command } => {
            handle_admin_commands(&store, admin_command, writer, out).await?
        }

        Commands::Request { request_command } => {
            handle_request_commands(&store, request_command, writer, out).await?
        }

        Commands::Sweep { batch_size, at } => {
            handle_sweep(&store, &config, batch_size, at, writer, out).await?
        }
    }
    Ok(())
}

async fn handle_admin_commands(
    store: &impl RequestStore,
    command: AdminCommands,
    writer: OutputWriter,
    out: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    match command {
        AdminCommands::Install => {
            tracing::info!("Installing pghitl schema ...");
            store.install().await?;
            tracing::info!("Installation completed successfully");
        }

        AdminCommands::Verify => {
            tracing::info!("Verifying pghitl installation...");
            store.verify().await?;
            tracing::info!("Verification completed successfully");
        }

        AdminCommands::Stats => {
            tracing::info!("Getting request statistics...");
            let stats = store.stats().await?;
            writer.write_item(&stats, out)?;
        }
    }
    Ok(())
}

async fn handle_request_commands(
    store: &impl RequestStore,
    command: RequestCommands,
    writer: OutputWriter,
    out: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    match command {
        RequestCommands::Create {
            workflow_id,
            agent,
            description,
            expires_in,
        } => {
            let window = expires_in
                .parse::<humantime::Duration>()
                .map_err(|e| anyhow::anyhow!("Invalid duration format '{}': {}", expires_in, e))?;
            let window = chrono::Duration::from_std(window.into())
                .map_err(|e| anyhow::anyhow!("Duration too large: {}", e))?;

            tracing::info!("Creating approval request for workflow '{}'...", workflow_id);
            let request = store
                .create(NewApprovalRequest {
                    workflow_id,
                    agent_name: agent,
                    task_description: description,
                    expires_at: chrono::Utc::now() + window,
                })
                .await?;
            writer.write_item(&request, out)?;
        }

        RequestCommands::Get { id } => {
            tracing::info!("Getting request '{}'...", id);
            let request = store.get(id).await?;
            writer.write_item(&request, out)?;
        }

        RequestCommands::List { status, limit } => {
            let status = status
                .map(|s| {
                    s.parse::<ApprovalStatus>()
                        .map_err(|e| anyhow::anyhow!("{}", e))
                })
                .transpose()?;
            tracing::info!("Listing requests...");
            let requests = store.list(status, limit).await?;
            writer.write_list(&requests, out)?;
        }

        RequestCommands::Approve { id } => {
            tracing::info!("Approving request '{}'...", id);
            let request = store
                .set_decision(id, Decision::Approved, chrono::Utc::now())
                .await?;
            writer.write_item(&request, out)?;
        }

        RequestCommands::Reject { id } => {
            tracing::info!("Rejecting request '{}'...", id);
            let request = store
                .set_decision(id, Decision::Rejected, chrono::Utc::now())
                .await?;
            writer.write_item(&request, out)?;
        }

        RequestCommands::Cancel { id } => {
            tracing::info!("Canceling request '{}'...", id);
            let request = store.cancel(id, chrono::Utc::now()).await?;
            writer.write_item(&request, out)?;
        }
    }
    Ok(())
}

async fn handle_sweep(
    store: &impl RequestStore,
    config: &Config,
    batch_size: Option<i64>,
    at: Option<String>,
    writer: OutputWriter,
    out: &mut dyn std::io::Write,
) -> anyhow::Result<()> {
    let now = match at {
        Some(s) => chrono::DateTime::parse_from_rfc3339(&s)
            .map_err(|e| anyhow::anyhow!("Invalid RFC3339 timestamp '{}': {}", s, e))?
            .with_timezone(&chrono::Utc),
        None => chrono::Utc::now(),
    };
    let batch_size = batch_size.unwrap_or(config.sweep_batch_size);

    tracing::info!("Running one sweep cycle (batch_size={})...", batch_size);
    let sweeper = Sweeper::new(batch_size);
    let report = sweeper.run_once(store, &LogNotifier, now).await?;

    match writer {
        OutputWriter::Json(_) => writer.write_item(&report, out)?,
        OutputWriter::Table(_) => writeln!(out, "{}", report)?,
    }
    Ok(())
}
