//! CLI for submitting URLs and checking request status
//!
//! Submissions publish extraction jobs to NATS; results are printed as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use url_intake::{
    ContentRecord, NatsJobEmitter, OwnerId, PostgresStore, RequestId, RequestStatus,
    ServiceConfig, StatusQuery, SubmissionOrchestrator, SubmitOutcome,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "intake_cli")]
#[command(about = "Submit URLs for extraction and look up requests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a URL, serving cached content when it is fresh
    Submit {
        url: String,
        #[arg(long)]
        owner: Option<Uuid>,
    },

    /// Show the status of a request
    Status { request_id: String },
}

#[derive(Serialize)]
struct Response {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<RequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<ContentRecord>,
}

impl Response {
    fn new(outcome: &'static str) -> Self {
        Self {
            outcome,
            request_id: None,
            status: None,
            error_message: None,
            content: None,
        }
    }
}

fn output(resp: &Response) -> Result<()> {
    println!("{}", serde_json::to_string(resp)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,url_intake=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env().context("Failed to load configuration")?;
    let store = Arc::new(get_store(&config).await?);

    match cli.command {
        Commands::Submit { url, owner } => cmd_submit(&config, store, &url, owner.map(OwnerId)).await,
        Commands::Status { request_id } => cmd_status(store, &request_id).await,
    }
}

async fn get_store(config: &ServiceConfig) -> Result<PostgresStore> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    PostgresStore::from_pool(pool)
        .await
        .context("Failed to prepare intake database")
}

async fn cmd_submit(
    config: &ServiceConfig,
    store: Arc<PostgresStore>,
    url: &str,
    owner: Option<OwnerId>,
) -> Result<()> {
    let client = async_nats::connect(&config.nats_url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats_url))?;
    let emitter = Arc::new(NatsJobEmitter::new(
        client.clone(),
        config.job_request_subject.clone(),
    ));
    let orchestrator = SubmissionOrchestrator::with_config(store, emitter, config.intake.clone());

    let outcome = orchestrator.submit(url, owner).await?;

    // Published jobs are only queued on the client until flushed
    client.flush().await.context("Failed to flush NATS client")?;

    let resp = match outcome {
        SubmitOutcome::Cached(content) => Response {
            content: Some(content),
            ..Response::new("cached")
        },
        SubmitOutcome::Pending { request_id } => Response {
            request_id: Some(request_id),
            status: Some(RequestStatus::Pending),
            ..Response::new("pending")
        },
        SubmitOutcome::Deduped { request_id, status } => Response {
            request_id: Some(request_id),
            status: Some(status),
            ..Response::new("deduped")
        },
    };
    output(&resp)
}

async fn cmd_status(store: Arc<PostgresStore>, request_id: &str) -> Result<()> {
    let resp = match StatusQuery::new(store).query_str(request_id).await? {
        Some(result) => Response {
            request_id: Some(result.request_id),
            status: Some(result.status),
            error_message: result.error_message,
            content: result.content,
            ..Response::new("found")
        },
        None => Response::new("not_found"),
    };
    output(&resp)
}
