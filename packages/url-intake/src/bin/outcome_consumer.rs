//! Outcome Consumer
//!
//! Reads the worker's started and outcome events from a durable JetStream
//! consumer and applies each one to the intake database. A message is
//! acknowledged only after it was applied or found unusable, so events
//! survive a database outage.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_nats::jetstream::{self, consumer::pull, AckKind};
use futures::StreamExt;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url_intake::{Delivery, EventIngestion, EventKind, PostgresStore, ServiceConfig};

/// Delay before a message that failed to apply is redelivered
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,url_intake=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting outcome consumer");

    let config = ServiceConfig::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let store = Arc::new(
        PostgresStore::from_pool(pool)
            .await
            .context("Failed to prepare intake database")?,
    );
    let ingestion = EventIngestion::new(store);

    let client = async_nats::connect(&config.nats_url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats_url))?;
    let context = jetstream::new(client);

    let stream = context
        .get_or_create_stream(jetstream::stream::Config {
            name: config.job_event_stream.clone(),
            subjects: vec![
                config.job_started_subject.clone(),
                config.job_outcome_subject.clone(),
            ],
            ..Default::default()
        })
        .await
        .context("Failed to open worker event stream")?;

    let consumer = stream
        .get_or_create_consumer(
            &config.job_event_consumer,
            pull::Config {
                durable_name: Some(config.job_event_consumer.clone()),
                ack_policy: jetstream::consumer::AckPolicy::Explicit,
                ..Default::default()
            },
        )
        .await
        .context("Failed to open worker event consumer")?;

    tracing::info!(
        stream = %config.job_event_stream,
        consumer = %config.job_event_consumer,
        started = %config.job_started_subject,
        outcomes = %config.job_outcome_subject,
        "Listening for worker events"
    );

    let mut messages = consumer
        .messages()
        .await
        .context("Failed to start reading worker events")?;

    while let Some(message) = messages.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Error receiving worker event");
                continue;
            }
        };

        let kind = if message.subject.as_str() == config.job_started_subject {
            EventKind::Started
        } else if message.subject.as_str() == config.job_outcome_subject {
            EventKind::Outcome
        } else {
            tracing::warn!(subject = %message.subject, "Event on unexpected subject, dropping");
            if let Err(e) = message.ack().await {
                tracing::warn!(error = %e, "Failed to acknowledge event");
            }
            continue;
        };

        let acked = match ingestion.apply_payload(kind, &message.payload).await {
            Delivery::Ack => message.ack().await,
            Delivery::Retry => message.ack_with(AckKind::Nak(Some(RETRY_DELAY))).await,
        };
        if let Err(e) = acked {
            tracing::warn!(subject = %message.subject, error = %e, "Failed to acknowledge event");
        }
    }

    tracing::info!("Event consumer closed, shutting down");
    Ok(())
}
