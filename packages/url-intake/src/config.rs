use anyhow::{bail, Context, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;

use crate::types::content::DEFAULT_CONTENT_TTL_DAYS;

/// Settings the intake core consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    /// Content younger than this is served from cache
    pub content_ttl: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            content_ttl: Duration::days(DEFAULT_CONTENT_TTL_DAYS),
        }
    }
}

impl IntakeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content TTL.
    pub fn with_content_ttl(mut self, ttl: Duration) -> Self {
        self.content_ttl = ttl;
        self
    }
}

/// Process configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub nats_url: String,
    pub job_request_subject: String,
    pub job_outcome_subject: String,
    pub job_started_subject: String,
    /// JetStream stream that retains worker events
    pub job_event_stream: String,
    /// Durable consumer the outcome consumer reads through
    pub job_event_consumer: String,
    pub intake: IntakeConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let ttl_days = match var("CONTENT_TTL_DAYS") {
            Some(raw) => parse_ttl_days(&raw)?,
            None => DEFAULT_CONTENT_TTL_DAYS,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").context("DATABASE_URL must be set")?,
            nats_url: or_default("NATS_URL", "nats://localhost:4222"),
            job_request_subject: or_default("JOB_REQUEST_SUBJECT", "extraction.requests"),
            job_outcome_subject: or_default("JOB_OUTCOME_SUBJECT", "extraction.outcomes"),
            job_started_subject: or_default("JOB_STARTED_SUBJECT", "extraction.started"),
            job_event_stream: or_default("JOB_EVENT_STREAM", "EXTRACTION_EVENTS"),
            job_event_consumer: or_default("JOB_EVENT_CONSUMER", "outcome-consumer"),
            intake: IntakeConfig::new().with_content_ttl(Duration::days(ttl_days)),
        })
    }
}

fn parse_ttl_days(raw: &str) -> Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .context("CONTENT_TTL_DAYS must be a valid number")?;
    if days <= 0 {
        bail!("CONTENT_TTL_DAYS must be positive, got {}", days);
    }
    Ok(days)
}
