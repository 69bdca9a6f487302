//! Concrete reward backends.
//!
//! Two flavors ship today: an HTTP hand-off to an external fulfillment service
//! and an append-only JSON-lines ledger on local disk. Both hang off the
//! [`RewardBackend`](crate::dispatch::RewardBackend) trait so the dispatcher
//! treats them uniformly.

use crate::config::Config;
use crate::dispatch::{RewardBackend, Submission};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::info;

const USER_AGENT: &str = "contribot/0.1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs the submission as JSON to an external fulfillment endpoint.
pub struct FulfillmentBackend {
    name: String,
    client: reqwest::Client,
    url: String,
}

impl FulfillmentBackend {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RewardBackend for FulfillmentBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, submission: &Submission) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .header("User-Agent", USER_AGENT)
            .json(submission)
            .send()
            .await
            .with_context(|| format!("fulfillment endpoint {} unreachable", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("fulfillment endpoint {} answered {}", self.url, status);
        }
        info!("Submission forwarded to fulfillment endpoint {}", self.url);
        Ok(())
    }
}

#[derive(Serialize)]
struct LedgerEntry<'a> {
    at: DateTime<Utc>,
    #[serde(flatten)]
    submission: &'a Submission,
}

/// Appends each submission as one JSON line to a local ledger file.
pub struct LedgerBackend {
    path: PathBuf,
}

impl LedgerBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RewardBackend for LedgerBackend {
    fn name(&self) -> &str {
        "ledger"
    }

    async fn deliver(&self, submission: &Submission) -> Result<()> {
        let entry = LedgerEntry {
            at: Utc::now(),
            submission,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed opening reward ledger {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Assembles the backend set the configuration asks for.
pub fn backends_from_config(config: &Config) -> Vec<Arc<dyn RewardBackend>> {
    let mut backends: Vec<Arc<dyn RewardBackend>> = Vec::new();

    for (index, url) in config.rewards.fulfillment_urls.iter().enumerate() {
        let name = format!("fulfillment-{}", index);
        backends.push(Arc::new(FulfillmentBackend::new(name, url.clone())));
    }

    if let Some(path) = &config.rewards.ledger_path {
        backends.push(Arc::new(LedgerBackend::new(path)));
    }

    backends
}
