//! Concurrent fetch coordinator.
//!
//! Retrieves candidate content in fixed-size batches. Requests inside a batch
//! run concurrently up to an overall cap and a stricter per-host cap; a pause
//! separates batches. Every failure is captured per item — one bad host never
//! aborts its siblings.

use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::{Mutex, Semaphore};
use vigil_core::dataset::DatasetRecord;

use crate::Result;

/// Identifier sent with every outbound request.
pub const USER_AGENT: &str = "vigil-monitor/0.1 (dataset availability check)";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
  /// Overall cap on in-flight requests.
  #[serde(default = "default_max_concurrency")]
  pub max_concurrency:      usize,
  /// Cap on in-flight requests to a single host; stricter than the overall
  /// cap so one slow host cannot monopolise the run.
  #[serde(default = "default_per_host_concurrency")]
  pub per_host_concurrency: usize,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:         u64,
  #[serde(default = "default_batch_size")]
  pub batch_size:           usize,
  #[serde(default = "default_batch_pause_secs")]
  pub batch_pause_secs:     u64,
  /// Skip TLS certificate validation. Off by default; only for hosts with
  /// known-broken certificate chains.
  #[serde(default)]
  pub accept_invalid_certs: bool,
}

fn default_max_concurrency() -> usize { 10 }
fn default_per_host_concurrency() -> usize { 2 }
fn default_timeout_secs() -> u64 { 30 }
fn default_batch_size() -> usize { 25 }
fn default_batch_pause_secs() -> u64 { 1 }

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      max_concurrency:      default_max_concurrency(),
      per_host_concurrency: default_per_host_concurrency(),
      timeout_secs:         default_timeout_secs(),
      batch_size:           default_batch_size(),
      batch_pause_secs:     default_batch_pause_secs(),
      accept_invalid_certs: false,
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The settled result of one fetch task. A non-2xx status is still a
/// `Response`; only connection-level problems (timeout, TLS, DNS) become
/// `Failed`.
#[derive(Debug)]
pub enum FetchOutcome {
  Response { status: u16, body: Bytes },
  Failed { error: String },
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

/// Shared fetch state; clones share the client and both limiters.
#[derive(Clone)]
pub struct Fetcher {
  client:   reqwest::Client,
  config:   FetchConfig,
  overall:  Arc<Semaphore>,
  per_host: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,
}

impl Fetcher {
  pub fn new(config: FetchConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(USER_AGENT)
      .timeout(Duration::from_secs(config.timeout_secs))
      .danger_accept_invalid_certs(config.accept_invalid_certs)
      .build()?;

    Ok(Self {
      overall: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
      per_host: Arc::new(Mutex::new(HashMap::new())),
      client,
      config,
    })
  }

  /// Fetch every candidate, batch by batch. Results come back paired with
  /// their originating record; within a batch completion order is irrelevant.
  pub async fn fetch_all(
    &self,
    candidates: Vec<DatasetRecord>,
  ) -> Vec<(DatasetRecord, FetchOutcome)> {
    let mut results = Vec::with_capacity(candidates.len());
    let batch_size = self.config.batch_size.max(1);

    for (i, batch) in candidates.chunks(batch_size).enumerate() {
      if i > 0 && self.config.batch_pause_secs > 0 {
        tokio::time::sleep(Duration::from_secs(self.config.batch_pause_secs))
          .await;
      }
      tracing::debug!(batch = i, size = batch.len(), "fetching batch");

      let mut handles = Vec::with_capacity(batch.len());
      for record in batch {
        let fetcher = self.clone();
        let url = record.url.clone();
        handles
          .push((record.clone(), tokio::spawn(async move {
            fetcher.fetch_one(&url).await
          })));
      }

      for (record, handle) in handles {
        let outcome = match handle.await {
          Ok(outcome) => outcome,
          Err(e) => FetchOutcome::Failed {
            error: format!("fetch task panicked: {e}"),
          },
        };
        results.push((record, outcome));
      }
    }

    results
  }

  async fn fetch_one(&self, url: &str) -> FetchOutcome {
    let _overall = match self.overall.clone().acquire_owned().await {
      Ok(permit) => permit,
      Err(_) => {
        return FetchOutcome::Failed {
          error: "concurrency limiter closed".to_string(),
        };
      }
    };

    let host_limiter = {
      let mut hosts = self.per_host.lock().await;
      hosts
        .entry(host_of(url))
        .or_insert_with(|| {
          Arc::new(Semaphore::new(self.config.per_host_concurrency.max(1)))
        })
        .clone()
    };
    let _host = match host_limiter.acquire_owned().await {
      Ok(permit) => permit,
      Err(_) => {
        return FetchOutcome::Failed {
          error: "host limiter closed".to_string(),
        };
      }
    };

    match self.client.get(url).send().await {
      Ok(response) => {
        let status = response.status().as_u16();
        match response.bytes().await {
          Ok(body) => FetchOutcome::Response { status, body },
          Err(e) => FetchOutcome::Failed {
            error: format!("reading body: {e}"),
          },
        }
      }
      Err(e) => FetchOutcome::Failed { error: e.to_string() },
    }
  }
}

/// Host component of a URL; unparseable URLs share one bucket.
fn host_of(url: &str) -> String {
  reqwest::Url::parse(url)
    .ok()
    .and_then(|u| u.host_str().map(str::to_owned))
    .unwrap_or_default()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn host_of_extracts_the_host() {
    assert_eq!(host_of("https://data.example.gov/a/b.csv"), "data.example.gov");
    assert_eq!(host_of("http://127.0.0.1:8080/x"), "127.0.0.1");
    assert_eq!(host_of("not a url"), "");
  }

  #[test]
  fn config_defaults_keep_per_host_stricter_than_overall() {
    let cfg = FetchConfig::default();
    assert!(cfg.per_host_concurrency < cfg.max_concurrency);
    assert!(!cfg.accept_invalid_certs);
  }
}
