//! Moment tracker: fire-and-forget telemetry of finished activities.
//!
//! Without a configured `base_url` the tracker runs in demo mode and only logs.
//! Otherwise records are POSTed to `{base_url}/rest/v1/{table}`. Failures are
//! logged and dropped; nothing is retried and callers never wait on it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::TrackerCfg;
use crate::error::TrackerError;
use crate::util::trunc_for_log;

/// What a state machine knows when something finishes.
#[derive(Clone, Debug, PartialEq)]
pub struct MomentDraft {
  pub activity_type: &'static str,
  pub duration_seconds: u32,
  pub metadata: Value,
}

/// Row written to the store.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MomentRecord {
  pub activity_type: String,
  pub duration_seconds: u32,
  pub completed_at: DateTime<Utc>,
  pub metadata: Value,
  pub user_id: Option<String>,
}

impl MomentRecord {
  pub fn from_draft(draft: MomentDraft, user_id: Option<String>, completed_at: DateTime<Utc>) -> Self {
    Self {
      activity_type: draft.activity_type.to_string(),
      duration_seconds: draft.duration_seconds,
      completed_at,
      metadata: draft.metadata,
      user_id,
    }
  }
}

#[derive(Clone)]
struct RemoteStore {
  client: reqwest::Client,
  url: String,
  api_key: Option<String>,
}

#[derive(Clone)]
pub struct Tracker {
  remote: Option<RemoteStore>,
}

impl Tracker {
  /// Demo mode: records are logged, never sent.
  pub fn disabled() -> Self {
    Self { remote: None }
  }

  pub fn from_config(cfg: &TrackerCfg) -> Self {
    let Some(base_url) = cfg.base_url.as_deref() else {
      info!(target: "tracker", "Tracker disabled (no base_url). Running in demo mode.");
      return Self::disabled();
    };
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(10)).build() {
      Ok(c) => c,
      Err(e) => {
        warn!(target: "tracker", error = %e, "Failed to build HTTP client; tracker disabled");
        return Self::disabled();
      }
    };
    let url = format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), cfg.table);
    info!(target: "tracker", %url, "Tracker enabled");
    Self { remote: Some(RemoteStore { client, url, api_key: cfg.api_key.clone() }) }
  }

  pub fn is_enabled(&self) -> bool {
    self.remote.is_some()
  }

  /// Stamp the draft and write it in the background. Never blocks, never fails.
  pub fn record(&self, draft: MomentDraft, user_id: Option<String>) {
    let record = MomentRecord::from_draft(draft, user_id, Utc::now());
    let tracker = self.clone();
    tokio::spawn(async move {
      if let Err(e) = tracker.write(&record).await {
        warn!(target: "tracker", activity = %record.activity_type, error = %e, "Dropped moment record");
      }
    });
  }

  #[instrument(level = "debug", skip(self, record), fields(activity = %record.activity_type))]
  pub async fn write(&self, record: &MomentRecord) -> Result<(), TrackerError> {
    let Some(remote) = &self.remote else {
      info!(target: "tracker", activity = %record.activity_type, duration = record.duration_seconds, has_user = record.user_id.is_some(), "Demo mode: skipping moment insert");
      return Ok(());
    };

    let mut req = remote
      .client
      .post(&remote.url)
      .header(USER_AGENT, "calm-space-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("Prefer", "return=minimal");
    if let Some(key) = &remote.api_key {
      req = req.header("apikey", key).header(AUTHORIZATION, format!("Bearer {}", key));
    }

    let res = req.json(record).send().await?;
    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      return Err(TrackerError::Status { status, body: trunc_for_log(&body, 200) });
    }
    info!(target: "tracker", activity = %record.activity_type, "Moment recorded");
    Ok(())
  }
}
