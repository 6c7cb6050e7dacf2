//! Loading service configuration (difficulty overrides, extra templates,
//! timing, tracker) from TOML.
//!
//! Example:
//! ```toml
//! [difficulty.easy]
//! rounds = 5
//! time_limit_secs = 25
//!
//! [[templates]]
//! difficulty = "medium"
//! kind = "shape"
//! shape = "star"
//! color = "rose"
//!
//! [timing]
//! success_delay_ms = 800
//!
//! [tracker]
//! base_url = "https://example.supabase.co"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Difficulty, DifficultyTable};
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub difficulty: DifficultyOverrides,
  #[serde(default)]
  pub templates: Vec<TemplateCfg>,
  #[serde(default)]
  pub timing: TimingCfg,
  #[serde(default)]
  pub tracker: TrackerCfg,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DifficultyOverrides {
  #[serde(default)] pub easy: Option<DifficultyCfg>,
  #[serde(default)] pub medium: Option<DifficultyCfg>,
  #[serde(default)] pub hard: Option<DifficultyCfg>,
}

/// Partial override of one difficulty record; unset fields keep the default.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct DifficultyCfg {
  #[serde(default)] pub rounds: Option<usize>,
  #[serde(default)] pub grid_size: Option<usize>,
  #[serde(default)] pub targets: Option<usize>,
  #[serde(default)] pub time_limit_secs: Option<u32>,
  #[serde(default)] pub theme: Option<String>,
}

/// Template entry accepted in TOML configuration.
/// Which optional fields are required depends on `kind`.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct TemplateCfg {
  pub difficulty: String,
  pub kind: String,
  // shape
  #[serde(default)] pub shape: Option<String>,
  #[serde(default)] pub color: Option<String>,
  #[serde(default)] pub size: Option<String>,
  // math: rule = "equals" | "even" | "greater_than"
  #[serde(default)] pub rule: Option<String>,
  #[serde(default)] pub value: Option<u8>,
  // word
  #[serde(default)] pub category: Option<String>,
  // count
  #[serde(default)] pub emoji: Option<String>,
  #[serde(default)] pub count: Option<u8>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TimingCfg {
  #[serde(default = "default_marker_ms")]
  pub marker_ms: u64,
  #[serde(default = "default_success_delay_ms")]
  pub success_delay_ms: u64,
  #[serde(default = "default_feedback_ms")]
  pub feedback_ms: u64,
  #[serde(default = "default_sort_complete_ms")]
  pub sort_complete_ms: u64,
}

fn default_marker_ms() -> u64 { 400 }
fn default_success_delay_ms() -> u64 { 700 }
fn default_feedback_ms() -> u64 { 2500 }
fn default_sort_complete_ms() -> u64 { 800 }

impl Default for TimingCfg {
  fn default() -> Self {
    Self {
      marker_ms: default_marker_ms(),
      success_delay_ms: default_success_delay_ms(),
      feedback_ms: default_feedback_ms(),
      sort_complete_ms: default_sort_complete_ms(),
    }
  }
}

impl TimingCfg {
  pub fn marker(&self) -> Duration { Duration::from_millis(self.marker_ms) }
  pub fn success_delay(&self) -> Duration { Duration::from_millis(self.success_delay_ms) }
  pub fn feedback(&self) -> Duration { Duration::from_millis(self.feedback_ms) }
  pub fn sort_complete(&self) -> Duration { Duration::from_millis(self.sort_complete_ms) }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrackerCfg {
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub api_key: Option<String>,
  #[serde(default = "default_table")]
  pub table: String,
}

fn default_table() -> String { "ocd_moments".into() }

impl Default for TrackerCfg {
  fn default() -> Self {
    Self { base_url: None, api_key: None, table: default_table() }
  }
}

impl AppConfig {
  /// Default difficulty table with valid overrides applied.
  /// An override that would leave no distractor (or no target) is rejected as a whole.
  pub fn difficulty_table(&self) -> DifficultyTable {
    let mut table = DifficultyTable::default();
    for difficulty in Difficulty::ALL {
      let over = match difficulty {
        Difficulty::Easy => &self.difficulty.easy,
        Difficulty::Medium => &self.difficulty.medium,
        Difficulty::Hard => &self.difficulty.hard,
      };
      let Some(over) = over else { continue };

      let mut candidate = table.get(difficulty).clone();
      if let Some(v) = over.rounds { candidate.rounds = v; }
      if let Some(v) = over.grid_size { candidate.grid_size = v; }
      if let Some(v) = over.targets { candidate.targets = v; }
      if let Some(v) = over.time_limit_secs { candidate.time_limit_secs = v; }
      if let Some(v) = &over.theme { candidate.theme = v.clone(); }

      if candidate.is_valid() {
        info!(target: "calm_space", difficulty = difficulty.as_str(), ?candidate, "Applied difficulty override");
        *table.get_mut(difficulty) = candidate;
      } else {
        error!(target: "calm_space", difficulty = difficulty.as_str(), ?candidate, "Rejected difficulty override: need 1 <= targets < grid_size, rounds >= 1, time_limit_secs > 0");
      }
    }
    table
  }
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
  let raw = std::fs::read_to_string(path)
    .map_err(|cause| ConfigError::Read { path: path.to_path_buf(), cause })?;
  toml::from_str::<AppConfig>(&raw)
    .map_err(|cause| ConfigError::Parse { path: path.to_path_buf(), cause })
}

/// Load `AppConfig` from CALM_CONFIG_PATH, then apply TRACKER_* env overrides.
/// On any IO/parse error the defaults are used.
pub fn load_config_from_env() -> AppConfig {
  let mut cfg = match std::env::var("CALM_CONFIG_PATH") {
    Ok(path) => match load_config(Path::new(&path)) {
      Ok(cfg) => {
        info!(target: "calm_space", %path, templates = cfg.templates.len(), "Loaded config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "calm_space", %path, error = %e, cause = ?std::error::Error::source(&e), "Failed to load config; using defaults");
        AppConfig::default()
      }
    },
    Err(_) => AppConfig::default(),
  };

  if let Ok(url) = std::env::var("TRACKER_BASE_URL") {
    cfg.tracker.base_url = Some(url);
  }
  if let Ok(key) = std::env::var("TRACKER_API_KEY") {
    cfg.tracker.api_key = Some(key);
  }
  if cfg.tracker.base_url.is_some() && cfg.tracker.api_key.is_none() {
    warn!(target: "calm_space", "Tracker base_url set without api_key; requests may be rejected");
  }
  cfg
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_full_config() {
    let raw = r#"
      [difficulty.easy]
      rounds = 3
      time_limit_secs = 15

      [[templates]]
      difficulty = "hard"
      kind = "count"
      count = 5
      emoji = "sun"

      [timing]
      marker_ms = 300

      [tracker]
      base_url = "http://localhost:54321"
    "#;
    let cfg: AppConfig = toml::from_str(raw).unwrap();
    assert_eq!(cfg.templates.len(), 1);
    assert_eq!(cfg.templates[0].count, Some(5));
    assert_eq!(cfg.timing.marker_ms, 300);
    assert_eq!(cfg.timing.success_delay_ms, 700);
    assert_eq!(cfg.tracker.table, "ocd_moments");

    let table = cfg.difficulty_table();
    assert_eq!(table.easy.rounds, 3);
    assert_eq!(table.easy.time_limit_secs, 15);
    assert_eq!(table.easy.grid_size, 6);
  }

  #[test]
  fn rejects_override_without_distractors() {
    let raw = r#"
      [difficulty.medium]
      targets = 9
    "#;
    let cfg: AppConfig = toml::from_str(raw).unwrap();
    assert_eq!(cfg.difficulty_table().medium, DifficultyTable::default().medium);
  }

  #[test]
  fn empty_config_is_default() {
    let cfg: AppConfig = toml::from_str("").unwrap();
    assert!(cfg.templates.is_empty());
    assert!(cfg.tracker.base_url.is_none());
    assert_eq!(cfg.difficulty_table(), DifficultyTable::default());
  }

  #[test]
  fn missing_file_is_read_error() {
    let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }
}
