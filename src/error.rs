//! Error types for startup (config, template bank) and the telemetry sink.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::Difficulty;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config file {path}")]
  Read {
    path: PathBuf,
    #[source]
    cause: std::io::Error,
  },

  #[error("failed to parse config file {path}")]
  Parse {
    path: PathBuf,
    #[source]
    cause: toml::de::Error,
  },
}

/// Template bank construction failures. Raised at startup, never mid-session.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BankError {
  #[error("template '{description}' matches no item in its domain")]
  Unsatisfiable { description: String },

  #[error("template '{description}' matches every item in its domain")]
  NoDistractors { description: String },

  #[error("no templates for difficulty '{}'", .0.as_str())]
  EmptyTier(Difficulty),

  #[error("unknown {field} '{value}'")]
  UnknownValue { field: &'static str, value: String },

  #[error("template of kind '{kind}' is missing '{field}'")]
  MissingField { kind: &'static str, field: &'static str },
}

#[derive(Error, Debug)]
pub enum TrackerError {
  #[error("tracker request failed")]
  Http(#[from] reqwest::Error),

  #[error("tracker responded with HTTP {status}: {body}")]
  Status { status: u16, body: String },
}
