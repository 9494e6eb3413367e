//! Structured error types for the resilience engine.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("missing required input: {}", path.display())]
  MissingInput { path: PathBuf },

  #[error("io: {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("config: {0}")]
  Config(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn io(path: &Path, source: std::io::Error) -> Self {
    Self::Io {
      path: path.to_path_buf(),
      source,
    }
  }

  /// True when the run cannot start because a required input file is absent.
  pub fn is_missing_input(&self) -> bool {
    matches!(self, Self::MissingInput { .. })
  }
}
