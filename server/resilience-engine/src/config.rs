//! Engine configuration with sane defaults and run-dir overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::types::{IncidentKind, RtoAnchor};

/// Legacy single-integer override files written by the experiment runner.
pub const STABLE_N_FILE: &str = "stable_n.txt";
pub const GRACE_PERIOD_FILE: &str = "post_window_s.txt";
/// Upper bound for `grace_period_s` (one week).
pub const MAX_GRACE_PERIOD_S: u64 = 7 * 24 * 3600;
/// Optional TOML config picked up from the run dir.
pub const CONFIG_FILE: &str = "resilience.toml";

/// Tunables for recovery evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Consecutive successful probes required to call an endpoint recovered.
  pub stable_n: u32,
  /// Seconds after incident end still searched for detection/recovery.
  pub grace_period_s: u64,
  /// Monitored endpoints. Empty = every endpoint seen in the probe series.
  pub endpoints: Vec<String>,
  /// Restoration anchor per incident type (canonical or alias names as keys).
  pub rto_anchors: BTreeMap<String, RtoAnchor>,
  pub probe_file: String,
  pub event_file: String,
  pub rpo_note: String,
}

impl Default for Config {
  fn default() -> Self {
    let mut rto_anchors = BTreeMap::new();
    rto_anchors.insert(
      IncidentKind::ProcessKill.as_str().to_string(),
      RtoAnchor::RemediationAction,
    );
    Self {
      stable_n: 3,
      grace_period_s: 30,
      endpoints: vec!["/ping".into(), "/secure-data".into()],
      rto_anchors,
      probe_file: "http_metrics.csv".into(),
      event_file: "events.log".into(),
      rpo_note: "0 (stateless/NA)".into(),
    }
  }
}

impl Config {
  /// Anchor policy for `kind`; types without an entry measure from incident start.
  pub fn rto_anchor(&self, kind: IncidentKind) -> RtoAnchor {
    self
      .rto_anchors
      .iter()
      .find(|(name, _)| IncidentKind::from_str_loose(name) == Some(kind))
      .map(|(_, anchor)| *anchor)
      .unwrap_or(RtoAnchor::IncidentStart)
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    if self.stable_n == 0 {
      return Err(EngineError::validation("stable_n", "must be at least 1"));
    }
    if self.grace_period_s > MAX_GRACE_PERIOD_S {
      return Err(EngineError::validation(
        "grace_period_s",
        &format!("must be at most {} seconds", MAX_GRACE_PERIOD_S),
      ));
    }
    if self.probe_file.trim().is_empty() {
      return Err(EngineError::validation("probe_file", "must not be empty"));
    }
    for name in self.rto_anchors.keys() {
      if IncidentKind::from_str_loose(name).is_none() {
        return Err(EngineError::validation(
          "rto_anchors",
          &format!("unknown incident type '{}'", name),
        ));
      }
    }
    Ok(())
  }

  /// Apply `stable_n.txt` / `post_window_s.txt` from the run dir when present.
  pub fn apply_run_dir_overrides(&mut self, run_dir: &Path) {
    if let Some(n) = read_int_file::<u32>(&run_dir.join(STABLE_N_FILE)) {
      self.stable_n = n;
    }
    if let Some(s) = read_int_file::<u64>(&run_dir.join(GRACE_PERIOD_FILE)) {
      self.grace_period_s = s;
    }
  }

  /// Parse a TOML config document. Missing keys keep their defaults.
  pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
    toml::from_str(raw).map_err(|e| EngineError::Config(e.to_string()))
  }

  pub fn from_toml_file(path: &Path) -> Result<Self, EngineError> {
    let raw = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    Self::from_toml_str(&raw)
  }
}

fn read_int_file<T: std::str::FromStr>(path: &Path) -> Option<T> {
  let raw = match fs::read_to_string(path) {
    Ok(raw) => raw,
    Err(_) => {
      debug!(path = %path.display(), "override file absent; keeping default");
      return None;
    }
  };
  match raw.trim().parse::<T>() {
    Ok(v) => Some(v),
    Err(_) => {
      warn!(path = %path.display(), content = raw.trim(), "malformed override file ignored");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_experiment_runner() {
    let config = Config::default();
    assert_eq!(config.stable_n, 3);
    assert_eq!(config.grace_period_s, 30);
    assert_eq!(config.rto_anchor(IncidentKind::ProcessKill), RtoAnchor::RemediationAction);
    assert_eq!(config.rto_anchor(IncidentKind::Flood), RtoAnchor::IncidentStart);
    assert_eq!(config.rto_anchor(IncidentKind::NetworkPartition), RtoAnchor::IncidentStart);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn zero_stable_n_is_rejected() {
    let config = Config {
      stable_n: 0,
      ..Config::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("stable_n"));
  }

  #[test]
  fn grace_period_is_capped() {
    let at_cap = Config {
      grace_period_s: MAX_GRACE_PERIOD_S,
      ..Config::default()
    };
    assert!(at_cap.validate().is_ok());

    for grace_period_s in [MAX_GRACE_PERIOD_S + 1, 10_000_000_000_000_000, u64::MAX] {
      let err = Config {
        grace_period_s,
        ..Config::default()
      }
      .validate()
      .unwrap_err();
      assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "grace_period_s"));
    }
  }

  #[test]
  fn toml_overrides_and_aliases() {
    let config = Config::from_toml_str(
      r#"
        stable_n = 5
        endpoints = ["/ping"]

        [rto_anchors]
        kill_api = "incident_start"
        dos = "remediation_action"
      "#,
    )
    .unwrap();
    assert_eq!(config.stable_n, 5);
    assert_eq!(config.grace_period_s, 30);
    assert_eq!(config.endpoints, vec!["/ping".to_string()]);
    assert_eq!(config.rto_anchor(IncidentKind::ProcessKill), RtoAnchor::IncidentStart);
    assert_eq!(config.rto_anchor(IncidentKind::Flood), RtoAnchor::RemediationAction);
  }

  #[test]
  fn unknown_anchor_key_fails_validation() {
    let config = Config::from_toml_str("[rto_anchors]\nmeteor = \"incident_start\"\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn malformed_toml_is_config_error() {
    let err = Config::from_toml_str("stable_n = \"three\"").unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
  }

  #[test]
  fn run_dir_override_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(STABLE_N_FILE), "4\n").unwrap();
    fs::write(dir.path().join(GRACE_PERIOD_FILE), "not-a-number").unwrap();

    let mut config = Config::default();
    config.apply_run_dir_overrides(dir.path());
    assert_eq!(config.stable_n, 4);
    assert_eq!(config.grace_period_s, 30);
  }
}
