//! Core types for the resilience engine (source records, derived models, JSON contract).

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::timestamp;

// ---------------------------------------------------------------------------
// Incident kinds
// ---------------------------------------------------------------------------

/// Fault types injected by the experiment runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
  Flood,
  ProcessKill,
  NetworkPartition,
}

impl IncidentKind {
  pub const ALL: [IncidentKind; 3] = [Self::Flood, Self::ProcessKill, Self::NetworkPartition];

  /// Accepts the canonical names plus the runner's directory-style aliases.
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "flood" | "dos" => Some(Self::Flood),
      "process_kill" | "kill_api" | "kill" => Some(Self::ProcessKill),
      "network_partition" | "netfail" => Some(Self::NetworkPartition),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Flood => "flood",
      Self::ProcessKill => "process_kill",
      Self::NetworkPartition => "network_partition",
    }
  }

  /// Sub-directories of a run dir that may hold this fault's own `events.log`.
  pub fn dir_aliases(self) -> &'static [&'static str] {
    match self {
      Self::Flood => &["flood", "dos"],
      Self::ProcessKill => &["process_kill", "kill_api", "kill"],
      Self::NetworkPartition => &["network_partition", "netfail"],
    }
  }
}

impl fmt::Display for IncidentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// One prober observation of one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSample {
  pub timestamp: DateTime<Utc>,
  pub endpoint: String,
  pub status_code: u16,
  /// Only present when the row carried a latency column.
  pub latency_ms: Option<u64>,
  pub success: bool,
}

/// Per-endpoint health flags carried by the monitor's FIRST_FAILURE / RECOVERED lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeFlags {
  pub ping_ok: Option<bool>,
  pub secure_ok: Option<bool>,
}

/// Closed set of recognized event-log messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
  IncidentStart(IncidentKind),
  IncidentEnd(IncidentKind),
  RemediationAction,
  FirstFailure(ProbeFlags),
  Recovered(ProbeFlags),
  /// Timestamped, but carries no marker the engine acts on.
  Note,
}

impl EventKind {
  pub fn label(&self) -> String {
    match self {
      Self::IncidentStart(k) => format!("incident_start:{}", k),
      Self::IncidentEnd(k) => format!("incident_end:{}", k),
      Self::RemediationAction => "remediation_action".into(),
      Self::FirstFailure(_) => "first_failure".into(),
      Self::Recovered(_) => "recovered".into(),
      Self::Note => "note".into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
  pub timestamp: DateTime<Utc>,
  pub raw_message: String,
  pub kind: EventKind,
}

/// Result of classifying one raw log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
  Event(Event),
  Discard,
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
  /// Stable `inc-<hex>` id, see [`crate::fingerprint::incident_id`].
  pub id: String,
  pub kind: IncidentKind,
  pub start: DateTime<Utc>,
  pub end: Option<DateTime<Utc>>,
  pub action_at: Option<DateTime<Utc>>,
}

impl Incident {
  pub fn is_open_ended(&self) -> bool {
    self.end.is_none()
  }

  /// Evaluation horizon: `[start, end + grace]`, or up to `series_end` when open-ended.
  pub fn window(&self, grace_period_s: u64, series_end: Option<DateTime<Utc>>) -> IncidentWindow {
    let end = match self.end {
      Some(end) => i64::try_from(grace_period_s)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|grace| end.checked_add_signed(grace))
        .unwrap_or(DateTime::<Utc>::MAX_UTC),
      None => series_end.map_or(self.start, |t| t.max(self.start)),
    };
    IncidentWindow {
      start: self.start,
      end,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncidentWindow {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl IncidentWindow {
  pub fn contains(&self, ts: DateTime<Utc>) -> bool {
    self.start <= ts && ts <= self.end
  }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Clock that restoration time is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RtoAnchor {
  IncidentStart,
  RemediationAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryNote {
  NoFailureInWindow,
  FailedNotRecovered,
}

impl RecoveryNote {
  pub fn describe(self) -> &'static str {
    match self {
      Self::NoFailureInWindow => "No failure detected in the incident window.",
      Self::FailedNotRecovered => "Failure detected, but no stable recovery within the window.",
    }
  }
}

/// Recovery metrics for one (incident, endpoint) pair. Absent values are `null`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
  #[serde(with = "timestamp::rfc3339")]
  pub window_end: DateTime<Utc>,
  #[serde(with = "timestamp::rfc3339_opt")]
  pub first_failure_at: Option<DateTime<Utc>>,
  #[serde(with = "timestamp::rfc3339_opt")]
  pub recovered_stable_at: Option<DateTime<Utc>>,
  pub mttd_s: Option<f64>,
  pub mttr_s: Option<f64>,
  pub rto_s: Option<f64>,
  /// Anchor actually used (policy, after fallback).
  pub rto_anchor: RtoAnchor,
  pub note: Option<RecoveryNote>,
}

/// Advisory: two incidents' intervals intersect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapWarning {
  pub a: IncidentKind,
  pub b: IncidentKind,
  #[serde(with = "timestamp::rfc3339")]
  pub a_start: DateTime<Utc>,
  #[serde(with = "timestamp::rfc3339")]
  pub a_end: DateTime<Utc>,
  #[serde(with = "timestamp::rfc3339")]
  pub b_start: DateTime<Utc>,
  #[serde(with = "timestamp::rfc3339")]
  pub b_end: DateTime<Utc>,
  pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineRecord {
  #[serde(with = "timestamp::rfc3339_opt")]
  pub first_failure_at: Option<DateTime<Utc>>,
  pub ping_ok: Option<bool>,
  pub secure_ok: Option<bool>,
  pub note: String,
}

// ---------------------------------------------------------------------------
// Supplementary summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSample {
  #[serde(with = "timestamp::rfc3339")]
  pub at: DateTime<Utc>,
  pub http_status: u16,
}

/// Whole-series availability for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
  pub samples: u64,
  pub successes: u64,
  pub success_pct: f64,
  pub max_latency_ms: Option<u64>,
  pub p95_latency_ms: Option<u64>,
  pub first_failure: Option<FailureSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
  #[serde(with = "timestamp::rfc3339")]
  pub at: DateTime<Utc>,
  pub kind: String,
  pub message: String,
}

/// Headline numbers from the load generator's end-of-test summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadTestSummary {
  pub http_reqs: Option<f64>,
  pub p95_ms: Option<f64>,
  pub max_ms: Option<f64>,
  pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Output document (JSON contract)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentReport {
  pub id: String,
  #[serde(with = "timestamp::rfc3339")]
  pub start: DateTime<Utc>,
  #[serde(with = "timestamp::rfc3339_opt")]
  pub end: Option<DateTime<Utc>>,
  #[serde(with = "timestamp::rfc3339_opt")]
  pub action_at: Option<DateTime<Utc>>,
  pub endpoints: BTreeMap<String, MetricResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResilienceReport {
  pub run_dir: String,
  pub rpo: String,
  pub stable_n: u32,
  pub grace_period_s: u64,
  pub baseline: BaselineRecord,
  pub overlaps: Vec<OverlapWarning>,
  pub incidents: BTreeMap<IncidentKind, IncidentReport>,
  pub endpoints: BTreeMap<String, EndpointSummary>,
  pub timeline: Vec<TimelineEntry>,
  pub load_test: LoadTestSummary,
}
