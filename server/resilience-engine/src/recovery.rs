//! Recovery metrics per (incident, endpoint): detection, stable recovery, MTTD/MTTR/RTO.
//!
//! All scans run over the globally time-sorted probe series: a binary search
//! finds the window start and iteration stops at the first sample past the
//! window end, so one loaded sequence serves every incident without re-sorting.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::timestamp::seconds_between;
use crate::types::{Incident, IncidentWindow, MetricResult, ProbeSample, RecoveryNote, RtoAnchor};

/// Samples of `endpoint` inside `window`, in time order.
pub fn endpoint_samples<'a>(
  samples: &'a [ProbeSample],
  endpoint: &'a str,
  window: IncidentWindow,
) -> impl Iterator<Item = &'a ProbeSample> + 'a {
  let first = samples.partition_point(|s| s.timestamp < window.start);
  samples[first..]
    .iter()
    .take_while(move |s| window.contains(s.timestamp))
    .filter(move |s| s.endpoint == endpoint)
}

/// First failing sample of `endpoint` inside the window.
pub fn first_failure(samples: &[ProbeSample], endpoint: &str, window: IncidentWindow) -> Option<DateTime<Utc>> {
  endpoint_samples(samples, endpoint, window)
    .find(|s| !s.success)
    .map(|s| s.timestamp)
}

/// Consecutive-success tracker for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Streak {
  NoStreak,
  InStreak { count: u32, candidate: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakStep {
  Continue(Streak),
  /// `stable_n` successes reached; carries the first sample of the run.
  Recovered(DateTime<Utc>),
}

impl Streak {
  pub fn step(self, ts: DateTime<Utc>, success: bool, stable_n: u32) -> StreakStep {
    if !success {
      return StreakStep::Continue(Streak::NoStreak);
    }
    let (count, candidate) = match self {
      Streak::NoStreak => (1, ts),
      Streak::InStreak { count, candidate } => (count + 1, candidate),
    };
    if count >= stable_n {
      StreakStep::Recovered(candidate)
    } else {
      StreakStep::Continue(Streak::InStreak { count, candidate })
    }
  }
}

/// Start of the first run of `stable_n` consecutive successes in `[from, until]`.
pub fn stable_recovery(
  samples: &[ProbeSample],
  endpoint: &str,
  from: DateTime<Utc>,
  until: DateTime<Utc>,
  stable_n: u32,
) -> Option<DateTime<Utc>> {
  let mut streak = Streak::NoStreak;
  let span = IncidentWindow { start: from, end: until };
  for s in endpoint_samples(samples, endpoint, span) {
    match streak.step(s.timestamp, s.success, stable_n) {
      StreakStep::Recovered(at) => return Some(at),
      StreakStep::Continue(next) => streak = next,
    }
  }
  None
}

/// Restoration clock for `incident` under `policy`, falling back to the start
/// when a remediation anchor is requested but no action was logged.
pub fn resolve_anchor(policy: RtoAnchor, incident: &Incident) -> (RtoAnchor, DateTime<Utc>) {
  match (policy, incident.action_at) {
    (RtoAnchor::RemediationAction, Some(at)) => (RtoAnchor::RemediationAction, at),
    _ => (RtoAnchor::IncidentStart, incident.start),
  }
}

/// Metrics for one (incident, endpoint) pair over a precomputed window.
pub fn evaluate(
  samples: &[ProbeSample],
  incident: &Incident,
  endpoint: &str,
  window: IncidentWindow,
  stable_n: u32,
  policy: RtoAnchor,
) -> MetricResult {
  let (rto_anchor, anchor_at) = resolve_anchor(policy, incident);

  let Some(failed_at) = first_failure(samples, endpoint, window) else {
    return MetricResult {
      window_end: window.end,
      first_failure_at: None,
      recovered_stable_at: None,
      mttd_s: None,
      mttr_s: None,
      rto_s: None,
      rto_anchor,
      note: Some(RecoveryNote::NoFailureInWindow),
    };
  };

  let recovered_at = stable_recovery(samples, endpoint, failed_at, window.end, stable_n);
  let mttr_s = recovered_at.map(|r| seconds_between(r, failed_at));
  let rto_s = recovered_at
    .filter(|r| *r >= anchor_at)
    .map(|r| seconds_between(r, anchor_at));

  MetricResult {
    window_end: window.end,
    first_failure_at: Some(failed_at),
    recovered_stable_at: recovered_at,
    mttd_s: Some(seconds_between(failed_at, incident.start)),
    mttr_s,
    rto_s,
    rto_anchor,
    note: recovered_at.is_none().then_some(RecoveryNote::FailedNotRecovered),
  }
}

/// Metrics for every monitored endpoint of one incident.
pub fn evaluate_incident(
  samples: &[ProbeSample],
  incident: &Incident,
  endpoints: &[String],
  config: &Config,
) -> BTreeMap<String, MetricResult> {
  let series_end = samples.last().map(|s| s.timestamp);
  let window = incident.window(config.grace_period_s, series_end);
  let policy = config.rto_anchor(incident.kind);

  endpoints
    .iter()
    .map(|ep| {
      let result = evaluate(samples, incident, ep, window, config.stable_n, policy);
      (ep.clone(), result)
    })
    .collect()
}
