//! Whole-series availability per endpoint: counts, success rate, latency max/p95.

use std::collections::BTreeMap;

use crate::types::{EndpointSummary, FailureSample, ProbeSample};

/// Nearest-rank percentile over an unsorted slice (`q` in 0..=1).
pub fn percentile(values: &[u64], q: f64) -> Option<u64> {
  if values.is_empty() {
    return None;
  }
  let mut sorted = values.to_vec();
  sorted.sort_unstable();
  let rank = (q * sorted.len() as f64).ceil() as usize;
  let idx = rank.saturating_sub(1).min(sorted.len() - 1);
  Some(sorted[idx])
}

/// Summaries keyed by endpoint, for every endpoint present in the series.
pub fn summarize(samples: &[ProbeSample]) -> BTreeMap<String, EndpointSummary> {
  let mut grouped: BTreeMap<&str, Vec<&ProbeSample>> = BTreeMap::new();
  for s in samples {
    grouped.entry(s.endpoint.as_str()).or_default().push(s);
  }

  grouped
    .into_iter()
    .map(|(endpoint, rows)| {
      let total = rows.len() as u64;
      let successes = rows.iter().filter(|s| s.success).count() as u64;
      let latencies: Vec<u64> = rows.iter().filter_map(|s| s.latency_ms).collect();
      let first_failure = rows.iter().find(|s| !s.success).map(|s| FailureSample {
        at: s.timestamp,
        http_status: s.status_code,
      });
      let success_pct = if total == 0 {
        0.0
      } else {
        (successes as f64 / total as f64 * 1000.0).round() / 10.0
      };
      (
        endpoint.to_string(),
        EndpointSummary {
          samples: total,
          successes,
          success_pct,
          max_latency_ms: latencies.iter().copied().max(),
          p95_latency_ms: percentile(&latencies, 0.95),
          first_failure,
        },
      )
    })
    .collect()
}

/// Endpoints observed in the series, sorted and de-duplicated.
pub fn observed_endpoints(samples: &[ProbeSample]) -> Vec<String> {
  let mut eps: Vec<String> = samples.iter().map(|s| s.endpoint.clone()).collect();
  eps.sort();
  eps.dedup();
  eps
}
