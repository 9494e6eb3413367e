//! Markdown rendering of a [`ResilienceReport`] (`metrics.md`).

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::error::EngineError;
use crate::timestamp;
use crate::types::{MetricResult, ResilienceReport, RtoAnchor};

const ABSENT: &str = "—";

fn ts(v: Option<DateTime<Utc>>) -> String {
  v.map_or_else(|| ABSENT.to_string(), |t| timestamp::format(&t))
}

fn secs(v: Option<f64>) -> String {
  v.map_or_else(|| ABSENT.to_string(), |s| format!("{:.1}s", s))
}

fn num(v: Option<f64>) -> String {
  v.map_or_else(|| ABSENT.to_string(), |n| format!("{}", n))
}

fn anchor(a: RtoAnchor) -> &'static str {
  match a {
    RtoAnchor::IncidentStart => "incident start",
    RtoAnchor::RemediationAction => "remediation action",
  }
}

fn endpoint_block(out: &mut String, endpoint: &str, m: &MetricResult) {
  let _ = writeln!(out, "- **{}**", endpoint);
  let _ = writeln!(out, "  - Window end: {}", timestamp::format(&m.window_end));
  let _ = writeln!(out, "  - First failure: {}", ts(m.first_failure_at));
  let _ = writeln!(out, "  - Stable recovery: {}", ts(m.recovered_stable_at));
  let _ = writeln!(out, "  - MTTD: {}", secs(m.mttd_s));
  let _ = writeln!(out, "  - MTTR: {}", secs(m.mttr_s));
  let _ = writeln!(out, "  - RTO: {} (from {})", secs(m.rto_s), anchor(m.rto_anchor));
  if let Some(note) = m.note {
    let _ = writeln!(out, "  - Note: {}", note.describe());
  }
}

/// Render the report as the pretty-printed `metrics.json` document, newline-terminated.
pub fn render_json(r: &ResilienceReport) -> Result<String, EngineError> {
  let mut out = serde_json::to_string_pretty(r)?;
  out.push('\n');
  Ok(out)
}

/// Render the report as a Markdown document.
pub fn render_markdown(r: &ResilienceReport) -> String {
  let mut out = String::new();

  let _ = writeln!(out, "# Resilience metrics");
  let _ = writeln!(out);
  let _ = writeln!(out, "- Run directory: `{}`", r.run_dir);
  let _ = writeln!(out, "- Stable recovery: **{} consecutive OK probes**", r.stable_n);
  let _ = writeln!(out, "- Post-incident window: **{}s**", r.grace_period_s);
  let _ = writeln!(out, "- RPO: **{}**", r.rpo);
  let _ = writeln!(out);

  let _ = writeln!(out, "## Baseline");
  let _ = writeln!(out, "- FIRST_FAILURE before the first incident: **{}**", ts(r.baseline.first_failure_at));
  let _ = writeln!(out, "- Note: {}", r.baseline.note);
  let _ = writeln!(out);

  let _ = writeln!(out, "## Incidents (MTTD / MTTR / RTO)");
  if r.incidents.is_empty() {
    let _ = writeln!(out, "_No incidents found._");
    let _ = writeln!(out);
  } else {
    let mut incidents: Vec<_> = r.incidents.iter().collect();
    incidents.sort_by_key(|(kind, inc)| (inc.start, **kind));
    for (kind, inc) in incidents {
      let _ = writeln!(out, "### {} (`{}`)", kind, inc.id);
      let _ = writeln!(out, "- Start: {}", timestamp::format(&inc.start));
      let _ = writeln!(out, "- End: {}", ts(inc.end));
      if inc.action_at.is_some() {
        let _ = writeln!(out, "- Remediation action: {}", ts(inc.action_at));
      }
      for (endpoint, m) in &inc.endpoints {
        endpoint_block(&mut out, endpoint, m);
      }
      let _ = writeln!(out);
    }
  }

  if !r.overlaps.is_empty() {
    let _ = writeln!(out, "## Overlap warnings");
    for o in &r.overlaps {
      let _ = writeln!(
        out,
        "- {} ↔ {} ({}..{} | {}..{})",
        o.a,
        o.b,
        timestamp::format(&o.a_start),
        timestamp::format(&o.a_end),
        timestamp::format(&o.b_start),
        timestamp::format(&o.b_end)
      );
      let _ = writeln!(out, "  - {}", o.note);
    }
    let _ = writeln!(out);
  }

  if !r.endpoints.is_empty() {
    let _ = writeln!(out, "## Endpoint availability");
    let _ = writeln!(out, "| Endpoint | Samples | OK (%) | Max latency (ms) | P95 latency (ms) | First failure |");
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---|");
    for (endpoint, s) in &r.endpoints {
      let _ = writeln!(
        out,
        "| {} | {} | {:.1} | {} | {} | {} |",
        endpoint,
        s.samples,
        s.success_pct,
        s.max_latency_ms.map_or_else(|| ABSENT.to_string(), |v| v.to_string()),
        s.p95_latency_ms.map_or_else(|| ABSENT.to_string(), |v| v.to_string()),
        s.first_failure
          .as_ref()
          .map_or_else(|| ABSENT.to_string(), |f| format!("{} ({})", timestamp::format(&f.at), f.http_status)),
      );
    }
    let _ = writeln!(out);
  }

  let _ = writeln!(out, "## Load test (k6)");
  let _ = writeln!(out, "- http_reqs: **{}**", num(r.load_test.http_reqs));
  let _ = writeln!(out, "- p95: **{} ms**", num(r.load_test.p95_ms));
  let _ = writeln!(out, "- max: **{} ms**", num(r.load_test.max_ms));
  if let Some(src) = &r.load_test.source {
    let _ = writeln!(out, "- source: `{}`", src);
  }

  out
}
