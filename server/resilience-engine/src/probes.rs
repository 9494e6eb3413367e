//! Probe series loader: the prober's tabular output into a time-ordered sample sequence.
//!
//! Rows are `timestamp, endpoint, http_status, latency_ms, success` (or the
//! four-column form without latency). The delimiter is not declared by the
//! file, so every line is offered to a fixed list of row parsers and the
//! first one that yields a well-formed row wins.

use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::timestamp;
use crate::types::ProbeSample;

/// Row parsers, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
  Comma,
  Semicolon,
  Tab,
  Whitespace,
}

impl Delimiter {
  pub const PRIORITY: [Delimiter; 4] = [Self::Comma, Self::Semicolon, Self::Tab, Self::Whitespace];

  fn split<'a>(self, line: &'a str) -> Vec<&'a str> {
    match self {
      Self::Comma => line.split(',').map(str::trim).collect(),
      Self::Semicolon => line.split(';').map(str::trim).collect(),
      Self::Tab => line.split('\t').map(str::trim).collect(),
      Self::Whitespace => line.split_whitespace().collect(),
    }
  }
}

/// Load and sort the probe file. A missing file is fatal; bad rows are not.
pub fn load(path: &Path) -> Result<Vec<ProbeSample>, EngineError> {
  if !path.is_file() {
    return Err(EngineError::MissingInput {
      path: path.to_path_buf(),
    });
  }
  let bytes = fs::read(path).map_err(|e| EngineError::io(path, e))?;
  let raw = String::from_utf8_lossy(&bytes);
  let samples = parse_series(&raw);
  info!(path = %path.display(), samples = samples.len(), "probe series loaded");
  Ok(samples)
}

/// Parse every line, drop the ones no parser accepts, stable-sort by timestamp.
pub fn parse_series(raw: &str) -> Vec<ProbeSample> {
  let mut samples: Vec<ProbeSample> = raw
    .lines()
    .enumerate()
    .filter_map(|(idx, line)| {
      let parsed = parse_row(line);
      if parsed.is_none() && !line.trim().is_empty() {
        debug!(line = idx + 1, "probe row skipped");
      }
      parsed
    })
    .collect();
  samples.sort_by_key(|s| s.timestamp);
  samples
}

/// Parse one row, trying each delimiter in priority order.
pub fn parse_row(line: &str) -> Option<ProbeSample> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }
  Delimiter::PRIORITY
    .iter()
    .find_map(|d| row_from_fields(&d.split(line)))
}

fn row_from_fields(fields: &[&str]) -> Option<ProbeSample> {
  if fields.len() < 4 {
    return None;
  }
  let timestamp = timestamp::parse(fields[0])?;
  let endpoint = fields[1];
  if endpoint.is_empty() {
    return None;
  }
  let (latency_ms, ok_field) = if fields.len() >= 5 {
    (Some(lenient_number(fields[3])), fields[4])
  } else {
    (None, fields[3])
  };
  let status_code = u16::try_from(lenient_number(fields[2])).unwrap_or(0);

  Some(ProbeSample {
    timestamp,
    endpoint: endpoint.to_string(),
    status_code,
    latency_ms,
    success: parse_success(ok_field),
  })
}

/// Integer or decimal (truncated); anything else is 0.
fn lenient_number(s: &str) -> u64 {
  let s = s.trim();
  if let Ok(v) = s.parse::<u64>() {
    return v;
  }
  match s.parse::<f64>() {
    Ok(v) if v.is_finite() && v >= 0.0 => v as u64,
    _ => 0,
  }
}

fn parse_success(s: &str) -> bool {
  matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "ok")
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  #[test]
  fn parses_csv_with_latency() {
    let s = parse_row("2026-01-21T10:00:05+00:00,/ping,200,12,1").unwrap();
    assert_eq!(s.timestamp, Utc.with_ymd_and_hms(2026, 1, 21, 10, 0, 5).unwrap());
    assert_eq!(s.endpoint, "/ping");
    assert_eq!(s.status_code, 200);
    assert_eq!(s.latency_ms, Some(12));
    assert!(s.success);
  }

  #[test]
  fn parses_four_column_form() {
    let s = parse_row("2026-01-21T10:00:05+00:00;/secure-data;503;0").unwrap();
    assert_eq!(s.status_code, 503);
    assert_eq!(s.latency_ms, None);
    assert!(!s.success);
  }

  #[test]
  fn parses_tab_and_whitespace() {
    let tab = parse_row("2026-01-21T10:00:05+00:00\t/ping\t200\t8.7\tok").unwrap();
    assert_eq!(tab.latency_ms, Some(8));
    assert!(tab.success);

    let ws = parse_row("2026-01-21T10:00:05+00:00   /ping 000  0   0").unwrap();
    assert_eq!(ws.status_code, 0);
    assert!(!ws.success);
  }

  #[test]
  fn extra_columns_ignored() {
    let s = parse_row("2026-01-21T10:00:05+00:00,/ping,200,3,true,extra,more").unwrap();
    assert!(s.success);
    assert_eq!(s.latency_ms, Some(3));
  }

  #[test]
  fn malformed_numbers_default_to_zero() {
    let s = parse_row("2026-01-21T10:00:05+00:00,/ping,timeout,n/a,0").unwrap();
    assert_eq!(s.status_code, 0);
    assert_eq!(s.latency_ms, Some(0));
    let big = parse_row("2026-01-21T10:00:05+00:00,/ping,70000,1,1").unwrap();
    assert_eq!(big.status_code, 0);
  }

  #[test]
  fn header_and_garbage_rows_skipped() {
    assert!(parse_row("ts_iso,endpoint,http_code,lat_ms,ok").is_none());
    assert!(parse_row("just some words").is_none());
    assert!(parse_row("2026-01-21T10:00:05+00:00,/ping").is_none());
    assert!(parse_row("   ").is_none());
  }

  #[test]
  fn series_is_sorted_by_timestamp() {
    let raw = "ts_iso,endpoint,http_code,lat_ms,ok\n\
               2026-01-21T10:00:10+00:00,/ping,200,5,1\n\
               2026-01-21T10:00:00+00:00,/ping,200,5,1\n\
               garbage\n\
               2026-01-21T10:00:05+00:00,/secure-data,000,0,0\n";
    let samples = parse_series(raw);
    assert_eq!(samples.len(), 3);
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(samples[1].endpoint, "/secure-data");
  }

  #[test]
  fn missing_file_is_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(&dir.path().join("http_metrics.csv")).unwrap_err();
    assert!(err.is_missing_input());
  }
}
