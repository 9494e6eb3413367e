//! ISO-8601 timestamp parsing/formatting shared by the loaders and the JSON contract.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const OFFSET_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f%z",
  "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 timestamp and normalize it to UTC.
///
/// Accepts RFC 3339 (`Z` or `+hh:mm`), compact offsets (`+hhmm`), a space
/// instead of `T`, and offset-less timestamps (taken as UTC).
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for fmt in OFFSET_FORMATS {
    if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
      return Some(dt.with_timezone(&Utc));
    }
  }
  for fmt in NAIVE_FORMATS {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(naive.and_utc());
    }
  }
  None
}

/// RFC 3339 with an explicit `+00:00` offset.
pub fn format(ts: &DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Elapsed seconds from `earlier` to `later`, millisecond resolution.
pub fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
  (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// `#[serde(serialize_with)]` helpers so output types can keep `DateTime<Utc>`.
pub mod rfc3339 {
  use chrono::{DateTime, Utc};
  use serde::Serializer;

  pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&super::format(ts))
  }
}

pub mod rfc3339_opt {
  use chrono::{DateTime, Utc};
  use serde::Serializer;

  pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
    match ts {
      Some(ts) => s.serialize_str(&super::format(ts)),
      None => s.serialize_none(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 21, h, m, s).unwrap()
  }

  #[test]
  fn parses_rfc3339_variants() {
    assert_eq!(parse("2026-01-21T05:55:44+00:00"), Some(utc(5, 55, 44)));
    assert_eq!(parse("2026-01-21T05:55:44Z"), Some(utc(5, 55, 44)));
    assert_eq!(parse("  2026-01-21T06:55:44+01:00 "), Some(utc(5, 55, 44)));
  }

  #[test]
  fn parses_compact_offset_and_space_separator() {
    assert_eq!(parse("2026-01-21T05:55:44+0000"), Some(utc(5, 55, 44)));
    assert_eq!(parse("2026-01-21 05:55:44+00:00"), Some(utc(5, 55, 44)));
  }

  #[test]
  fn offsetless_timestamp_is_utc() {
    assert_eq!(parse("2026-01-21T05:55:44"), Some(utc(5, 55, 44)));
  }

  #[test]
  fn rejects_garbage() {
    assert_eq!(parse("ts_iso"), None);
    assert_eq!(parse(""), None);
    assert_eq!(parse("2026-13-40T99:00:00Z"), None);
  }

  #[test]
  fn format_uses_explicit_offset() {
    assert_eq!(format(&utc(10, 0, 5)), "2026-01-21T10:00:05+00:00");
  }

  #[test]
  fn seconds_between_keeps_millis() {
    let a = utc(10, 0, 0);
    let b = a + chrono::Duration::milliseconds(2500);
    assert!((seconds_between(b, a) - 2.5).abs() < f64::EPSILON);
  }
}
