//! Baseline filter: monitor failures seen before any fault was injected.

use chrono::{DateTime, Utc};

use crate::types::{BaselineRecord, Event, EventKind};

const BASELINE_NOTE: &str =
  "Baseline FIRST_FAILURE only counts when it occurs before the first INCIDENT_START.";

/// First FIRST_FAILURE marker strictly before `first_incident_start`.
///
/// Without incidents there is nothing to separate noise from, so the record is empty.
pub fn detect(events: &[Event], first_incident_start: Option<DateTime<Utc>>) -> BaselineRecord {
  let hit = first_incident_start.and_then(|cutoff| {
    events
      .iter()
      .take_while(|e| e.timestamp < cutoff)
      .find_map(|e| match e.kind {
        EventKind::FirstFailure(flags) => Some((e.timestamp, flags)),
        _ => None,
      })
  });

  BaselineRecord {
    first_failure_at: hit.map(|(at, _)| at),
    ping_ok: hit.and_then(|(_, f)| f.ping_ok),
    secure_ok: hit.and_then(|(_, f)| f.secure_ok),
    note: BASELINE_NOTE.into(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::parse_log;
  use chrono::TimeZone;

  fn ts(min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 21, 10, min, sec).unwrap()
  }

  #[test]
  fn failure_before_first_incident_is_baseline() {
    let events = parse_log(
      "[2026-01-21T09:59:00Z] FIRST_FAILURE ping_ok=1 secure_ok=0\n\
       [2026-01-21T10:00:30Z] FIRST_FAILURE ping_ok=0 secure_ok=0\n",
    );
    let b = detect(&events, Some(ts(0, 0)));
    assert_eq!(b.first_failure_at, Some(Utc.with_ymd_and_hms(2026, 1, 21, 9, 59, 0).unwrap()));
    assert_eq!(b.ping_ok, Some(true));
    assert_eq!(b.secure_ok, Some(false));
  }

  #[test]
  fn failure_at_incident_start_is_not_baseline() {
    let events = parse_log("[2026-01-21T10:00:00Z] FIRST_FAILURE ping_ok=0 secure_ok=0\n");
    let b = detect(&events, Some(ts(0, 0)));
    assert_eq!(b.first_failure_at, None);
    assert_eq!(b.ping_ok, None);
  }

  #[test]
  fn no_incidents_means_no_baseline() {
    let events = parse_log("[2026-01-21T09:00:00Z] FIRST_FAILURE ping_ok=0 secure_ok=0\n");
    assert_eq!(detect(&events, None).first_failure_at, None);
  }

  #[test]
  fn other_markers_ignored() {
    let events = parse_log(
      "[2026-01-21T09:58:00Z] RECOVERED ping_ok=1 secure_ok=1\n\
       [2026-01-21T09:59:00Z] something else\n",
    );
    assert_eq!(detect(&events, Some(ts(0, 0))).first_failure_at, None);
  }
}
