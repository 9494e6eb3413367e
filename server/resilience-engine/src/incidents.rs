//! Incident extraction (start/end/action markers into intervals) and overlap detection.
//!
//! Fold rules per incident type, applied in one pass over the time-sorted stream:
//! - `start`: first marker wins
//! - `end`: last marker wins
//! - `action_at`: last remediation marker wins (attributed to `process_kill`)
//!
//! A type that never started is dropped; an end that precedes the start is
//! discarded and the incident is treated as open-ended.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::fingerprint;
use crate::types::{Event, EventKind, Incident, IncidentKind, OverlapWarning};

const OVERLAP_NOTE: &str = "Overlapping incidents can contaminate causal attribution of failures.";

#[derive(Debug, Default)]
struct Markers {
  start: Option<DateTime<Utc>>,
  end: Option<DateTime<Utc>>,
  action_at: Option<DateTime<Utc>>,
}

/// Build the immutable incident map from a time-sorted event stream.
pub fn extract(events: &[Event]) -> BTreeMap<IncidentKind, Incident> {
  let mut markers: BTreeMap<IncidentKind, Markers> = BTreeMap::new();

  for ev in events {
    match ev.kind {
      EventKind::IncidentStart(kind) => {
        let m = markers.entry(kind).or_default();
        if m.start.is_none() {
          m.start = Some(ev.timestamp);
        }
      }
      EventKind::IncidentEnd(kind) => {
        markers.entry(kind).or_default().end = Some(ev.timestamp);
      }
      EventKind::RemediationAction => {
        markers.entry(IncidentKind::ProcessKill).or_default().action_at = Some(ev.timestamp);
      }
      _ => {}
    }
  }

  markers
    .into_iter()
    .filter_map(|(kind, m)| {
      let Some(start) = m.start else {
        debug!(%kind, "incident without start marker dropped");
        return None;
      };
      let end = match m.end {
        Some(end) if end < start => {
          warn!(%kind, start = %start, end = %end, "incident end precedes start; treating as open-ended");
          None
        }
        other => other,
      };
      Some((
        kind,
        Incident {
          id: fingerprint::incident_id(kind, &start),
          kind,
          start,
          end,
          action_at: m.action_at,
        },
      ))
    })
    .collect()
}

/// Incidents in evaluation order: ascending start, then type for ties.
pub fn by_start(incidents: &BTreeMap<IncidentKind, Incident>) -> Vec<&Incident> {
  let mut list: Vec<&Incident> = incidents.values().collect();
  list.sort_by_key(|i| (i.start, i.kind));
  list
}

/// Half-open intersection: touching endpoints do not overlap.
pub fn overlaps(a_start: DateTime<Utc>, a_end: DateTime<Utc>, b_start: DateTime<Utc>, b_end: DateTime<Utc>) -> bool {
  !(a_end <= b_start || b_end <= a_start)
}

/// Pairwise overlap warnings among closed incidents, in `by_start` order.
pub fn detect_overlaps(incidents: &[&Incident]) -> Vec<OverlapWarning> {
  let closed: Vec<(&Incident, DateTime<Utc>)> = incidents
    .iter()
    .filter_map(|i| i.end.map(|end| (*i, end)))
    .collect();

  let mut warnings = Vec::new();
  for (i, (a, a_end)) in closed.iter().enumerate() {
    for (b, b_end) in closed.iter().skip(i + 1) {
      if overlaps(a.start, *a_end, b.start, *b_end) {
        warn!(a = %a.kind, b = %b.kind, "overlapping incidents");
        warnings.push(OverlapWarning {
          a: a.kind,
          b: b.kind,
          a_start: a.start,
          a_end: *a_end,
          b_start: b.start,
          b_end: *b_end,
          note: OVERLAP_NOTE.into(),
        });
      }
    }
  }
  warnings
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::parse_log;
  use chrono::TimeZone;

  fn ts(min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 21, 10, min, sec).unwrap()
  }

  fn closed(kind: IncidentKind, start: DateTime<Utc>, end: DateTime<Utc>) -> Incident {
    Incident {
      id: fingerprint::incident_id(kind, &start),
      kind,
      start,
      end: Some(end),
      action_at: None,
    }
  }

  #[test]
  fn folds_start_end_and_action() {
    let events = parse_log(
      "[2026-01-21T10:00:00Z] INCIDENT_START type=kill_api\n\
       [2026-01-21T10:00:03Z] ACTION deleting_one_api_pod\n\
       [2026-01-21T10:00:20Z] INCIDENT_END type=kill_api\n",
    );
    let incidents = extract(&events);
    let inc = &incidents[&IncidentKind::ProcessKill];
    assert_eq!(inc.start, ts(0, 0));
    assert_eq!(inc.end, Some(ts(0, 20)));
    assert_eq!(inc.action_at, Some(ts(0, 3)));
    assert!(inc.id.starts_with("inc-"));
  }

  #[test]
  fn first_start_and_last_end_win() {
    let events = parse_log(
      "[2026-01-21T10:00:00Z] INCIDENT_START type=dos\n\
       [2026-01-21T10:00:10Z] INCIDENT_END type=dos\n\
       [2026-01-21T10:01:00Z] INCIDENT_START type=dos\n\
       [2026-01-21T10:01:30Z] INCIDENT_END type=dos\n",
    );
    let incidents = extract(&events);
    assert_eq!(incidents.len(), 1);
    let inc = &incidents[&IncidentKind::Flood];
    assert_eq!(inc.start, ts(0, 0));
    assert_eq!(inc.end, Some(ts(1, 30)));
  }

  #[test]
  fn incident_without_start_dropped() {
    let events = parse_log(
      "[2026-01-21T10:00:20Z] INCIDENT_END type=netfail\n\
       [2026-01-21T10:00:03Z] ACTION deleting_one_api_pod\n",
    );
    assert!(extract(&events).is_empty());
  }

  #[test]
  fn missing_end_is_open_ended() {
    let events = parse_log("[2026-01-21T10:00:00Z] INCIDENT_START type=netfail\n");
    let incidents = extract(&events);
    assert!(incidents[&IncidentKind::NetworkPartition].is_open_ended());
  }

  #[test]
  fn end_before_start_discarded() {
    let events = parse_log(
      "[2026-01-21T09:00:00Z] INCIDENT_END type=netfail\n\
       [2026-01-21T10:00:00Z] INCIDENT_START type=netfail\n",
    );
    let incidents = extract(&events);
    assert_eq!(incidents[&IncidentKind::NetworkPartition].end, None);
  }

  #[test]
  fn by_start_orders_chronologically() {
    let mut map = BTreeMap::new();
    map.insert(IncidentKind::Flood, closed(IncidentKind::Flood, ts(5, 0), ts(6, 0)));
    map.insert(
      IncidentKind::NetworkPartition,
      closed(IncidentKind::NetworkPartition, ts(1, 0), ts(2, 0)),
    );
    let order: Vec<IncidentKind> = by_start(&map).iter().map(|i| i.kind).collect();
    assert_eq!(order, vec![IncidentKind::NetworkPartition, IncidentKind::Flood]);
  }

  #[test]
  fn overlap_is_symmetric_and_touching_is_not_overlap() {
    assert!(overlaps(ts(0, 0), ts(5, 0), ts(3, 0), ts(8, 0)));
    assert!(overlaps(ts(3, 0), ts(8, 0), ts(0, 0), ts(5, 0)));
    assert!(!overlaps(ts(0, 0), ts(5, 0), ts(5, 0), ts(10, 0)));
    assert!(!overlaps(ts(5, 0), ts(10, 0), ts(0, 0), ts(5, 0)));
    // Containment.
    assert!(overlaps(ts(0, 0), ts(10, 0), ts(2, 0), ts(3, 0)));
  }

  #[test]
  fn detect_overlaps_reports_pairs() {
    let a = closed(IncidentKind::Flood, ts(0, 0), ts(5, 0));
    let b = closed(IncidentKind::ProcessKill, ts(3, 0), ts(8, 0));
    let c = closed(IncidentKind::NetworkPartition, ts(8, 0), ts(10, 0));
    let warnings = detect_overlaps(&[&a, &b, &c]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].a, IncidentKind::Flood);
    assert_eq!(warnings[0].b, IncidentKind::ProcessKill);
    assert_eq!(warnings[0].b_end, ts(8, 0));
  }

  #[test]
  fn open_ended_incidents_excluded_from_overlap() {
    let a = closed(IncidentKind::Flood, ts(0, 0), ts(5, 0));
    let mut b = closed(IncidentKind::ProcessKill, ts(1, 0), ts(2, 0));
    b.end = None;
    assert!(detect_overlaps(&[&a, &b]).is_empty());
  }
}
