//! Event log loader: `[<timestamp>] <message>` lines into classified events.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::timestamp;
use crate::types::{Event, EventKind, IncidentKind, LogLine, ProbeFlags};

const INCIDENT_START: &str = "INCIDENT_START";
const INCIDENT_END: &str = "INCIDENT_END";
const REMEDIATION_ACTION: &str = "ACTION deleting_one_api_pod";
const FIRST_FAILURE: &str = "FIRST_FAILURE";
const RECOVERED: &str = "RECOVERED";

/// Classify one raw line. Lines without a leading bracketed timestamp are discarded.
pub fn parse_line(line: &str) -> LogLine {
  let line = line.trim();
  let Some(rest) = line.strip_prefix('[') else {
    return LogLine::Discard;
  };
  let Some((ts_raw, msg)) = rest.split_once(']') else {
    return LogLine::Discard;
  };
  if !msg.starts_with(char::is_whitespace) {
    return LogLine::Discard;
  }
  let Some(timestamp) = timestamp::parse(ts_raw) else {
    return LogLine::Discard;
  };
  let msg = msg.trim();
  LogLine::Event(Event {
    timestamp,
    raw_message: msg.to_string(),
    kind: classify(msg),
  })
}

/// Map a message to its marker kind. Incident markers with an unknown type are notes.
pub fn classify(msg: &str) -> EventKind {
  if msg.contains(INCIDENT_START) {
    return match field(msg, "type").and_then(IncidentKind::from_str_loose) {
      Some(kind) => EventKind::IncidentStart(kind),
      None => EventKind::Note,
    };
  }
  if msg.contains(INCIDENT_END) {
    return match field(msg, "type").and_then(IncidentKind::from_str_loose) {
      Some(kind) => EventKind::IncidentEnd(kind),
      None => EventKind::Note,
    };
  }
  if msg.contains(REMEDIATION_ACTION) {
    return EventKind::RemediationAction;
  }
  if msg.contains(FIRST_FAILURE) {
    return EventKind::FirstFailure(flags(msg));
  }
  if msg.contains(RECOVERED) {
    return EventKind::Recovered(flags(msg));
  }
  EventKind::Note
}

/// Value of a whitespace-delimited `key=value` token.
fn field<'a>(msg: &'a str, key: &str) -> Option<&'a str> {
  msg
    .split_whitespace()
    .filter_map(|tok| tok.split_once('='))
    .find(|(k, _)| *k == key)
    .map(|(_, v)| v)
    .filter(|v| !v.is_empty())
}

fn flag(msg: &str, key: &str) -> Option<bool> {
  match field(msg, key)? {
    "1" => Some(true),
    "0" => Some(false),
    _ => None,
  }
}

fn flags(msg: &str) -> ProbeFlags {
  ProbeFlags {
    ping_ok: flag(msg, "ping_ok"),
    secure_ok: flag(msg, "secure_ok"),
  }
}

/// Parse a whole log body, keeping only timestamped lines, sorted by time.
pub fn parse_log(raw: &str) -> Vec<Event> {
  let mut events: Vec<Event> = raw
    .lines()
    .filter_map(|line| match parse_line(line) {
      LogLine::Event(ev) => Some(ev),
      LogLine::Discard => None,
    })
    .collect();
  events.sort_by_key(|e| e.timestamp);
  events
}

/// Event files for a run: the monitor's root log plus one per fault directory.
pub fn discover(run_dir: &Path, event_file: &str) -> Vec<PathBuf> {
  let mut paths = vec![run_dir.join(event_file)];
  for kind in IncidentKind::ALL {
    for dir in kind.dir_aliases() {
      paths.push(run_dir.join(dir).join(event_file));
    }
  }
  paths.into_iter().filter(|p| p.is_file()).collect()
}

/// Load, merge and de-duplicate every event file. All files are optional.
/// Events of the run-root log only, where the availability monitor writes its
/// FIRST_FAILURE / RECOVERED markers. A missing file yields no events.
pub fn load_monitor(run_dir: &Path, event_file: &str) -> Result<Vec<Event>, EngineError> {
  let path = run_dir.join(event_file);
  if !path.is_file() {
    return Ok(Vec::new());
  }
  load_merged(&[path])
}

pub fn load_merged(paths: &[PathBuf]) -> Result<Vec<Event>, EngineError> {
  let mut merged = Vec::new();
  for path in paths {
    let bytes = fs::read(path).map_err(|e| EngineError::io(path, e))?;
    let events = parse_log(&String::from_utf8_lossy(&bytes));
    debug!(path = %path.display(), events = events.len(), "event log parsed");
    merged.extend(events);
  }
  Ok(merge(merged))
}

/// Stable-sort by timestamp and drop exact `(timestamp, message)` repeats.
pub fn merge(events: Vec<Event>) -> Vec<Event> {
  let mut seen = HashSet::new();
  let mut out: Vec<Event> = events
    .into_iter()
    .filter(|e| seen.insert((e.timestamp, e.raw_message.clone())))
    .collect();
  out.sort_by_key(|e| e.timestamp);
  info!(events = out.len(), "event stream merged");
  out
}
