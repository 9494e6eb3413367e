//! Stable identifiers for incidents.

use chrono::{DateTime, Utc};

use crate::timestamp;
use crate::types::IncidentKind;

/// Compute a stable incident id from its type and start instant.
///
/// Uses blake3 so the same run always yields the same ids.
pub fn incident_id(kind: IncidentKind, start: &DateTime<Utc>) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(kind.as_str().as_bytes());
  hasher.update(b"|");
  hasher.update(timestamp::format(start).as_bytes());
  let hex = hasher.finalize().to_hex();
  format!("inc-{}", &hex[..16])
}
