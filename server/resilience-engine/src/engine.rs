//! Core engine: loads a run directory and assembles the resilience report.

use std::path::Path;
use tracing::info;

use crate::baseline;
use crate::config::Config;
use crate::error::EngineError;
use crate::events;
use crate::incidents;
use crate::load_test;
use crate::probes;
use crate::recovery;
use crate::summary;
use crate::types::*;

/// The resilience metrics engine. Stateless between runs; holds only configuration.
pub struct Engine {
  config: Config,
}

impl Engine {
  pub fn new(config: Config) -> Result<Self, EngineError> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn with_defaults() -> Self {
    Self {
      config: Config::default(),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Load every input of `run_dir` and compute the report.
  ///
  /// Fails only when the probe file is missing or unreadable; event logs and
  /// the load-test summary are optional.
  pub fn run(&self, run_dir: &Path) -> Result<ResilienceReport, EngineError> {
    let samples = probes::load(&run_dir.join(&self.config.probe_file))?;
    let event_paths = events::discover(run_dir, &self.config.event_file);
    let events = events::load_merged(&event_paths)?;
    let monitor = events::load_monitor(run_dir, &self.config.event_file)?;
    let load_test = load_test::load(load_test::discover(run_dir).as_deref());

    Ok(self.assemble(&run_dir.display().to_string(), &samples, &events, &monitor, load_test))
  }

  /// Pure assembly over already-loaded, time-sorted inputs.
  ///
  /// `events` is the merged stream of every log; `monitor` is the run-root log
  /// alone and is only consulted for the baseline.
  pub fn assemble(
    &self,
    run_dir: &str,
    samples: &[ProbeSample],
    events: &[Event],
    monitor: &[Event],
    load_test: LoadTestSummary,
  ) -> ResilienceReport {
    let incident_map = incidents::extract(events);
    let ordered = incidents::by_start(&incident_map);
    let overlaps = incidents::detect_overlaps(&ordered);
    let baseline = baseline::detect(monitor, ordered.first().map(|i| i.start));

    let endpoints = if self.config.endpoints.is_empty() {
      summary::observed_endpoints(samples)
    } else {
      self.config.endpoints.clone()
    };

    let incident_reports = ordered
      .iter()
      .map(|inc| {
        let metrics = recovery::evaluate_incident(samples, inc, &endpoints, &self.config);
        info!(
          incident = %inc.kind,
          id = %inc.id,
          detected = metrics.values().filter(|m| m.first_failure_at.is_some()).count(),
          recovered = metrics.values().filter(|m| m.recovered_stable_at.is_some()).count(),
          "incident evaluated"
        );
        (
          inc.kind,
          IncidentReport {
            id: inc.id.clone(),
            start: inc.start,
            end: inc.end,
            action_at: inc.action_at,
            endpoints: metrics,
          },
        )
      })
      .collect();

    let timeline = events
      .iter()
      .filter(|e| e.kind != EventKind::Note)
      .map(|e| TimelineEntry {
        at: e.timestamp,
        kind: e.kind.label(),
        message: e.raw_message.clone(),
      })
      .collect();

    ResilienceReport {
      run_dir: run_dir.to_string(),
      rpo: self.config.rpo_note.clone(),
      stable_n: self.config.stable_n,
      grace_period_s: self.config.grace_period_s,
      baseline,
      overlaps,
      incidents: incident_reports,
      endpoints: summary::summarize(samples),
      timeline,
      load_test,
    }
  }
}
