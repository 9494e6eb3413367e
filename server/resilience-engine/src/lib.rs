//! Chaos Experiment Resilience Metrics Engine: deterministic, offline.
//!
//! Converts a prober's sample series and the experiment's incident event logs
//! into per-incident, per-endpoint recovery metrics (MTTD / MTTR / RTO), with
//! overlap warnings and a pre-incident baseline.
//!
//! No network, no DB; pure computation over complete files.

pub mod baseline;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod incidents;
pub mod probes;
pub mod recovery;
pub mod report;
pub mod summary;
pub mod timestamp;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use types::{Incident, IncidentKind, MetricResult, ResilienceReport};
