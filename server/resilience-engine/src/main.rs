//! Binary entrypoint: analyse one experiment run directory.
//!
//! Writes `metrics.json` (and `metrics.md`) into the run directory, or prints
//! the JSON document to stdout with `--stdout`. Logs go to stderr.
//!
//! Exit codes: 0 success, 2 missing required input or bad usage, 1 anything else.

use anyhow::{Context, Result};
use clap::Parser;
use resilience_engine::{config, report, Config, Engine, EngineError};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(
  name = "resilience-engine",
  about = "Recovery metrics (MTTD / MTTR / RTO) for chaos experiment runs",
  version,
  long_about = None
)]
struct Cli {
  /// Run directory containing http_metrics.csv and events.log
  run_dir: PathBuf,

  /// Consecutive OK probes required for stable recovery
  #[arg(long)]
  stable_n: Option<u32>,

  /// Seconds after incident end still searched
  #[arg(long)]
  grace_seconds: Option<u64>,

  /// Monitored endpoint (repeatable); replaces the configured list
  #[arg(long = "endpoint")]
  endpoints: Vec<String>,

  /// TOML config file (default: <RUN_DIR>/resilience.toml when present)
  #[arg(long)]
  config: Option<PathBuf>,

  /// JSON output path (default: <RUN_DIR>/metrics.json)
  #[arg(long)]
  output: Option<PathBuf>,

  /// Skip writing metrics.md
  #[arg(long)]
  no_markdown: bool,

  /// Print the JSON document to stdout instead of writing files
  #[arg(long)]
  stdout: bool,

  /// Emit logs as JSON
  #[arg(long)]
  log_json: bool,
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.log_json);

  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!("{:#}", e);
      let missing = e
        .downcast_ref::<EngineError>()
        .is_some_and(EngineError::is_missing_input);
      ExitCode::from(if missing { 2 } else { 1 })
    }
  }
}

fn init_tracing(json: bool) {
  let builder = tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr);
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}

/// Defaults < TOML file < run-dir override files < CLI flags.
fn resolve_config(cli: &Cli) -> Result<Config> {
  let toml_path = cli.config.clone().or_else(|| {
    let candidate = cli.run_dir.join(config::CONFIG_FILE);
    candidate.is_file().then_some(candidate)
  });

  let mut cfg = match &toml_path {
    Some(path) => Config::from_toml_file(path)
      .with_context(|| format!("loading config {}", path.display()))?,
    None => Config::default(),
  };
  cfg.apply_run_dir_overrides(&cli.run_dir);

  if let Some(n) = cli.stable_n {
    cfg.stable_n = n;
  }
  if let Some(s) = cli.grace_seconds {
    cfg.grace_period_s = s;
  }
  if !cli.endpoints.is_empty() {
    cfg.endpoints = cli.endpoints.clone();
  }
  Ok(cfg)
}

fn run(cli: &Cli) -> Result<()> {
  let engine = Engine::new(resolve_config(cli)?)?;
  info!(
    run_dir = %cli.run_dir.display(),
    stable_n = engine.config().stable_n,
    grace_period_s = engine.config().grace_period_s,
    "analysing run"
  );

  let result = engine
    .run(&cli.run_dir)
    .with_context(|| format!("analysing {}", cli.run_dir.display()))?;

  let json = report::render_json(&result)?;
  if cli.stdout {
    print!("{}", json);
    return Ok(());
  }

  // Render everything up front so a failed run leaves no partial output.
  let markdown = (!cli.no_markdown).then(|| report::render_markdown(&result));
  let json_path = cli
    .output
    .clone()
    .unwrap_or_else(|| cli.run_dir.join("metrics.json"));

  fs::write(&json_path, json).with_context(|| format!("writing {}", json_path.display()))?;
  info!(path = %json_path.display(), "metrics.json written");

  if let Some(markdown) = markdown {
    let md_path = json_path.with_extension("md");
    if let Err(e) = fs::write(&md_path, markdown) {
      let _ = fs::remove_file(&json_path);
      return Err(e).with_context(|| format!("writing {}", md_path.display()));
    }
    info!(path = %md_path.display(), "metrics.md written");
  }
  Ok(())
}
