use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use loadtask::{config::Config, telemetry::init_tracing, Driver, Engine, Script};

/// Run a load test script the way the task runtime would.
#[derive(Parser, Debug)]
#[command(name = "loadtask")]
struct Args {
    /// Script to run (YAML or JSON)
    script: PathBuf,

    /// Invocation id used in log lines; defaults to the current time in ms
    #[arg(long)]
    id: Option<String>,

    /// Origin of the invocation, overrides `_genesis`
    #[arg(long)]
    genesis: Option<String>,

    /// Log entry and exit of the run
    #[arg(long)]
    trace: bool,

    /// Skip the engine and return a zero-error report
    #[arg(long)]
    simulation: bool,

    /// Extra TOML config merged over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(args.config.as_deref())?;
    init_tracing(&cfg.log);

    let mut script = Script::from_path(&args.script).await?;
    if let Some(genesis) = args.genesis {
        script.genesis = Some(Value::String(genesis));
    }
    script.trace |= args.trace;
    script.simulation |= args.simulation;

    let invocation_id = args
        .id
        .unwrap_or_else(|| Utc::now().timestamp_millis().to_string());

    let mut driver = Driver::new(engine(&cfg)?);
    if let Some(dir) = &cfg.driver.working_dir {
        driver = driver.with_working_dir(dir);
    }

    let report = driver.exec_load(&invocation_id, &script).await?;
    let rendered = serde_json::to_string_pretty(&report)?;

    match &cfg.output.report_path {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

#[cfg(feature = "sim")]
fn engine(cfg: &Config) -> Result<Arc<dyn Engine>> {
    Ok(Arc::new(loadtask::SimulatedEngine::new(cfg.engine.phase_tick())))
}

#[cfg(not(feature = "sim"))]
fn engine(_cfg: &Config) -> Result<Arc<dyn Engine>> {
    anyhow::bail!("no load engine compiled in; build with the `sim` feature or embed the library")
}
