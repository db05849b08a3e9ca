use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use wf_sim_scheduler::domain::utils::statistics::init_analytics;
use wf_sim_scheduler::{logger, run_simulation_from_file};

/// Simulates the execution of a workflow under the configured scheduling and data placement policies.
#[derive(Parser, Debug)]
#[command(name = "wf-sim-scheduler", version, about)]
struct Cli {
    /// Path to the JSON simulator configuration.
    config: PathBuf,

    /// Write the per-task execution trace to this CSV file.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Write structured analytics events as JSON lines into this directory.
    #[arg(long)]
    analytics_dir: Option<PathBuf>,

    /// Directory of the human-readable log file.
    #[arg(long, default_value = logger::DEFAULT_LOG_DIR)]
    log_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(&cli.log_dir);

    let _analytics_guard = match &cli.analytics_dir {
        Some(dir) => Some(init_analytics(dir).with_context(|| format!("failed to set up analytics in '{}'", dir.display()))?),
        None => None,
    };

    let run = run_simulation_from_file(&cli.config).with_context(|| format!("simulation of '{}' failed", cli.config.display()))?;

    if let Some(path) = &cli.trace {
        run.write_trace(path).with_context(|| format!("failed to write trace '{}'", path.display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&run.report)?);
    Ok(())
}
