use std::fs;
use std::path::Path;

use serde::Serialize;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;
use uuid::Uuid;

use crate::error::Result;

/// Target of all structured analytics events.
pub const ANALYTICS_TARGET: &str = "analytics";

const ANALYTICS_FILE: &str = "analytics.jsonl";

/// Routes analytics events into `<dir>/analytics.jsonl` as JSON lines.
///
/// The returned guard flushes the writer when dropped and must be kept alive
/// for the whole run.
pub fn init_analytics(dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, ANALYTICS_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_writer(writer)
        .with_timer(LocalTime::new(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]")))
        .with_env_filter(EnvFilter::new(format!("{}=info", ANALYTICS_TARGET)))
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::warn!("A tracing subscriber is already installed, analytics stay with it.");
    } else {
        log::info!("Analytics are written to '{}'.", dir.join(ANALYTICS_FILE).display());
    }

    Ok(guard)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Completed,
    Failed,
}

/// One row of the execution trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub run_id: Uuid,
    pub task: String,
    pub resource: String,
    pub submitted_at: f64,
    pub started_at: f64,
    pub finished_at: f64,
    pub outcome: ExecutionOutcome,
}

pub fn write_execution_trace(path: &Path, records: &[ExecutionRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    log::info!("Wrote {} execution records to '{}'.", records.len(), path.display());
    Ok(())
}

/// Summary of one simulated workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow: String,
    /// Simulated seconds until the last notification was delivered.
    pub makespan: f64,
    pub jobs_submitted: usize,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub dispatch_passes: usize,
}
