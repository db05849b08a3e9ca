use std::path::Path;
use std::sync::Arc;

use crate::api::config_dto::SimulatorConfigDto;
use crate::api::workflow_dto::WorkflowInstanceDto;
use crate::domain::platform::resource_store::ResourceStore;
use crate::domain::scheduling::controller::Controller;
use crate::domain::scheduling::scheduler_config::SchedulerConfig;
use crate::domain::simulator::engine::{DiscreteEventSimulation, RuntimeNoise};
use crate::domain::utils::statistics::{self, ANALYTICS_TARGET, ExecutionRecord, RunReport};
use crate::domain::workflow::workflow::Workflow;
use crate::error::Result;
use crate::loader::parser::{parse_json_file, resolve_relative_to};

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Result of a completed simulation run.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub report: RunReport,
    pub records: Vec<ExecutionRecord>,
}

impl SimulationRun {
    pub fn write_trace(&self, path: &Path) -> Result<()> {
        statistics::write_execution_trace(path, &self.records)
    }
}

/// Validates the configuration, builds workflow and platform and runs the
/// dispatch loop on the discrete-event engine until the workflow is done.
pub fn run_simulation(config_dto: &SimulatorConfigDto, workflow_dto: &WorkflowInstanceDto) -> Result<SimulationRun> {
    // Phase 1: Resolve configuration once
    let config = SchedulerConfig::try_from(config_dto)?;
    let reference_flops = config_dto.workflow.reference_flops.positive_flops()?;
    let noise = config_dto.runtime_noise.as_ref().map(|noise| RuntimeNoise::new(noise.amplitude, noise.seed)).transpose()?;

    // Phase 2: Workflow and platform
    let workflow = Workflow::create_from_dto(workflow_dto, reference_flops)?;
    let resources = Arc::new(ResourceStore::create_from_dto(&config_dto.platform, config.compute_service_scheme.layout())?);

    // Phase 3: Run
    let mut controller = Controller::new(config, resources.clone())?;
    let mut engine = DiscreteEventSimulation::new(workflow, resources, noise);
    log::info!("About to execute workflow '{}' (run {}).", engine.get_workflow().name, engine.get_run_id());

    let dispatch = controller.run(&mut engine)?;
    let report = engine.report(&dispatch);

    tracing::info!(
        target: ANALYTICS_TARGET,
        Time = report.makespan,
        LogDescription = "Run finished",
        RunId = %report.run_id,
        Workflow = %report.workflow,
        JobsSubmitted = report.jobs_submitted,
        TasksCompleted = report.tasks_completed,
        TasksFailed = report.tasks_failed,
        DispatchPasses = report.dispatch_passes,
    );
    log::info!("Simulated makespan: {:.3}s over {} dispatch pass(es).", report.makespan, report.dispatch_passes);

    Ok(SimulationRun { report, records: engine.get_records().to_vec() })
}

/// Loads the configuration file and the workflow it references, relative to
/// the configuration file's directory, and runs the simulation.
pub fn run_simulation_from_file(config_path: impl AsRef<Path>) -> Result<SimulationRun> {
    let config_path = config_path.as_ref();
    let config_dto: SimulatorConfigDto = parse_json_file(config_path)?;
    log::info!("Configuration '{}' parsed successfully.", config_path.display());

    let workflow_path = resolve_relative_to(config_path, &config_dto.workflow.file);
    let workflow_dto: WorkflowInstanceDto = parse_json_file(&workflow_path)?;
    log::info!("Workflow '{}' parsed successfully.", workflow_path.display());

    run_simulation(&config_dto, &workflow_dto)
}
