mod common;

use common::data_path;

use wf_sim_scheduler::api::config_dto::{QuantityDto, SimulatorConfigDto};
use wf_sim_scheduler::api::workflow_dto::WorkflowInstanceDto;
use wf_sim_scheduler::domain::utils::id::ResourceName;
use wf_sim_scheduler::error::{ConversionError, Error, SchedulingError};
use wf_sim_scheduler::loader::parser::parse_json_file;
use wf_sim_scheduler::{SimulationRun, run_simulation, run_simulation_from_file};

fn inputs() -> (SimulatorConfigDto, WorkflowInstanceDto) {
    let config: SimulatorConfigDto = parse_json_file(data_path("config_diamond.json")).unwrap();
    let workflow: WorkflowInstanceDto = parse_json_file(data_path("workflow_diamond.json")).unwrap();
    (config, workflow)
}

fn run_with(compute: &str, storage: &str) -> Result<SimulationRun, Error> {
    let (mut config, workflow) = inputs();
    config.compute_service_scheme = compute.to_string();
    config.storage_service_scheme = storage.to_string();
    run_simulation(&config, &workflow)
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-6, "expected {}, got {}", expected, actual);
}

#[test]
fn leaky_scheme_reproduces_the_reference_makespan() {
    let run = run_simulation_from_file(data_path("config_diamond.json")).unwrap();

    // host_1 loses its only core during the first pass and never gets it back,
    // so all four tasks run one after the other on host_2.
    assert_close(run.report.makespan, 70.0);
    assert_eq!(run.report.workflow, "diamond");
    assert_eq!(run.report.jobs_submitted, 4);
    assert_eq!(run.report.tasks_completed, 4);
    assert_eq!(run.report.tasks_failed, 0);
    assert_eq!(run.report.dispatch_passes, 4);
    assert!(run.records.iter().all(|record| record.resource == "host_2"));
}

#[test]
fn exact_scheme_runs_independent_tasks_in_parallel() {
    let run = run_with("all_bare_metal_exact", "submit_only").unwrap();

    assert_close(run.report.makespan, 48.0);
    assert_eq!(run.report.dispatch_passes, 3);

    let work_1 = run.records.iter().find(|record| record.task == "work_1").unwrap();
    assert_eq!(work_1.resource, "host_1");
    assert_close(work_1.started_at, 17.0);
    assert_close(work_1.finished_at, 39.0);
}

#[test]
fn htcondor_pool_is_bounded_by_its_cores() {
    let run = run_with("htcondor_bare_metal", "submit_only").unwrap();

    assert_close(run.report.makespan, 48.0);
    assert!(run.records.iter().all(|record| record.resource == "htcondor_pool"));
}

#[test]
fn scratch_staging_adds_transfer_time() {
    let direct = run_with("all_bare_metal_exact", "submit_only").unwrap();
    let staged = run_with("all_bare_metal_exact", "submit_and_compute_hosts").unwrap();
    let streamed = run_with("all_bare_metal_exact", "compute_host_storage").unwrap();

    assert_eq!(staged.report.tasks_completed, 4);
    assert_eq!(streamed.report.tasks_completed, 4);
    assert!(staged.report.makespan > direct.report.makespan);
    assert!(streamed.report.makespan > direct.report.makespan);
}

#[test]
fn remote_streaming_on_the_pool_fails_with_missing_partner() {
    let err = run_with("htcondor_bare_metal", "compute_host_storage").unwrap_err();

    assert!(matches!(
        err,
        Error::Scheduling(SchedulingError::MissingStoragePartner(ref name)) if *name == ResourceName::new("htcondor_pool")
    ));
}

#[test]
fn unknown_schemes_are_rejected_before_scheduling() {
    assert!(matches!(
        run_with("kubernetes", "submit_only"),
        Err(Error::Conversion(ConversionError::UnknownComputeServiceScheme(ref name))) if name == "kubernetes"
    ));
    assert!(matches!(
        run_with("all_bare_metal", "tape_archive"),
        Err(Error::Conversion(ConversionError::UnknownStorageServiceScheme(_)))
    ));

    let (mut config, workflow) = inputs();
    config.failure_policy = Some("retry".to_string());
    assert!(matches!(run_simulation(&config, &workflow), Err(Error::Conversion(ConversionError::UnknownFailurePolicy(_)))));
}

#[test]
fn impossible_platform_numbers_are_rejected() {
    let (mut config, workflow) = inputs();
    config.platform.network.bandwidth = QuantityDto::from(0.0);
    assert!(matches!(run_simulation(&config, &workflow), Err(Error::Conversion(ConversionError::InvalidQuantity { .. }))));

    let (mut config, workflow) = inputs();
    config.platform.network.latency = QuantityDto::from(-5.0);
    assert!(matches!(run_simulation(&config, &workflow), Err(Error::Conversion(ConversionError::InvalidQuantity { .. }))));

    let (mut config, workflow) = inputs();
    config.platform.overheads.thread_startup_overhead = Some(QuantityDto::from("-100s"));
    assert!(matches!(run_simulation(&config, &workflow), Err(Error::Conversion(ConversionError::InvalidQuantity { .. }))));

    let (mut config, workflow) = inputs();
    config.workflow.reference_flops = QuantityDto::from("0Gf");
    assert!(matches!(run_simulation(&config, &workflow), Err(Error::Conversion(ConversionError::InvalidQuantity { .. }))));
}

#[test]
fn runtime_noise_is_reproducible() {
    let (mut config, workflow) = inputs();
    config.runtime_noise = serde_json::from_str(r#"{ "amplitude": 0.2, "seed": 7 }"#).unwrap();

    let first = run_simulation(&config, &workflow).unwrap();
    let second = run_simulation(&config, &workflow).unwrap();

    assert_eq!(first.report.makespan, second.report.makespan);
    assert_ne!(first.report.run_id, second.report.run_id);
}

#[test]
fn trace_is_written_as_csv() {
    let run = run_simulation_from_file(data_path("config_diamond.json")).unwrap();
    let path = std::env::temp_dir().join(format!("wf-sim-{}", run.report.run_id)).join("trace.csv");

    run.write_trace(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 5);
    assert!(content.lines().skip(1).all(|line| line.starts_with(&run.report.run_id.to_string())));

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn missing_workflow_file_is_an_io_error() {
    let dir = std::env::temp_dir().join(format!("wf-sim-missing-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let config_path = dir.join("config.json");

    let (mut config, _) = inputs();
    config.workflow.file = "nowhere.json".to_string();
    std::fs::write(&config_path, serde_json::to_string(&config).unwrap()).unwrap();

    assert!(matches!(run_simulation_from_file(&config_path), Err(Error::IoError(_))));

    std::fs::remove_dir_all(dir).unwrap();
}
