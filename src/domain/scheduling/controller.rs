use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::platform::compute_resource::ComputeResourceId;
use crate::domain::platform::resource_store::ResourceStore;
use crate::domain::scheduling::compute_service_scheme::ResourceAllocator;
use crate::domain::scheduling::job::{Job, JobId};
use crate::domain::scheduling::resource_pool::ResourcePool;
use crate::domain::scheduling::scheduler_config::{FailurePolicy, SchedulerConfig};
use crate::domain::scheduling::storage_service_scheme::DataPlacementPlanner;
use crate::domain::scheduling::task_selector::ReadyTaskSelector;
use crate::domain::simulator::simulator::{ExecutionEnvironment, ExecutionEvent, FailureCause};
use crate::domain::utils::id::TaskId;
use crate::domain::utils::statistics::ANALYTICS_TARGET;
use crate::error::{ConversionError, SchedulingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    /// Waiting for ready tasks or notifications.
    Idle,
    /// Draining the current ready set.
    Dispatching,
    /// Blocked until the environment delivers one notification.
    AwaitingEvent,
    /// The workflow fully executed.
    Done,
    /// No notification can arrive and failed tasks keep the workflow unfinished.
    Halted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStatistics {
    pub jobs_submitted: usize,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub dispatch_passes: usize,
}

#[derive(Debug, Clone)]
struct InFlightJob {
    task: TaskId,
    target: ComputeResourceId,
}

/// The job dispatch loop.
///
/// Owns the resource pool and is its only writer: the allocator reserves cores
/// during a dispatch pass and completions give them back, one notification at
/// a time.
#[derive(Debug)]
pub struct Controller {
    config: SchedulerConfig,
    resources: Arc<ResourceStore>,
    pool: ResourcePool,
    selector: ReadyTaskSelector,
    allocator: ResourceAllocator,
    planner: DataPlacementPlanner,
    in_flight: HashMap<JobId, InFlightJob>,
    state: ControllerState,
    statistics: DispatchStatistics,
}

impl Controller {
    /// Resolves the configured policies once. Core counts are queried here and
    /// never again.
    pub fn new(config: SchedulerConfig, resources: Arc<ResourceStore>) -> Result<Self, ConversionError> {
        let allocator = config.compute_service_scheme.get_instance(&resources)?;
        let planner = config.storage_service_scheme.get_instance(&resources);
        let pool = ResourcePool::from_resources(&resources);
        let selector = ReadyTaskSelector::new(config.task_ordering);

        Ok(Self {
            config,
            resources,
            pool,
            selector,
            allocator,
            planner,
            in_flight: HashMap::new(),
            state: ControllerState::Idle,
            statistics: DispatchStatistics::default(),
        })
    }

    /// Dispatches ready tasks and processes notifications until the workflow is done.
    ///
    /// Ends early with an error if a task fails under [`FailurePolicy::Abort`]
    /// or if the environment runs out of notifications while work remains.
    pub fn run<E: ExecutionEnvironment>(&mut self, env: &mut E) -> Result<DispatchStatistics, SchedulingError> {
        log::info!(
            "Controller starting: {} unfinished task(s) on {} compute resource(s), compute scheme '{}', storage scheme '{}', {} task order.",
            env.get_num_unfinished_tasks(),
            self.pool.get_num_of_resources(),
            self.config.compute_service_scheme,
            self.config.storage_service_scheme,
            self.selector.direction()
        );
        self.state = ControllerState::Idle;

        while !env.is_done() {
            self.dispatch_pass(env)?;

            self.state = ControllerState::AwaitingEvent;
            match env.wait_for_next_event() {
                Some(event) => {
                    self.process_event(event, env.get_current_time_in_s())?;
                    self.state = ControllerState::Idle;
                }
                None if self.config.failure_policy == FailurePolicy::Continue && self.statistics.jobs_failed > 0 => {
                    log::warn!(
                        "No further notifications; {} task(s) stay unfinished after {} failure(s).",
                        env.get_num_unfinished_tasks(),
                        self.statistics.jobs_failed
                    );
                    self.state = ControllerState::Halted;
                    return Ok(self.statistics);
                }
                None => return Err(SchedulingError::Stalled { unfinished: env.get_num_unfinished_tasks() }),
            }
        }

        self.state = ControllerState::Done;
        log::info!("Workflow execution complete at {:.3}s.", env.get_current_time_in_s());

        Ok(self.statistics)
    }

    /// Submits ready tasks in selector order until one cannot be allocated.
    ///
    /// The scheduling overhead is charged before every task. An empty ready set
    /// performs no allocation, no placement and no submission.
    pub fn dispatch_pass<E: ExecutionEnvironment>(&mut self, env: &mut E) -> Result<usize, SchedulingError> {
        let ready_tasks = self.selector.order(env.ready_tasks());
        if ready_tasks.is_empty() {
            return Ok(0);
        }

        self.state = ControllerState::Dispatching;
        self.statistics.dispatch_passes += 1;
        let mut submitted = 0;

        for task in ready_tasks {
            env.sleep(self.config.scheduling_overhead);

            let Some(allocation) = self.allocator.allocate(&task, &mut self.pool, &self.resources) else {
                log::debug!("No compute resource available for task {}, ending the dispatch pass.", task.id);
                break;
            };

            let placement = self.planner.plan(&task, allocation.target, &self.resources)?;
            let task_id = task.id.clone();
            let job = Job::new(task, placement, allocation.service_arguments)?;

            log::debug!("Submitting job for task {} to {:?}.", task_id, self.pool.get_name(allocation.target));
            let job_id = env.submit_job(job, allocation.target)?;

            tracing::info!(
                target: ANALYTICS_TARGET,
                Time = env.get_current_time_in_s(),
                LogDescription = "Job submitted",
                TaskId = %task_id,
                ComputeResource = ?self.pool.get_name(allocation.target),
                RemainingCores = ?self.pool.get_remaining(allocation.target),
            );

            self.in_flight.insert(job_id, InFlightJob { task: task_id, target: allocation.target });
            self.statistics.jobs_submitted += 1;
            submitted += 1;
        }

        Ok(submitted)
    }

    /// Handles one notification. Never batched: the pool reflects it before the next pass.
    pub fn process_event(&mut self, event: ExecutionEvent, now: f64) -> Result<(), SchedulingError> {
        let job_id = event.get_job();
        let job = self.in_flight.remove(&job_id).ok_or_else(|| SchedulingError::UnknownJob(format!("{:?}", job_id)))?;

        match event {
            ExecutionEvent::JobCompleted { .. } => self.on_job_completion(job, now),
            ExecutionEvent::JobFailed { cause, .. } => self.on_job_failure(job, cause, now),
        }
    }

    fn on_job_completion(&mut self, job: InFlightJob, now: f64) -> Result<(), SchedulingError> {
        log::info!("Notified that a job has completed task {}.", job.task);

        if self.allocator.is_core_counted() {
            self.pool.release(job.target)?;
        }
        self.statistics.jobs_completed += 1;

        tracing::info!(
            target: ANALYTICS_TARGET,
            Time = now,
            LogDescription = "Job completed",
            TaskId = %job.task,
            RemainingCores = ?self.pool.get_remaining(job.target),
        );

        Ok(())
    }

    fn on_job_failure(&mut self, job: InFlightJob, cause: FailureCause, now: f64) -> Result<(), SchedulingError> {
        self.statistics.jobs_failed += 1;

        tracing::info!(
            target: ANALYTICS_TARGET,
            Time = now,
            LogDescription = "Job failed",
            TaskId = %job.task,
            Cause = %cause,
        );

        match self.config.failure_policy {
            FailurePolicy::Abort => {
                log::error!("Notified that a job has failed for task {} ({}).", job.task, cause);
                Err(SchedulingError::TaskFailed { task: job.task, cause: cause.to_string() })
            }
            FailurePolicy::Continue => {
                log::warn!("Notified that a job has failed for task {} ({}), continuing.", job.task, cause);
                Ok(())
            }
        }
    }

    pub fn get_state(&self) -> ControllerState {
        self.state
    }

    pub fn get_resource_pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn get_statistics(&self) -> DispatchStatistics {
        self.statistics
    }

    pub fn get_num_in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
