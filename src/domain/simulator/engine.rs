use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;
use uuid::Uuid;

use crate::domain::platform::compute_resource::ComputeResourceId;
use crate::domain::platform::resource_store::ResourceStore;
use crate::domain::platform::storage_service::StorageServiceId;
use crate::domain::scheduling::controller::DispatchStatistics;
use crate::domain::scheduling::job::{FileLocation, Job, JobId, StorageTarget};
use crate::domain::simulator::simulator::{ExecutionEvent, FailureCause, JobManager, SystemSimulator, WorkflowGraph};
use crate::domain::utils::id::{FileId, HostName};
use crate::domain::utils::statistics::{self, ExecutionOutcome, ExecutionRecord, RunReport};
use crate::domain::workflow::task::{Task, TaskState};
use crate::domain::workflow::workflow::Workflow;
use crate::error::{ConversionError, SchedulingError};

/// Seeded multiplicative perturbation of task compute times.
#[derive(Debug, Clone)]
pub struct RuntimeNoise {
    amplitude: f64,
    rng: StdRng,
}

impl RuntimeNoise {
    /// `amplitude` is the maximum relative deviation and must lie in `[0, 1)`.
    pub fn new(amplitude: f64, seed: u64) -> Result<Self, ConversionError> {
        if !(0.0..1.0).contains(&amplitude) {
            return Err(ConversionError::InvalidQuantity {
                value: amplitude.to_string(),
                reason: "runtime noise amplitude must lie in [0, 1)".to_string(),
            });
        }

        Ok(Self { amplitude, rng: StdRng::seed_from_u64(seed) })
    }

    fn factor(&mut self) -> f64 {
        if self.amplitude == 0.0 {
            return 1.0;
        }
        1.0 + self.rng.random_range(-self.amplitude..=self.amplitude)
    }
}

#[derive(Debug, Clone)]
struct ScheduledEvent {
    time: f64,
    sequence: u64,
    job: JobId,
    outcome: Result<(), FailureCause>,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.total_cmp(&other.time).then_with(|| self.sequence.cmp(&other.sequence))
    }
}

#[derive(Debug, Clone)]
struct JobRecord {
    job: Job,
    target: ComputeResourceId,
    submitted_at: f64,
    started_at: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct CoreQueue {
    free: u32,
    waiting: VecDeque<JobId>,
}

/// One end of a data transfer.
struct Endpoint {
    host: HostName,
    read_bandwidth: f64,
    write_bandwidth: f64,
}

/// Discrete-event execution of a workflow on a platform.
///
/// Owns the virtual clock, the workflow state and the contents of every
/// storage service. Each submitted job holds one core of its target resource
/// for its whole duration; jobs beyond the free cores wait FIFO per resource.
/// Notifications are handed out one at a time in time order, ties broken by
/// insertion order.
#[derive(Debug)]
pub struct DiscreteEventSimulation {
    run_id: Uuid,
    workflow: Workflow,
    resources: Arc<ResourceStore>,

    clock: f64,
    sequence: u64,
    events: BinaryHeap<Reverse<ScheduledEvent>>,

    jobs: SlotMap<JobId, JobRecord>,
    cores: HashMap<ComputeResourceId, CoreQueue>,
    storage_contents: HashMap<StorageServiceId, BTreeSet<FileId>>,

    noise: Option<RuntimeNoise>,
    records: Vec<ExecutionRecord>,
}

impl DiscreteEventSimulation {
    /// Workflow input files start out on the submit host's storage.
    pub fn new(workflow: Workflow, resources: Arc<ResourceStore>, noise: Option<RuntimeNoise>) -> Self {
        let cores = resources
            .compute_resource_ids()
            .into_iter()
            .filter_map(|id| resources.get_compute_resource(id).map(|r| (id, CoreQueue { free: r.get_total_cores(), waiting: VecDeque::new() })))
            .collect();

        let mut storage_contents: HashMap<StorageServiceId, BTreeSet<FileId>> = HashMap::new();
        let inputs: BTreeSet<FileId> = workflow.get_input_files().into_iter().map(|file| file.id).collect();
        log::debug!("Staging {} workflow input file(s) on the submit storage.", inputs.len());
        storage_contents.insert(resources.get_submit_storage(), inputs);

        Self {
            run_id: Uuid::new_v4(),
            workflow,
            resources,
            clock: 0.0,
            sequence: 0,
            events: BinaryHeap::new(),
            jobs: SlotMap::with_key(),
            cores,
            storage_contents,
            noise,
            records: Vec::new(),
        }
    }

    pub fn get_run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn get_workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn get_records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn contains_file(&self, storage: StorageServiceId, file: &FileId) -> bool {
        self.storage_contents.get(&storage).is_some_and(|files| files.contains(file))
    }

    pub fn get_num_of_free_cores(&self, resource: ComputeResourceId) -> Option<u32> {
        self.cores.get(&resource).map(|queue| queue.free)
    }

    pub fn write_trace(&self, path: &Path) -> crate::error::Result<()> {
        statistics::write_execution_trace(path, &self.records)
    }

    pub fn report(&self, dispatch: &DispatchStatistics) -> RunReport {
        RunReport {
            run_id: self.run_id,
            workflow: self.workflow.name.clone(),
            makespan: self.clock,
            jobs_submitted: dispatch.jobs_submitted,
            tasks_completed: self.workflow.get_num_in_state(TaskState::Completed),
            tasks_failed: self.workflow.get_num_in_state(TaskState::Failed),
            dispatch_passes: dispatch.dispatch_passes,
        }
    }

    fn schedule(&mut self, time: f64, job: JobId, outcome: Result<(), FailureCause>) {
        self.sequence += 1;
        self.events.push(Reverse(ScheduledEvent { time, sequence: self.sequence, job, outcome }));
    }

    fn start_job(&mut self, id: JobId, at: f64) {
        let Some(record) = self.jobs.get_mut(id) else {
            return;
        };
        record.started_at = Some(at);
        let job = record.job.clone();
        let target = record.target;

        match self.check_sources(&job) {
            Ok(()) => {
                let duration = self.job_duration(&job, target);
                log::debug!("Task {} starts at {:.3}s for {:.3}s.", job.get_task().id, at, duration);
                self.schedule(at + duration, id, Ok(()));
            }
            Err(cause) => {
                log::debug!("Task {} cannot start: {}.", job.get_task().id, cause);
                self.schedule(at, id, Err(cause));
            }
        }
    }

    /// Every pre-copy source and every input must be present, taking the
    /// job's own pre-copies into account.
    fn check_sources(&self, job: &Job) -> Result<(), FailureCause> {
        let placement = job.get_placement();
        let mut staged: HashSet<(StorageTarget, FileId)> = HashSet::new();

        for copy in &placement.pre_file_copies {
            if !self.is_present(&copy.source, &staged) {
                return Err(FailureCause::FileNotFound { location: copy.source.clone() });
            }
            staged.insert((copy.destination.target, copy.destination.file.clone()));
        }

        for file in &job.get_task().input_files {
            let location = job.get_file_location(&file.id).ok_or_else(|| FailureCause::Other(format!("no location for input {}", file.id)))?;
            if !self.is_present(location, &staged) {
                return Err(FailureCause::FileNotFound { location: location.clone() });
            }
        }

        Ok(())
    }

    fn is_present(&self, location: &FileLocation, staged: &HashSet<(StorageTarget, FileId)>) -> bool {
        if staged.contains(&(location.target, location.file.clone())) {
            return true;
        }
        match location.target {
            StorageTarget::Service(storage) => self.contains_file(storage, &location.file),
            StorageTarget::Scratch => false,
        }
    }

    /// Start-up overhead, pre-copies, input reads, computation, output writes and post-copies.
    fn job_duration(&mut self, job: &Job, target: ComputeResourceId) -> f64 {
        let noise = self.noise.as_mut().map_or(1.0, RuntimeNoise::factor);

        let Some(resource) = self.resources.get_compute_resource(target) else {
            return 0.0;
        };
        let task = job.get_task();
        let placement = job.get_placement();
        let sizes: HashMap<&FileId, u64> = task.files().map(|file| (&file.id, file.size)).collect();
        let size_of = |file: &FileId| sizes.get(file).copied().unwrap_or(0);

        let exec_host = resource.hosts.first().map(|host| host.name.clone()).unwrap_or_else(|| HostName::new(resource.name.as_str()));
        let compute = Endpoint { host: exec_host.clone(), read_bandwidth: f64::INFINITY, write_bandwidth: f64::INFINITY };

        let mut duration = resource.startup_overhead;

        for copy in &placement.pre_file_copies {
            duration +=
                self.transfer_time(&self.endpoint(&copy.source, &exec_host, target), &self.endpoint(&copy.destination, &exec_host, target), size_of(&copy.source.file));
        }
        for file in &task.input_files {
            if let Some(location) = job.get_file_location(&file.id) {
                duration += self.transfer_time(&self.endpoint(location, &exec_host, target), &compute, file.size);
            }
        }

        duration += task.flops / resource.get_core_speed() * noise;

        for file in &task.output_files {
            if let Some(location) = job.get_file_location(&file.id) {
                duration += self.transfer_time(&compute, &self.endpoint(location, &exec_host, target), file.size);
            }
        }
        for copy in &placement.post_file_copies {
            duration +=
                self.transfer_time(&self.endpoint(&copy.source, &exec_host, target), &self.endpoint(&copy.destination, &exec_host, target), size_of(&copy.source.file));
        }

        duration
    }

    fn endpoint(&self, location: &FileLocation, exec_host: &HostName, target: ComputeResourceId) -> Endpoint {
        match location.target {
            StorageTarget::Service(id) => match self.resources.get_storage_service(id) {
                Some(storage) => Endpoint { host: storage.host.clone(), read_bandwidth: storage.read_bandwidth, write_bandwidth: storage.write_bandwidth },
                None => Endpoint { host: exec_host.clone(), read_bandwidth: f64::INFINITY, write_bandwidth: f64::INFINITY },
            },
            StorageTarget::Scratch => {
                let (read_bandwidth, write_bandwidth) = self
                    .resources
                    .get_compute_resource(target)
                    .map_or((f64::INFINITY, f64::INFINITY), |r| (r.scratch_read_bandwidth, r.scratch_write_bandwidth));
                Endpoint { host: exec_host.clone(), read_bandwidth, write_bandwidth }
            }
        }
    }

    /// Latency when crossing hosts plus size over the narrowest bandwidth on the path.
    fn transfer_time(&self, source: &Endpoint, destination: &Endpoint, size: u64) -> f64 {
        let mut bandwidth = source.read_bandwidth.min(destination.write_bandwidth);
        let mut latency = 0.0;

        if source.host != destination.host {
            bandwidth = bandwidth.min(self.resources.network.bandwidth);
            latency = self.resources.network.latency;
        }

        if size == 0 {
            return latency;
        }
        latency + size as f64 / bandwidth
    }

    /// Frees the core of a finished job or hands it to the next waiting job.
    fn release_core(&mut self, target: ComputeResourceId, at: f64) {
        let Some(queue) = self.cores.get_mut(&target) else {
            return;
        };

        match queue.waiting.pop_front() {
            Some(next) => {
                let start = self.jobs.get(next).map_or(at, |record| at.max(record.submitted_at));
                self.start_job(next, start);
            }
            None => queue.free += 1,
        }
    }

    /// Makes the outputs and staged copies of a completed job visible.
    fn materialize(&mut self, job: &Job) {
        let placement = job.get_placement();
        let mut written: Vec<&FileLocation> = placement.pre_file_copies.iter().map(|copy| &copy.destination).collect();
        written.extend(job.get_task().output_files.iter().filter_map(|file| job.get_file_location(&file.id)));
        written.extend(placement.post_file_copies.iter().map(|copy| &copy.destination));

        for location in written {
            if let StorageTarget::Service(storage) = location.target {
                self.storage_contents.entry(storage).or_default().insert(location.file.clone());
            }
        }

        for location in &placement.cleanup_file_deletions {
            if let StorageTarget::Service(storage) = location.target
                && let Some(files) = self.storage_contents.get_mut(&storage)
            {
                files.remove(&location.file);
            }
        }
    }

    fn record(&mut self, id: JobId, finished_at: f64, outcome: ExecutionOutcome) {
        let Some(record) = self.jobs.get(id) else {
            return;
        };
        let resource = self.resources.get_compute_resource_name(record.target).map(|name| name.to_string()).unwrap_or_default();

        self.records.push(ExecutionRecord {
            run_id: self.run_id,
            task: record.job.get_task().id.to_string(),
            resource,
            submitted_at: record.submitted_at,
            started_at: record.started_at.unwrap_or(finished_at),
            finished_at,
            outcome,
        });
    }
}

impl WorkflowGraph for DiscreteEventSimulation {
    fn ready_tasks(&self) -> Vec<Task> {
        self.workflow.ready_tasks()
    }

    fn is_done(&self) -> bool {
        self.workflow.is_done()
    }

    fn get_num_unfinished_tasks(&self) -> usize {
        WorkflowGraph::get_num_unfinished_tasks(&self.workflow)
    }
}

impl JobManager for DiscreteEventSimulation {
    fn submit_job(&mut self, job: Job, target: ComputeResourceId) -> Result<JobId, SchedulingError> {
        if !self.cores.contains_key(&target) {
            return Err(SchedulingError::UnknownComputeResource(format!("{:?}", target)));
        }

        let task = job.get_task();
        if !self.workflow.mark_pending(task.key) {
            return Err(SchedulingError::TaskNotReady(task.id.clone()));
        }
        log::trace!("Job for task {} submitted with arguments {:?}.", task.id, job.get_service_arguments());

        let id = self.jobs.insert(JobRecord { job, target, submitted_at: self.clock, started_at: None });

        let start_now = match self.cores.get_mut(&target) {
            Some(queue) if queue.free > 0 => {
                queue.free -= 1;
                true
            }
            Some(queue) => {
                queue.waiting.push_back(id);
                false
            }
            None => false,
        };
        if start_now {
            self.start_job(id, self.clock);
        }

        Ok(id)
    }
}

impl SystemSimulator for DiscreteEventSimulation {
    fn get_current_time_in_s(&self) -> f64 {
        self.clock
    }

    fn sleep(&mut self, duration_in_s: f64) {
        if duration_in_s > 0.0 {
            self.clock += duration_in_s;
        }
    }

    fn wait_for_next_event(&mut self) -> Option<ExecutionEvent> {
        let Reverse(event) = self.events.pop()?;
        self.clock = self.clock.max(event.time);

        let (job, target) = self.jobs.get(event.job).map(|record| (record.job.clone(), record.target))?;
        let key = job.get_task().key;

        let notification = match event.outcome {
            Ok(()) => {
                self.materialize(&job);
                self.workflow.mark_completed(key);
                self.record(event.job, event.time, ExecutionOutcome::Completed);
                ExecutionEvent::JobCompleted { job: event.job }
            }
            Err(cause) => {
                self.workflow.mark_failed(key);
                self.record(event.job, event.time, ExecutionOutcome::Failed);
                ExecutionEvent::JobFailed { job: event.job, cause }
            }
        };

        self.release_core(target, event.time);
        Some(notification)
    }
}
