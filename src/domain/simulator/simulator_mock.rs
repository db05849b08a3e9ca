use std::collections::{HashSet, VecDeque};

use slotmap::SlotMap;

use crate::domain::platform::compute_resource::ComputeResourceId;
use crate::domain::scheduling::job::{Job, JobId};
use crate::domain::simulator::simulator::{ExecutionEvent, FailureCause, JobManager, SystemSimulator, WorkflowGraph};
use crate::domain::utils::id::TaskId;
use crate::domain::workflow::task::{Task, TaskKey};
use crate::domain::workflow::workflow::Workflow;
use crate::error::SchedulingError;

/// A submitted job as observed by the mock.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job_id: JobId,
    pub job: Job,
    pub target: ComputeResourceId,
    /// Number of `wait_for_next_event` calls before this submission.
    pub pass: usize,
    pub time: f64,
}

/// Scripted execution environment.
///
/// Every submitted job yields exactly one notification, delivered FIFO:
/// a failure for tasks registered with [`MockEnvironment::fail_task`], a
/// completion otherwise. With `auto_notify` disabled nothing is queued and
/// notifications have to be injected by hand.
#[derive(Debug)]
pub struct MockEnvironment {
    pub workflow: Workflow,
    pub auto_notify: bool,
    pub submissions: Vec<Submission>,
    pub sleeps: Vec<f64>,
    pub wait_calls: usize,
    pub events_delivered: usize,
    failing_tasks: HashSet<TaskId>,
    jobs: SlotMap<JobId, TaskKey>,
    pending_events: VecDeque<ExecutionEvent>,
    time: f64,
}

impl MockEnvironment {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            auto_notify: true,
            submissions: Vec::new(),
            sleeps: Vec::new(),
            wait_calls: 0,
            events_delivered: 0,
            failing_tasks: HashSet::new(),
            jobs: SlotMap::with_key(),
            pending_events: VecDeque::new(),
            time: 0.0,
        }
    }

    pub fn without_auto_notify(mut self) -> Self {
        self.auto_notify = false;
        self
    }

    pub fn fail_task(&mut self, task: impl Into<TaskId>) {
        self.failing_tasks.insert(task.into());
    }

    pub fn inject(&mut self, event: ExecutionEvent) {
        self.pending_events.push_back(event);
    }

    pub fn remaining_events(&self) -> usize {
        self.pending_events.len()
    }

    pub fn submitted_task_ids(&self) -> Vec<String> {
        self.submissions.iter().map(|submission| submission.job.get_task().id.to_string()).collect()
    }
}

impl WorkflowGraph for MockEnvironment {
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

impl JobManager for MockEnvironment {
    fn submit_job(&mut self, job: Job, target: ComputeResourceId) -> Result<JobId, SchedulingError> {
        let task = job.get_task();
        if !self.workflow.mark_pending(task.key) {
            return Err(SchedulingError::TaskNotReady(task.id.clone()));
        }

        let job_id = self.jobs.insert(task.key);
        if self.auto_notify {
            let event = if self.failing_tasks.contains(&task.id) {
                ExecutionEvent::JobFailed { job: job_id, cause: FailureCause::Other(format!("scripted failure of {}", task.id)) }
            } else {
                ExecutionEvent::JobCompleted { job: job_id }
            };
            self.pending_events.push_back(event);
        }

        self.submissions.push(Submission { job_id, job, target, pass: self.wait_calls, time: self.time });
        Ok(job_id)
    }
}

impl SystemSimulator for MockEnvironment {
    fn get_current_time_in_s(&self) -> f64 {
        self.time
    }

    fn sleep(&mut self, duration_in_s: f64) {
        self.sleeps.push(duration_in_s);
        self.time += duration_in_s;
    }

    fn wait_for_next_event(&mut self) -> Option<ExecutionEvent> {
        self.wait_calls += 1;
        let event = self.pending_events.pop_front()?;

        if let Some(key) = self.jobs.get(event.get_job()).copied() {
            match &event {
                ExecutionEvent::JobCompleted { .. } => self.workflow.mark_completed(key),
                ExecutionEvent::JobFailed { .. } => self.workflow.mark_failed(key),
            };
        }

        self.events_delivered += 1;
        Some(event)
    }
}
