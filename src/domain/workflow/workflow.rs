use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use slotmap::SlotMap;

use crate::api::workflow_dto::{TaskDto, WorkflowInstanceDto};
use crate::domain::utils::id::{FileId, TaskId};
use crate::domain::workflow::data_file::DataFile;
use crate::domain::workflow::task::{Task, TaskKey, TaskState};
use crate::error::ConversionError;

#[derive(Debug, Clone)]
struct WorkflowNode {
    task: Task,
    state: TaskState,
    parents: BTreeSet<TaskKey>,
    children: BTreeSet<TaskKey>,
}

/// The workflow DAG together with the execution state of every task.
///
/// Readiness is derived from the graph: a task becomes `Ready` once all of its
/// parents are `Completed`. Only the execution side moves tasks forward; the
/// scheduler observes `ready_tasks` and `is_done`.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: String,
    nodes: SlotMap<TaskKey, WorkflowNode>,
    name_index: HashMap<TaskId, TaskKey>,
    files: BTreeMap<FileId, DataFile>,
    producers: HashMap<FileId, TaskKey>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), nodes: SlotMap::with_key(), name_index: HashMap::new(), files: BTreeMap::new(), producers: HashMap::new() }
    }

    /// Constructs the workflow graph from a WfCommons instance.
    ///
    /// `reference_flops` converts the measured runtimes into amounts of work.
    pub fn create_from_dto(dto: &WorkflowInstanceDto, reference_flops: f64) -> Result<Self, ConversionError> {
        let mut workflow = Workflow::new(dto.name.clone());

        // Phase 1: Create all tasks with their files
        for task_dto in &dto.workflow.tasks {
            let (inputs, outputs) = Self::split_files(task_dto)?;
            workflow.add_task(task_dto.name.as_str(), task_dto.runtime * reference_flops, inputs, outputs)?;
        }

        // Phase 2: Explicit control dependencies
        for task_dto in &dto.workflow.tasks {
            let child = TaskId::new(task_dto.name.clone());
            for parent in &task_dto.parents {
                workflow.add_control_dependency(&TaskId::new(parent.clone()), &child)?;
            }
        }

        // Phase 3: Data dependencies, ready states and cycle check
        workflow.seal()?;

        log::info!("Workflow '{}' loaded with {} tasks and {} files.", workflow.name, workflow.get_num_of_tasks(), workflow.files.len());

        Ok(workflow)
    }

    fn split_files(task_dto: &TaskDto) -> Result<(Vec<DataFile>, Vec<DataFile>), ConversionError> {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        for file in &task_dto.files {
            let data_file = DataFile::new(file.name.as_str(), file.size.bytes()?);
            match file.link.as_str() {
                "input" => inputs.push(data_file),
                "output" => outputs.push(data_file),
                other => {
                    return Err(ConversionError::UnknownFileLink { task: TaskId::new(task_dto.name.clone()), link: other.to_string() });
                }
            }
        }

        Ok((inputs, outputs))
    }

    /// Adds a task. Dependencies implied by shared files are derived in [`Workflow::seal`].
    pub fn add_task(
        &mut self,
        id: impl Into<TaskId>,
        flops: f64,
        input_files: Vec<DataFile>,
        output_files: Vec<DataFile>,
    ) -> Result<TaskKey, ConversionError> {
        let id = id.into();
        if self.name_index.contains_key(&id) {
            return Err(ConversionError::DuplicateTask(id));
        }

        // A rejected task must leave the workflow unchanged.
        for file in &output_files {
            if let Some(first) = self.producers.get(&file.id) {
                return Err(ConversionError::MultipleProducers { file: file.id.clone(), first: self.nodes[*first].task.id.clone(), second: id });
            }
        }
        let mut seen: HashMap<&FileId, u64> = HashMap::new();
        for file in input_files.iter().chain(output_files.iter()) {
            let known = self.files.get(&file.id).map(|known| known.size).or_else(|| seen.get(&file.id).copied());
            match known {
                Some(size) if size != file.size => {
                    return Err(ConversionError::InconsistentFileSize { file: file.id.clone(), first: size, second: file.size });
                }
                _ => {
                    seen.insert(&file.id, file.size);
                }
            }
        }

        for file in input_files.iter().chain(output_files.iter()) {
            self.files.entry(file.id.clone()).or_insert_with(|| file.clone());
        }

        let key = self.nodes.insert_with_key(|key| WorkflowNode {
            task: Task { key, id: id.clone(), flops, input_files, output_files },
            state: TaskState::NotReady,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        });
        for file in &self.nodes[key].task.output_files {
            self.producers.insert(file.id.clone(), key);
        }

        self.name_index.insert(id, key);
        Ok(key)
    }

    pub fn add_control_dependency(&mut self, parent: &TaskId, child: &TaskId) -> Result<(), ConversionError> {
        let parent_key =
            *self.name_index.get(parent).ok_or_else(|| ConversionError::UnknownParent { task: child.clone(), parent: parent.clone() })?;
        let child_key = *self.name_index.get(child).ok_or_else(|| ConversionError::UnknownParent { task: child.clone(), parent: child.clone() })?;

        self.link(parent_key, child_key);
        Ok(())
    }

    fn link(&mut self, parent: TaskKey, child: TaskKey) {
        if parent == child {
            return;
        }
        self.nodes[parent].children.insert(child);
        self.nodes[child].parents.insert(parent);
    }

    /// Adds producer → consumer edges, computes the initial ready set and
    /// rejects cyclic graphs. Must be called once all tasks are added.
    pub fn seal(&mut self) -> Result<(), ConversionError> {
        let mut data_edges = Vec::new();
        for (key, node) in &self.nodes {
            for file in &node.task.input_files {
                if let Some(producer) = self.producers.get(&file.id) {
                    data_edges.push((*producer, key));
                }
            }
        }
        for (parent, child) in data_edges {
            self.link(parent, child);
        }

        self.check_acyclic()?;

        for node in self.nodes.values_mut() {
            if node.state == TaskState::NotReady && node.parents.is_empty() {
                node.state = TaskState::Ready;
            }
        }

        Ok(())
    }

    /// Kahn's algorithm; any task left unvisited sits on a cycle.
    fn check_acyclic(&self) -> Result<(), ConversionError> {
        let mut in_degree: HashMap<TaskKey, usize> = self.nodes.iter().map(|(key, node)| (key, node.parents.len())).collect();
        let mut queue: VecDeque<TaskKey> = in_degree.iter().filter(|(_, degree)| **degree == 0).map(|(key, _)| *key).collect();
        let mut visited = 0;

        while let Some(key) = queue.pop_front() {
            visited += 1;
            for child in &self.nodes[key].children {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*child);
                    }
                }
            }
        }

        if visited == self.nodes.len() {
            return Ok(());
        }

        let on_cycle = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(key, _)| self.nodes[*key].task.id.clone())
            .min()
            .unwrap_or_else(|| TaskId::new(""));
        Err(ConversionError::DependencyCycle(on_cycle))
    }

    //---------------------
    // --- Graph queries ---
    //---------------------

    /// Tasks whose parents all completed and which were not submitted yet, in arena order.
    pub fn ready_tasks(&self) -> Vec<Task> {
        self.nodes.values().filter(|node| node.state == TaskState::Ready).map(|node| node.task.clone()).collect()
    }

    pub fn is_done(&self) -> bool {
        self.nodes.values().all(|node| node.state == TaskState::Completed)
    }

    pub fn get_task(&self, key: TaskKey) -> Option<&Task> {
        self.nodes.get(key).map(|node| &node.task)
    }

    pub fn get_key(&self, id: &TaskId) -> Option<TaskKey> {
        self.name_index.get(id).copied()
    }

    pub fn get_state(&self, key: TaskKey) -> Option<TaskState> {
        self.nodes.get(key).map(|node| node.state)
    }

    pub fn get_parents(&self, key: TaskKey) -> Vec<TaskKey> {
        self.nodes.get(key).map(|node| node.parents.iter().copied().collect()).unwrap_or_default()
    }

    pub fn get_num_of_tasks(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_num_in_state(&self, state: TaskState) -> usize {
        self.nodes.values().filter(|node| node.state == state).count()
    }

    /// Files no task produces; they have to exist before execution starts.
    pub fn get_input_files(&self) -> Vec<DataFile> {
        self.files.values().filter(|file| !self.producers.contains_key(&file.id)).cloned().collect()
    }

    //------------------------
    // --- State transitions ---
    //------------------------

    /// `Ready → Pending` once the task was handed to the executor.
    pub fn mark_pending(&mut self, key: TaskKey) -> bool {
        self.transition(key, TaskState::Ready, TaskState::Pending)
    }

    /// `Pending → Completed`; children whose parents are now all complete become `Ready`.
    pub fn mark_completed(&mut self, key: TaskKey) -> bool {
        if !self.transition(key, TaskState::Pending, TaskState::Completed) {
            return false;
        }

        let children: Vec<TaskKey> = self.nodes[key].children.iter().copied().collect();
        for child in children {
            let all_parents_done = self.nodes[child].parents.iter().all(|parent| self.nodes[*parent].state == TaskState::Completed);
            if all_parents_done && self.nodes[child].state == TaskState::NotReady {
                self.nodes[child].state = TaskState::Ready;
            }
        }
        true
    }

    /// `Pending → Failed`. Failed tasks are never retried.
    pub fn mark_failed(&mut self, key: TaskKey) -> bool {
        self.transition(key, TaskState::Pending, TaskState::Failed)
    }

    fn transition(&mut self, key: TaskKey, from: TaskState, to: TaskState) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) if node.state == from => {
                node.state = to;
                true
            }
            Some(node) => {
                log::warn!("Task {} cannot move from {:?} to {:?}, it is {:?}.", node.task.id, from, to, node.state);
                false
            }
            None => false,
        }
    }
}
