//! Host task graph: registration, ordering edges and execution.
//!
//! A [`TaskGraph`] is append-only while the build is being configured. Tasks
//! are identified by name and declare the tasks they depend on. Once setup is
//! finished the graph is consumed by [`TaskGraph::freeze`], which yields an
//! [`ExecutionPlan`] whose structure can no longer change. Actions running in
//! the plan may still attach post-task hooks to tasks that have not started,
//! mirroring how build hosts let one task configure another's `doLast`
//! actions.
//!
//! Execution is single-threaded. Tasks run one at a time in dependency order;
//! ties are broken by registration order so runs are deterministic.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::project::{CompilationUnit, Project};

mod error;

pub use self::error::{GraphError, TaskError};

const GRAPH_TARGET: &str = "aspectweave::graph";

/// Work performed when a task runs.
///
/// Closures with the matching signature implement the trait, which keeps
/// host glue and tests terse.
pub trait TaskAction {
    /// Runs the action.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskError`] when the action fails; the owning task is then
    /// marked [`TaskState::Failed`].
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError>;
}

impl<F> TaskAction for F
where
    F: Fn(&mut TaskContext<'_>) -> Result<(), TaskError>,
{
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
        self(context)
    }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Known to the graph, not selected for execution.
    Registered,
    /// Selected for the current execution and waiting for its turn.
    Scheduled,
    /// Currently executing.
    Running,
    /// Finished without error.
    Completed,
    /// An action returned an error.
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registered => "registered",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        formatter.write_str(label)
    }
}

/// A named step with its dependencies and actions.
pub struct TaskNode {
    name: String,
    dependencies: Vec<String>,
    run_after: Vec<String>,
    unit: Option<CompilationUnit>,
    actions: Vec<Box<dyn TaskAction>>,
}

impl TaskNode {
    fn new(name: String, unit: Option<CompilationUnit>, action: Box<dyn TaskAction>) -> Self {
        Self {
            name,
            dependencies: Vec::new(),
            run_after: Vec::new(),
            unit,
            actions: vec![action],
        }
    }

    /// Task name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Names of the tasks that must complete first, in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Tasks this one is ordered after when both are scheduled. These never
    /// pull a task into a run.
    #[must_use]
    pub fn run_after(&self) -> &[String] {
        &self.run_after
    }

    /// Compilation unit produced by the task, for compile tasks.
    #[must_use]
    pub const fn unit(&self) -> Option<&CompilationUnit> {
        self.unit.as_ref()
    }

    /// Whether the task compiles a unit.
    #[must_use]
    pub const fn is_compile_task(&self) -> bool {
        self.unit.is_some()
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TaskNode")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("run_after", &self.run_after)
            .field("unit", &self.unit)
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Mutable task graph used while the build is configured.
#[derive(Debug, Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task with a single action.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateTask`] if the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        action: impl TaskAction + 'static,
    ) -> Result<(), GraphError> {
        self.insert(TaskNode::new(name.into(), None, Box::new(action)))
    }

    /// Registers the compile task producing `unit`, named after the unit.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateTask`] if the name is taken.
    pub fn register_compile(
        &mut self,
        unit: CompilationUnit,
        action: impl TaskAction + 'static,
    ) -> Result<(), GraphError> {
        let name = unit.name().to_owned();
        self.insert(TaskNode::new(name, Some(unit), Box::new(action)))
    }

    fn insert(&mut self, node: TaskNode) -> Result<(), GraphError> {
        if self.index.contains_key(node.name()) {
            return Err(GraphError::DuplicateTask {
                name: node.name().to_owned(),
            });
        }
        debug!(target: GRAPH_TARGET, task = node.name(), "registered task");
        self.index.insert(node.name().to_owned(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Declares that `task` depends on `dependency`.
    ///
    /// Returns `false` when the edge was already declared.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTask`] when either task is missing and
    /// [`GraphError::SelfDependency`] when both names are equal.
    pub fn depends_on(&mut self, task: &str, dependency: &str) -> Result<bool, GraphError> {
        if task == dependency {
            return Err(GraphError::SelfDependency {
                name: task.to_owned(),
            });
        }
        if !self.contains(dependency) {
            return Err(GraphError::unknown_task(dependency));
        }
        let node = self
            .index
            .get(task)
            .and_then(|position| self.nodes.get_mut(*position))
            .ok_or_else(|| GraphError::unknown_task(task))?;
        if node.dependencies.iter().any(|existing| existing == dependency) {
            return Ok(false);
        }
        node.dependencies.push(dependency.to_owned());
        debug!(target: GRAPH_TARGET, task, dependency, "declared task dependency");
        Ok(true)
    }

    /// Orders `task` after `predecessor` whenever both are scheduled, without
    /// making `predecessor` a dependency.
    ///
    /// Returns `false` when the ordering was already declared.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTask`] when either task is missing and
    /// [`GraphError::SelfDependency`] when both names are equal.
    pub fn must_run_after(&mut self, task: &str, predecessor: &str) -> Result<bool, GraphError> {
        if task == predecessor {
            return Err(GraphError::SelfDependency {
                name: task.to_owned(),
            });
        }
        if !self.contains(predecessor) {
            return Err(GraphError::unknown_task(predecessor));
        }
        let node = self
            .index
            .get(task)
            .and_then(|position| self.nodes.get_mut(*position))
            .ok_or_else(|| GraphError::unknown_task(task))?;
        if node.run_after.iter().any(|existing| existing == predecessor) {
            return Ok(false);
        }
        node.run_after.push(predecessor.to_owned());
        debug!(target: GRAPH_TARGET, task, predecessor, "declared task ordering");
        Ok(true)
    }

    /// Whether a task with the name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Looks up a task by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TaskNode> {
        self.index
            .get(name)
            .and_then(|position| self.nodes.get(*position))
    }

    /// All tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter()
    }

    /// Compile tasks in registration order.
    pub fn compile_tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().filter(|node| node.is_compile_task())
    }

    /// Total number of declared dependency edges. Orderings declared with
    /// [`TaskGraph::must_run_after`] are not counted.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.dependencies.len()).sum()
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when no tasks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ends configuration and produces the execution plan.
    #[must_use]
    pub fn freeze(self) -> ExecutionPlan {
        ExecutionPlan::new(self)
    }
}

/// Hooks attached at execution time, keyed by task position.
#[derive(Default)]
struct HookQueue {
    pending: HashMap<usize, Vec<Box<dyn TaskAction>>>,
    keys: HashSet<(usize, String)>,
    started: HashSet<usize>,
}

/// Handle passed to a running action.
pub struct TaskContext<'a> {
    task: &'a str,
    unit: Option<&'a CompilationUnit>,
    project: &'a mut Project,
    compile_units: &'a [CompilationUnit],
    index: &'a HashMap<String, usize>,
    hooks: &'a mut HookQueue,
}

impl<'a> TaskContext<'a> {
    /// Name of the running task.
    #[must_use]
    pub const fn task(&self) -> &'a str {
        self.task
    }

    /// Compilation unit of the running task, for compile tasks and their
    /// hooks.
    #[must_use]
    pub const fn unit(&self) -> Option<&'a CompilationUnit> {
        self.unit
    }

    /// Units of every compile task in the graph, in registration order.
    #[must_use]
    pub const fn compile_units(&self) -> &'a [CompilationUnit] {
        self.compile_units
    }

    /// The project being built.
    #[must_use]
    pub const fn project(&self) -> &Project {
        self.project
    }

    /// Mutable access to the project, e.g. to declare dependencies.
    #[must_use]
    pub const fn project_mut(&mut self) -> &mut Project {
        self.project
    }

    /// Appends an action that runs after the named task's own actions.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] when the task does not exist and
    /// [`TaskError::AlreadyExecuted`] when it has already started.
    pub fn do_last(
        &mut self,
        task: &str,
        action: impl TaskAction + 'static,
    ) -> Result<(), TaskError> {
        let position = self.pending_position(task)?;
        self.hooks
            .pending
            .entry(position)
            .or_default()
            .push(Box::new(action));
        Ok(())
    }

    /// Like [`TaskContext::do_last`], but attaches at most one action per
    /// `key` to the task in a run.
    ///
    /// Returns `false` when an action with the same key is already attached.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] when the task does not exist and
    /// [`TaskError::AlreadyExecuted`] when it has already started.
    pub fn do_last_once(
        &mut self,
        task: &str,
        key: &str,
        action: impl TaskAction + 'static,
    ) -> Result<bool, TaskError> {
        let position = self.pending_position(task)?;
        if !self.hooks.keys.insert((position, key.to_owned())) {
            return Ok(false);
        }
        self.hooks
            .pending
            .entry(position)
            .or_default()
            .push(Box::new(action));
        Ok(true)
    }

    fn pending_position(&self, task: &str) -> Result<usize, TaskError> {
        let position = *self
            .index
            .get(task)
            .ok_or_else(|| TaskError::UnknownTask {
                task: task.to_owned(),
            })?;
        if self.hooks.started.contains(&position) {
            return Err(TaskError::AlreadyExecuted {
                task: task.to_owned(),
            });
        }
        Ok(position)
    }
}

/// Final state of one task in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    name: String,
    state: TaskState,
}

impl TaskOutcome {
    /// Task name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// State the task ended the run in.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }
}

/// Summary of one [`ExecutionPlan::execute`] call.
#[derive(Debug)]
pub struct BuildReport {
    outcomes: Vec<TaskOutcome>,
    failure: Option<TaskError>,
}

impl BuildReport {
    /// Outcomes in execution order; tasks after a failure stay scheduled.
    #[must_use]
    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    /// State of the named task in this run.
    #[must_use]
    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.name == name)
            .map(TaskOutcome::state)
    }

    /// The error that stopped the run, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&TaskError> {
        self.failure.as_ref()
    }

    /// Whether every scheduled task completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Frozen graph ready for execution.
pub struct ExecutionPlan {
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
    compile_units: Vec<CompilationUnit>,
    states: Vec<TaskState>,
    hooks: HookQueue,
}

impl ExecutionPlan {
    fn new(graph: TaskGraph) -> Self {
        let compile_units = graph
            .nodes
            .iter()
            .filter_map(|node| node.unit.clone())
            .collect();
        let states = vec![TaskState::Registered; graph.nodes.len()];
        Self {
            nodes: graph.nodes,
            index: graph.index,
            compile_units,
            states,
            hooks: HookQueue::default(),
        }
    }

    /// Current state of a task.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<TaskState> {
        self.index
            .get(name)
            .and_then(|position| self.states.get(*position))
            .copied()
    }

    /// Names of all tasks, in registration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(TaskNode::name)
    }

    /// Orders the requested tasks and their pending dependencies.
    ///
    /// Tasks that already completed in an earlier run are not scheduled
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTask`] for an unknown target and
    /// [`GraphError::Cycle`] when the selection cannot be ordered.
    pub fn schedule(&self, targets: &[&str]) -> Result<Vec<String>, GraphError> {
        let order = self.order(targets)?;
        Ok(order
            .into_iter()
            .filter_map(|position| self.nodes.get(position))
            .map(|node| node.name.clone())
            .collect())
    }

    fn order(&self, targets: &[&str]) -> Result<Vec<usize>, GraphError> {
        let selected = self.closure(targets)?;

        let mut remaining: HashMap<usize, usize> = HashMap::new();
        let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();
        for &position in &selected {
            let dependencies = self.selected_dependencies(position, &selected);
            remaining.insert(position, dependencies.len());
            for dependency in dependencies {
                dependents.entry(dependency).or_default().push(position);
            }
        }

        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(position, _)| *position)
            .collect();
        let mut order = Vec::with_capacity(selected.len());
        while let Some(position) = ready.pop_first() {
            order.push(position);
            for dependent in dependents.get(&position).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() < selected.len() {
            let ordered: HashSet<usize> = order.iter().copied().collect();
            let tasks = selected
                .iter()
                .filter(|position| !ordered.contains(position))
                .filter_map(|position| self.nodes.get(*position))
                .map(|node| node.name.clone())
                .collect();
            return Err(GraphError::Cycle { tasks });
        }
        Ok(order)
    }

    fn closure(&self, targets: &[&str]) -> Result<BTreeSet<usize>, GraphError> {
        let mut selected = BTreeSet::new();
        let mut stack = Vec::new();
        for target in targets {
            let position = *self
                .index
                .get(*target)
                .ok_or_else(|| GraphError::unknown_task(*target))?;
            stack.push(position);
        }
        while let Some(position) = stack.pop() {
            if self.states.get(position) == Some(&TaskState::Completed)
                || !selected.insert(position)
            {
                continue;
            }
            let Some(node) = self.nodes.get(position) else {
                continue;
            };
            stack.extend(
                node.dependencies
                    .iter()
                    .filter_map(|dependency| self.index.get(dependency).copied()),
            );
        }
        Ok(selected)
    }

    /// Scheduled predecessors of a task: its dependencies and orderings.
    fn selected_dependencies(&self, position: usize, selected: &BTreeSet<usize>) -> Vec<usize> {
        let mut predecessors: Vec<usize> = self
            .nodes
            .get(position)
            .map(|node| {
                node.dependencies
                    .iter()
                    .chain(&node.run_after)
                    .filter_map(|dependency| self.index.get(dependency).copied())
                    .filter(|dependency| selected.contains(dependency))
                    .collect()
            })
            .unwrap_or_default();
        predecessors.sort_unstable();
        predecessors.dedup();
        predecessors
    }

    /// Runs the requested tasks and everything they depend on.
    ///
    /// Execution stops at the first failing task; tasks after it remain
    /// [`TaskState::Scheduled`] and the error is carried in the report.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] when the selection cannot be scheduled. Task
    /// failures are reported through [`BuildReport::failure`] instead.
    pub fn execute(
        &mut self,
        targets: &[&str],
        project: &mut Project,
    ) -> Result<BuildReport, GraphError> {
        let order = self.order(targets)?;
        for position in &order {
            if let Some(state) = self.states.get_mut(*position) {
                *state = TaskState::Scheduled;
            }
        }

        let Self {
            nodes,
            index,
            compile_units,
            states,
            hooks,
        } = self;

        let mut failure = None;
        for &position in &order {
            let Some(node) = nodes.get(position) else {
                continue;
            };
            if let Some(state) = states.get_mut(position) {
                *state = TaskState::Running;
            }
            hooks.started.insert(position);
            info!(target: GRAPH_TARGET, task = node.name(), "running task");

            let mut context = TaskContext {
                task: node.name(),
                unit: node.unit(),
                project: &mut *project,
                compile_units: compile_units.as_slice(),
                index: &*index,
                hooks: &mut *hooks,
            };
            let result = run_actions(node, &mut context);

            let finished = if result.is_ok() {
                TaskState::Completed
            } else {
                TaskState::Failed
            };
            if let Some(state) = states.get_mut(position) {
                *state = finished;
            }
            if let Err(error) = result {
                warn!(target: GRAPH_TARGET, task = node.name(), %error, "task failed");
                failure = Some(error);
                break;
            }
        }

        let outcomes = order
            .iter()
            .filter_map(|position| {
                let node = nodes.get(*position)?;
                let state = *states.get(*position)?;
                Some(TaskOutcome {
                    name: node.name.clone(),
                    state,
                })
            })
            .collect();
        Ok(BuildReport { outcomes, failure })
    }
}

fn run_actions(node: &TaskNode, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
    for action in &node.actions {
        action.execute(context)?;
    }
    let position = context.index.get(node.name()).copied();
    let attached = position
        .and_then(|position| context.hooks.pending.remove(&position))
        .unwrap_or_default();
    for hook in attached {
        hook.execute(context)?;
    }
    Ok(())
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ExecutionPlan")
            .field("nodes", &self.nodes)
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}
