//! Error types for task registration and execution.

use std::error::Error;

use thiserror::Error;

/// Errors raised while building or scheduling the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A task with the same name is already registered.
    #[error("task '{name}' is already registered")]
    DuplicateTask {
        /// Name that was registered twice.
        name: String,
    },

    /// The named task does not exist.
    #[error("task '{name}' not found")]
    UnknownTask {
        /// Name that was looked up.
        name: String,
    },

    /// A task was declared to depend on itself.
    #[error("task '{name}' cannot depend on itself")]
    SelfDependency {
        /// Offending task name.
        name: String,
    },

    /// The requested tasks form a dependency cycle.
    #[error("dependency cycle between tasks: {}", tasks.join(", "))]
    Cycle {
        /// Tasks that could not be ordered.
        tasks: Vec<String>,
    },
}

impl GraphError {
    /// Creates a new `UnknownTask` error.
    #[must_use]
    pub fn unknown_task(name: impl Into<String>) -> Self {
        Self::UnknownTask { name: name.into() }
    }
}

/// Errors raised by task actions while a task runs.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A hook was attached to a task that does not exist.
    #[error("cannot attach an action to unknown task '{task}'")]
    UnknownTask {
        /// Task the hook was meant for.
        task: String,
    },

    /// A hook was attached to a task that has already started.
    #[error("cannot attach an action to task '{task}' after it has started")]
    AlreadyExecuted {
        /// Task the hook was meant for.
        task: String,
    },

    /// An action that needs a compilation unit ran on another kind of task.
    #[error("task '{task}' has no compilation unit")]
    NotCompileTask {
        /// Task the action ran on.
        task: String,
    },

    /// The weaver reported fatal diagnostics and escalation is enabled.
    #[error("weaving '{unit}' reported {count} fatal diagnostic(s)")]
    FatalDiagnostics {
        /// Compilation unit that was woven.
        unit: String,
        /// Number of fatal messages.
        count: usize,
    },

    /// An action failed with an underlying error.
    #[error("task '{task}' failed: {source}")]
    Action {
        /// Task whose action failed.
        task: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync + 'static>,
    },
}

impl TaskError {
    /// Wraps an underlying error as an action failure of `task`.
    #[must_use]
    pub fn action(task: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self::Action {
            task: task.into(),
            source: Box::new(source),
        }
    }
}
