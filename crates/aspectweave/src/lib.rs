//! Bytecode weaving orchestration for host build pipelines.
//!
//! The `aspectweave` crate wires an external aspect weaver (`ajc`) into a
//! host build's task graph. It does not weave anything itself: it assembles
//! the weaver's command line per compilation unit, runs it synchronously and
//! triages the diagnostics it reports into fatal and informational outcomes.
//!
//! # Architecture
//!
//! Data flows leaf first for every compilation unit:
//!
//! 1. [`paths::PathResolver`] gathers the output directory, aspect path,
//!    classpath and platform bootclasspath.
//! 2. [`arguments::WeaveArguments`] orders them into the weaver's argument
//!    vector.
//! 3. A [`invoker::WeaveInvoker`] runs the weaver and returns its messages.
//! 4. [`triage::triage`] routes each message to a diagnostic channel.
//!
//! [`plugin::AspectWeavePlugin`] registers the `aspectJConfigure`,
//! `aspectJWeaving` and `aspectJSetupVerify` tasks in a [`graph::TaskGraph`],
//! attaches the per-unit pipeline as post-compile hooks and adds ordering
//! edges once the [`project::Project`] is evaluated. [`verify`] checks the
//! runtime independently and only reports.
//!
//! # Example
//!
//! ```rust,no_run
//! use aspectweave::graph::TaskGraph;
//! use aspectweave::invoker::AjcInvoker;
//! use aspectweave::paths::{Environment, PathResolver, ProcessEnvironment};
//! use aspectweave::plugin::{AspectWeavePlugin, WeavePipeline, WeaveSettings};
//! use aspectweave::project::Project;
//! use aspectweave::triage::TracingChannels;
//! use aspectweave::verify::JavapProbe;
//!
//! let environment: Box<dyn Environment> = Box::new(ProcessEnvironment);
//! let pipeline = WeavePipeline::new(
//!     PathResolver::new(environment, "ASPECTWEAVE_BOOT_CLASSPATH"),
//!     Box::new(AjcInvoker::new("ajc")),
//!     Box::new(TracingChannels),
//!     WeaveSettings::new("11".parse().expect("valid level"), false),
//! );
//! let plugin = AspectWeavePlugin::new(pipeline, JavapProbe::new("javap", None));
//!
//! let mut graph = TaskGraph::new();
//! plugin.apply(&mut graph).expect("tasks register");
//! let report = plugin
//!     .after_evaluate(&Project::new("app"), &mut graph)
//!     .expect("wiring succeeds");
//! assert_eq!(report.edges(), 0);
//! ```

pub mod arguments;
pub mod graph;
pub mod invoker;
pub mod message;
pub mod paths;
pub mod plugin;
pub mod project;
pub mod triage;
pub mod verify;

#[cfg(test)]
mod tests;

pub use self::arguments::{ArgumentError, LanguageLevel, WeaveArguments};
pub use self::graph::{
    BuildReport, ExecutionPlan, GraphError, TaskAction, TaskContext, TaskError, TaskGraph,
    TaskState,
};
pub use self::invoker::{AjcInvoker, InvokeError, WeaveInvoker};
pub use self::message::{WeaveCause, WeaveMessage, WeaveSeverity};
pub use self::paths::{Environment, PathResolver, ProcessEnvironment, ResolvedPaths};
pub use self::plugin::{
    AspectWeavePlugin, PluginError, WeaveError, WeavePipeline, WeaveSettings, WiringReport,
};
pub use self::project::{CompilationUnit, Dependency, Extension, Project};
pub use self::triage::{DiagnosticChannels, InvocationOutcome, TracingChannels, Verdict};
pub use self::verify::{ClassProbe, JavapProbe, ProbeError, VerificationReport};
