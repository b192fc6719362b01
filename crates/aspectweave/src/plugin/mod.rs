//! Wiring of the weaving tasks into the host task graph.
//!
//! [`AspectWeavePlugin::apply`] registers three tasks: one declaring the
//! runtime dependency, one attaching a weave hook to every compile task, and
//! one verifying the runtime. [`AspectWeavePlugin::after_evaluate`] adds the
//! ordering edges once the host project is fully configured, and only for
//! projects carrying an Android marker. Per-variant tasks restrict the hooks
//! to compile tasks whose name mentions the variant.
//!
//! Every step reports through explicit results; [`WeavePipeline::run_hook`]
//! is the single place deciding whether a weave problem fails the task.

use std::error::Error;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::arguments::{ArgumentError, LanguageLevel, WeaveArguments};
use crate::graph::{GraphError, TaskAction, TaskContext, TaskError, TaskGraph};
use crate::invoker::{InvokeError, WeaveInvoker};
use crate::paths::{Environment, PathResolver};
use crate::project::{CompilationUnit, IMPLEMENTATION_CONFIGURATION, Project};
use crate::triage::{DiagnosticChannels, InvocationOutcome, Verdict, triage};
use crate::verify::{ClassProbe, runtime_dependency, verify};

const PLUGIN_TARGET: &str = "aspectweave::plugin";

/// Task declaring the runtime dependency.
pub const CONFIGURE_TASK: &str = "aspectJConfigure";
/// Task attaching weave hooks to every compile task.
pub const WEAVE_TASK: &str = "aspectJWeaving";
/// Task verifying the runtime preconditions.
pub const VERIFY_TASK: &str = "aspectJSetupVerify";
/// Host task that runs before any compilation.
pub const PRE_BUILD_TASK: &str = "preBuild";
/// Prefix of the per-variant task names.
pub const VARIANT_TASK_PREFIX: &str = "configureAspectJFor";

/// Name of the task configuring weaving for `variant`, e.g.
/// `configureAspectJForDebug`.
#[must_use]
pub fn variant_task_name(variant: &str) -> String {
    let mut characters = variant.chars();
    let mut name = String::from(VARIANT_TASK_PREFIX);
    if let Some(first) = characters.next() {
        name.extend(first.to_uppercase());
        name.push_str(characters.as_str());
    }
    name
}

/// Whether a compile task belongs to `variant`: the task name contains the
/// variant, ignoring case.
#[must_use]
pub fn matches_variant(task: &str, variant: &str) -> bool {
    task.to_lowercase().contains(&variant.to_lowercase())
}

/// Errors raised while wiring the plugin into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// The host graph rejected a registration or edge.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Variant names must not be empty.
    #[error("variant name must not be empty")]
    EmptyVariant,
}

/// Problems weaving one compilation unit.
#[derive(Debug, Clone, Error)]
pub enum WeaveError {
    /// The argument vector could not be built.
    #[error("cannot build weave arguments: {0}")]
    Arguments(#[from] ArgumentError),
    /// The weaver could not be run.
    #[error("cannot run the weaver: {0}")]
    Invoke(#[from] InvokeError),
}

/// Settings shared by every weave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaveSettings {
    language_level: LanguageLevel,
    fail_on_fatal: bool,
}

impl WeaveSettings {
    /// Creates settings. With `fail_on_fatal` unset, fatal diagnostics and
    /// invocation failures are logged and the task still completes.
    #[must_use]
    pub const fn new(language_level: LanguageLevel, fail_on_fatal: bool) -> Self {
        Self {
            language_level,
            fail_on_fatal,
        }
    }

    /// Language level passed to the weaver.
    #[must_use]
    pub const fn language_level(&self) -> &LanguageLevel {
        &self.language_level
    }

    /// Whether weave problems fail the owning task.
    #[must_use]
    pub const fn fail_on_fatal(&self) -> bool {
        self.fail_on_fatal
    }
}

/// Resolve, build, invoke and triage for one compilation unit.
pub struct WeavePipeline {
    resolver: PathResolver<Box<dyn Environment>>,
    invoker: Box<dyn WeaveInvoker>,
    channels: Box<dyn DiagnosticChannels>,
    settings: WeaveSettings,
}

impl WeavePipeline {
    /// Assembles a pipeline from its services.
    #[must_use]
    pub fn new(
        resolver: PathResolver<Box<dyn Environment>>,
        invoker: Box<dyn WeaveInvoker>,
        channels: Box<dyn DiagnosticChannels>,
        settings: WeaveSettings,
    ) -> Self {
        Self {
            resolver,
            invoker,
            channels,
            settings,
        }
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &WeaveSettings {
        &self.settings
    }

    /// Resolves paths and builds the arguments for `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the unit has no output directory.
    pub fn arguments_for(
        &self,
        project: &Project,
        unit: &CompilationUnit,
    ) -> Result<WeaveArguments, ArgumentError> {
        let paths = self.resolver.resolve(project, unit);
        WeaveArguments::build(&paths, self.settings.language_level())
    }

    /// Weaves `unit` and returns the weaver's messages.
    ///
    /// # Errors
    ///
    /// Returns a [`WeaveError`] when arguments cannot be built or the weaver
    /// cannot be run.
    pub fn weave_unit(
        &self,
        project: &Project,
        unit: &CompilationUnit,
    ) -> Result<InvocationOutcome, WeaveError> {
        let arguments = self.arguments_for(project, unit)?;
        info!(
            target: PLUGIN_TARGET,
            unit = unit.name(),
            arguments = %arguments,
            "weaving compiled classes"
        );
        let messages = self.invoker.invoke(arguments)?;
        Ok(InvocationOutcome::new(messages))
    }

    /// Weaves `unit` on behalf of `task` and decides the task's fate.
    ///
    /// Diagnostics are routed to the channels. Fatal diagnostics and
    /// invocation failures only fail the task when
    /// [`WeaveSettings::fail_on_fatal`] is set.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskError`] for escalated weave problems.
    pub fn run_hook(
        &self,
        task: &str,
        project: &Project,
        unit: &CompilationUnit,
    ) -> Result<(), TaskError> {
        let escalate = self.settings.fail_on_fatal();
        match self.weave_unit(project, unit) {
            Ok(outcome) => {
                let verdict = triage(unit.name(), &outcome, self.channels.as_ref());
                if verdict == Verdict::Failure {
                    error!(
                        target: PLUGIN_TARGET,
                        unit = unit.name(),
                        fatal = outcome.fatal_count(),
                        "weaving reported fatal diagnostics"
                    );
                    if escalate {
                        return Err(TaskError::FatalDiagnostics {
                            unit: unit.name().to_owned(),
                            count: outcome.fatal_count(),
                        });
                    }
                } else {
                    info!(target: PLUGIN_TARGET, unit = unit.name(), ?verdict, "weaving finished");
                }
                Ok(())
            }
            Err(failure) => {
                error!(
                    target: PLUGIN_TARGET,
                    unit = unit.name(),
                    error = %error_chain(&failure),
                    "weaving failed"
                );
                if escalate {
                    Err(TaskError::action(task, failure))
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn error_chain(failure: &(dyn Error + 'static)) -> String {
    let mut rendered = failure.to_string();
    let mut source = failure.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Result of [`AspectWeavePlugin::after_evaluate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiringReport {
    edges: usize,
    warnings: Vec<String>,
}

impl WiringReport {
    /// Number of dependency edges added.
    #[must_use]
    pub const fn edges(&self) -> usize {
        self.edges
    }

    /// Warnings emitted while wiring.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Registers and wires the weaving tasks.
#[derive(Clone)]
pub struct AspectWeavePlugin {
    pipeline: Rc<WeavePipeline>,
    probe: Rc<dyn ClassProbe>,
}

impl AspectWeavePlugin {
    /// Creates the plugin from its weave pipeline and runtime probe.
    #[must_use]
    pub fn new(pipeline: WeavePipeline, probe: impl ClassProbe + 'static) -> Self {
        Self {
            pipeline: Rc::new(pipeline),
            probe: Rc::new(probe),
        }
    }

    /// The pipeline shared by all weave hooks.
    #[must_use]
    pub fn pipeline(&self) -> &WeavePipeline {
        &self.pipeline
    }

    /// Registers the configure, weave and verify tasks.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Graph`] when a task name is already taken.
    pub fn apply(&self, graph: &mut TaskGraph) -> Result<(), PluginError> {
        graph.register(CONFIGURE_TASK, ConfigureAction)?;
        graph.register(
            WEAVE_TASK,
            WeaveAction {
                pipeline: Rc::clone(&self.pipeline),
                variant: None,
            },
        )?;
        graph.register(
            VERIFY_TASK,
            VerifyAction {
                probe: Rc::clone(&self.probe),
            },
        )?;
        info!(target: PLUGIN_TARGET, "registered aspectj tasks");
        Ok(())
    }

    /// Adds ordering edges once the project is evaluated.
    ///
    /// Without an Android marker, or when the `androidComponents` extension
    /// is missing, nothing is wired and a single warning is reported.
    /// Otherwise `preBuild` depends on the configure task and every compile
    /// task depends on the weave task.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Graph`] when an edge names a task that is not
    /// registered.
    pub fn after_evaluate(
        &self,
        project: &Project,
        graph: &mut TaskGraph,
    ) -> Result<WiringReport, PluginError> {
        let mut report = WiringReport::default();
        if !project.has_android_marker() {
            let warning = format!(
                "aspectj plugin applied to '{}' without 'com.android.application' or \
                 'com.android.library'; weaving is not wired",
                project.name()
            );
            warn!(target: PLUGIN_TARGET, project = project.name(), "{warning}");
            report.warnings.push(warning);
            return Ok(report);
        }
        if let Err(missing) = project.android_components() {
            let warning = format!(
                "{missing}; the Android plugin version may be unsupported and weaving \
                 is not wired"
            );
            warn!(target: PLUGIN_TARGET, project = project.name(), "{warning}");
            report.warnings.push(warning);
            return Ok(report);
        }

        if graph.contains(PRE_BUILD_TASK) {
            if graph.depends_on(PRE_BUILD_TASK, CONFIGURE_TASK)? {
                report.edges += 1;
            }
        } else {
            let warning = format!("host task '{PRE_BUILD_TASK}' not found; configure is not wired");
            warn!(target: PLUGIN_TARGET, project = project.name(), "{warning}");
            report.warnings.push(warning);
        }

        let compile_tasks: Vec<String> = graph
            .compile_tasks()
            .map(|node| node.name().to_owned())
            .collect();
        for task in compile_tasks {
            if graph.depends_on(&task, WEAVE_TASK)? {
                report.edges += 1;
                info!(target: PLUGIN_TARGET, task = %task, "compile task depends on weaving");
            }
        }
        Ok(report)
    }

    /// Registers `configureAspectJFor<Variant>`, which attaches weave hooks
    /// to the compile tasks whose name contains `variant`, ignoring case.
    ///
    /// The task only runs when requested. No dependency edges are added;
    /// matching compile tasks already in the graph are ordered after it so
    /// its hooks attach before they run. Returns the task name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyVariant`] for an empty name and
    /// [`PluginError::Graph`] when the task already exists.
    pub fn configure_for_variant(
        &self,
        graph: &mut TaskGraph,
        variant: &str,
    ) -> Result<String, PluginError> {
        if variant.is_empty() {
            return Err(PluginError::EmptyVariant);
        }
        let name = variant_task_name(variant);
        graph.register(
            name.clone(),
            WeaveAction {
                pipeline: Rc::clone(&self.pipeline),
                variant: Some(variant.to_owned()),
            },
        )?;
        let matching: Vec<String> = graph
            .compile_tasks()
            .map(|node| node.name().to_owned())
            .filter(|task| matches_variant(task, variant))
            .collect();
        for task in matching {
            graph.must_run_after(&task, &name)?;
        }
        info!(target: PLUGIN_TARGET, task = %name, variant, "registered variant task");
        Ok(name)
    }
}

/// Declares the runtime dependency on Android projects.
struct ConfigureAction;

impl TaskAction for ConfigureAction {
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let project = context.project_mut();
        if !project.has_android_marker() {
            warn!(
                target: PLUGIN_TARGET,
                project = project.name(),
                "android plugin not applied; skipping aspectj configuration"
            );
            return Ok(());
        }
        let dependency = runtime_dependency();
        let coordinate = dependency.to_string();
        if project.add_dependency(IMPLEMENTATION_CONFIGURATION, dependency) {
            info!(target: PLUGIN_TARGET, dependency = %coordinate, "declared aspectj runtime");
        } else {
            info!(target: PLUGIN_TARGET, dependency = %coordinate, "aspectj runtime already declared");
        }
        Ok(())
    }
}

/// Key under which a compile task carries its weave hook.
const WEAVE_HOOK: &str = "aspectj-weave";

/// Attaches [`WeaveHook`]s to compile tasks, optionally only those of one
/// variant. A compile task is woven at most once per run.
struct WeaveAction {
    pipeline: Rc<WeavePipeline>,
    variant: Option<String>,
}

impl TaskAction for WeaveAction {
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let mut attached = 0_usize;
        for unit in context.compile_units() {
            if self
                .variant
                .as_deref()
                .is_some_and(|variant| !matches_variant(unit.name(), variant))
            {
                continue;
            }
            let hook = WeaveHook {
                pipeline: Rc::clone(&self.pipeline),
            };
            match context.do_last_once(unit.name(), WEAVE_HOOK, hook) {
                Ok(true) => attached += 1,
                Ok(false) => debug!(
                    target: PLUGIN_TARGET,
                    task = unit.name(),
                    "weave hook already attached"
                ),
                Err(failure) => warn!(
                    target: PLUGIN_TARGET,
                    task = unit.name(),
                    error = %failure,
                    "cannot attach weave hook"
                ),
            }
        }
        info!(
            target: PLUGIN_TARGET,
            task = context.task(),
            variant = self.variant.as_deref().unwrap_or("*"),
            attached,
            "attached weave hooks"
        );
        Ok(())
    }
}

/// Weaves the unit of the compile task it is attached to.
struct WeaveHook {
    pipeline: Rc<WeavePipeline>,
}

impl TaskAction for WeaveHook {
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let unit = context.unit().ok_or_else(|| TaskError::NotCompileTask {
            task: context.task().to_owned(),
        })?;
        self.pipeline.run_hook(context.task(), context.project(), unit)
    }
}

/// Runs the runtime checks.
struct VerifyAction {
    probe: Rc<dyn ClassProbe>,
}

impl TaskAction for VerifyAction {
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let report = verify(context.project(), self.probe.as_ref())
            .map_err(|failure| TaskError::action(context.task(), failure))?;
        info!(target: PLUGIN_TARGET, %report, "verified aspectj setup");
        Ok(())
    }
}
