//! Assembles the plugin and wires it into the host build.

use aspectweave::paths::{Environment, PathResolver, ProcessEnvironment};
use aspectweave::project::Project;
use aspectweave::triage::TracingChannels;
use aspectweave::{
    AjcInvoker, AspectWeavePlugin, JavapProbe, LanguageLevel, TaskGraph, WeavePipeline,
    WeaveSettings, WiringReport,
};
use aspectweave_config::Config;
use tracing::info;

use crate::errors::AppError;
use crate::manifest::Manifest;

const SESSION_TARGET: &str = "aspectweave_cli::session";

/// A host build with the weaving tasks wired in, ready to freeze.
pub(crate) struct Session {
    pub(crate) project: Project,
    pub(crate) graph: TaskGraph,
    pub(crate) plugin: AspectWeavePlugin,
    pub(crate) wiring: WiringReport,
}

impl Session {
    /// Registers the host tasks, applies the plugin, evaluates the project
    /// and configures each declared variant.
    pub(crate) fn prepare(config: &Config, manifest: &Manifest) -> Result<Self, AppError> {
        let project = manifest.project()?;
        let mut graph = manifest.host_graph()?;
        let plugin = build_plugin(config)?;
        plugin.apply(&mut graph)?;
        let wiring = plugin.after_evaluate(&project, &mut graph)?;
        for variant in manifest.variants() {
            plugin.configure_for_variant(&mut graph, variant)?;
        }
        info!(
            target: SESSION_TARGET,
            project = project.name(),
            tasks = graph.len(),
            edges = wiring.edges(),
            warnings = wiring.warnings().len(),
            "build wired"
        );
        Ok(Self {
            project,
            graph,
            plugin,
            wiring,
        })
    }
}

/// Builds the plugin from the process environment and configuration.
pub(crate) fn build_plugin(config: &Config) -> Result<AspectWeavePlugin, AppError> {
    let language_level = config
        .language_level()
        .parse::<LanguageLevel>()
        .map_err(AppError::LanguageLevel)?;
    let invoker = AjcInvoker::from_command_line(config.weaver_program())
        .ok_or(AppError::EmptyWeaverProgram)?;
    let environment: Box<dyn Environment> = Box::new(ProcessEnvironment);
    let pipeline = WeavePipeline::new(
        PathResolver::new(environment, config.boot_classpath_env()),
        Box::new(invoker),
        Box::new(TracingChannels),
        WeaveSettings::new(language_level, config.fail_on_fatal()),
    );
    let probe = JavapProbe::new(
        config.probe_program(),
        config.probe_classpath().map(str::to_owned),
    );
    Ok(AspectWeavePlugin::new(pipeline, probe))
}
