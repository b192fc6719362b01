//! Crate-level integration and BDD tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::arguments::{DESTINATION, WeaveArguments};
use crate::graph::{TaskContext, TaskError, TaskGraph, TaskState};
use crate::invoker::{InvokeError, WeaveInvoker};
use crate::message::{WeaveCause, WeaveMessage, WeaveSeverity};
use crate::paths::{Environment, PathResolver};
use crate::plugin::{AspectWeavePlugin, WeavePipeline, WeaveSettings};
use crate::project::{ANDROID_LIBRARY_PLUGIN, CompilationUnit, Project};
use crate::triage::DiagnosticChannels;
use crate::verify::{ClassProbe, ProbeError};


/// Weaver double replaying a fixed message list and recording destinations.
#[derive(Clone, Default)]
struct ScriptedInvoker {
    messages: Vec<WeaveMessage>,
    destinations: Rc<RefCell<Vec<String>>>,
}

impl WeaveInvoker for ScriptedInvoker {
    fn invoke(&self, arguments: WeaveArguments) -> Result<Vec<WeaveMessage>, InvokeError> {
        let destination = arguments.value_of(DESTINATION).unwrap_or_default();
        self.destinations.borrow_mut().push(destination.to_owned());
        Ok(self.messages.clone())
    }
}

/// Channels recording which channel saw which message.
#[derive(Clone, Default)]
struct RecordingChannels {
    events: Rc<RefCell<Vec<(&'static str, WeaveMessage)>>>,
}

impl RecordingChannels {
    fn push(&self, channel: &'static str, message: &WeaveMessage) {
        self.events.borrow_mut().push((channel, message.clone()));
    }
}

impl DiagnosticChannels for RecordingChannels {
    fn fatal(&self, _unit: &str, message: &WeaveMessage) {
        self.push("fatal", message);
    }

    fn warning(&self, _unit: &str, message: &WeaveMessage) {
        self.push("warning", message);
    }

    fn info(&self, _unit: &str, message: &WeaveMessage) {
        self.push("info", message);
    }

    fn debug(&self, _unit: &str, message: &WeaveMessage) {
        self.push("debug", message);
    }
}

struct NoEnvironment;

impl Environment for NoEnvironment {
    fn var(&self, _key: &str) -> Option<String> {
        None
    }
}

struct PresentRuntime;

impl ClassProbe for PresentRuntime {
    fn load(&self, _class: &str) -> Result<(), ProbeError> {
        Ok(())
    }
}

fn compile(_context: &mut TaskContext<'_>) -> Result<(), TaskError> {
    Ok(())
}

fn destination_of(unit: &str) -> String {
    format!("build/{unit}/classes")
}

fn host_graph(units: &[&str]) -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph
        .register(crate::plugin::PRE_BUILD_TASK, compile)
        .expect("preBuild");
    for unit in units {
        graph
            .register_compile(
                CompilationUnit::new(*unit, destination_of(unit), "libs/aspects.jar"),
                compile,
            )
            .expect("compile task");
    }
    graph
}

fn plugin(invoker: ScriptedInvoker, channels: RecordingChannels) -> AspectWeavePlugin {
    let environment: Box<dyn Environment> = Box::new(NoEnvironment);
    let pipeline = WeavePipeline::new(
        PathResolver::new(environment, "TEST_BOOT_CLASSPATH"),
        Box::new(invoker),
        Box::new(channels),
        WeaveSettings::new("1.8".parse().expect("level"), false),
    );
    AspectWeavePlugin::new(pipeline, PresentRuntime)
}

#[test]
fn full_build_weaves_every_unit_and_verifies() {
    let invoker = ScriptedInvoker {
        messages: vec![WeaveMessage::new(WeaveSeverity::Info, "woven")],
        ..ScriptedInvoker::default()
    };
    let destinations = Rc::clone(&invoker.destinations);
    let plugin = plugin(invoker, RecordingChannels::default());
    let mut graph = host_graph(&["compileDebugJavaWithJavac", "compileReleaseJavaWithJavac"]);
    plugin.apply(&mut graph).expect("apply");
    let mut project = Project::new("lib").with_android_plugin(ANDROID_LIBRARY_PLUGIN);
    plugin
        .after_evaluate(&project, &mut graph)
        .expect("after evaluate");

    let mut plan = graph.freeze();
    let report = plan
        .execute(
            &[
                "compileDebugJavaWithJavac",
                "compileReleaseJavaWithJavac",
                crate::plugin::VERIFY_TASK,
            ],
            &mut project,
        )
        .expect("execute");

    assert!(report.is_success());
    assert_eq!(
        *destinations.borrow(),
        vec![
            destination_of("compileDebugJavaWithJavac"),
            destination_of("compileReleaseJavaWithJavac"),
        ]
    );
    assert_eq!(
        plan.state(crate::plugin::CONFIGURE_TASK),
        Some(TaskState::Completed)
    );
    assert!(crate::verify::dependency_declared(&project));
}

#[test]
fn fatal_messages_keep_their_cause() {
    let cause = WeaveCause::new(vec![String::from("at Foo.bar(Foo.java:1)")]);
    let invoker = ScriptedInvoker {
        messages: vec![WeaveMessage::new(WeaveSeverity::Abort, "gave up").with_cause(cause.clone())],
        ..ScriptedInvoker::default()
    };
    let channels = RecordingChannels::default();
    let plugin = plugin(invoker, channels.clone());
    let mut graph = host_graph(&["compileJava"]);
    plugin.apply(&mut graph).expect("apply");
    let mut project = Project::new("app").with_android_plugin(ANDROID_LIBRARY_PLUGIN);
    plugin
        .after_evaluate(&project, &mut graph)
        .expect("after evaluate");
    let report = graph
        .freeze()
        .execute(&["compileJava"], &mut project)
        .expect("execute");

    assert!(report.is_success());
    let events = channels.events.borrow();
    let (channel, message) = events.first().expect("one event");
    assert_eq!(*channel, "fatal");
    assert_eq!(message.cause(), Some(&cause));
}
