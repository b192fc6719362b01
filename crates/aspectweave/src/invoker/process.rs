//! Process-backed weaver invocation.

use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use super::{InvokeError, WeaveInvoker};
use crate::arguments::WeaveArguments;
use crate::message::{WeaveMessage, parse_output};

const INVOKER_TARGET: &str = "aspectweave::invoker";

/// Invokes an `ajc`-compatible executable.
///
/// Leading arguments are placed before the weave arguments, which allows
/// launching the weaver through `java`, e.g.
/// `java -cp aspectjtools.jar org.aspectj.tools.ajc.Main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AjcInvoker {
    program: String,
    leading: Vec<String>,
}

impl AjcInvoker {
    /// Creates an invoker running `program`, resolved through `PATH` when
    /// it is not a path.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading: Vec::new(),
        }
    }

    /// Splits a whitespace-separated command line into the program and its
    /// leading arguments. Returns `None` for a blank command line.
    #[must_use]
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program).with_leading_args(words.map(str::to_owned).collect()))
    }

    /// Sets the arguments passed before the weave arguments.
    #[must_use]
    pub fn with_leading_args(mut self, leading: Vec<String>) -> Self {
        self.leading = leading;
        self
    }

    /// Program the invoker runs.
    #[must_use]
    pub const fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Arguments passed before the weave arguments.
    #[must_use]
    pub fn leading_args(&self) -> &[String] {
        &self.leading
    }
}

impl WeaveInvoker for AjcInvoker {
    fn invoke(&self, arguments: WeaveArguments) -> Result<Vec<WeaveMessage>, InvokeError> {
        debug!(
            target: INVOKER_TARGET,
            program = %self.program,
            arguments = %arguments,
            "spawning weaver"
        );
        let output = Command::new(&self.program)
            .args(&self.leading)
            .args(arguments.into_vec())
            .output()
            .map_err(|source| InvokeError::Spawn {
                program: self.program.clone(),
                source: Arc::new(source),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let messages = parse_output(&stdout, &stderr, output.status);
        debug!(
            target: INVOKER_TARGET,
            program = %self.program,
            status = %output.status,
            messages = messages.len(),
            "weaver finished"
        );
        Ok(messages)
    }
}
