//! CLI argument definitions for the `aspectweave` binary.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Default manifest looked up in the working directory.
pub(crate) const DEFAULT_MANIFEST: &str = "aspectweave.toml";

/// Command-line interface for the `aspectweave` build runner.
#[derive(Parser, Debug)]
#[command(name = "aspectweave", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Project manifest describing the host build.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_MANIFEST)]
    pub(crate) manifest: Utf8PathBuf,
    /// Action to perform on the wired build.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Actions available once the build is wired.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Executes tasks and their dependencies.
    ///
    /// Without task names every compile task runs. The runtime verification
    /// task `aspectJSetupVerify` and variant tasks run only when named.
    Run {
        /// Tasks to execute.
        #[arg(value_name = "TASK")]
        tasks: Vec<String>,
    },
    /// Lists the registered tasks with their dependencies.
    Tasks,
    /// Prints the weaver arguments resolved for one compilation unit.
    Args {
        /// Compile task naming the unit.
        #[arg(value_name = "UNIT")]
        unit: String,
    },
}
