//! CLI entrypoint for the `aspectweave` build runner.
//!
//! The binary delegates to [`aspectweave_cli::run`], which loads
//! configuration, reads the project manifest, wires the weaving tasks and
//! executes the requested tasks.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    aspectweave_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
