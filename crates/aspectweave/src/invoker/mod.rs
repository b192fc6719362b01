//! Synchronous invocation of the external weaver.
//!
//! The [`WeaveInvoker`] trait is the seam between orchestration and the real
//! tool. [`AjcInvoker`] spawns the weaver as a child process; tests supply
//! doubles returning canned message lists.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::arguments::WeaveArguments;
use crate::message::WeaveMessage;

mod process;

pub use self::process::AjcInvoker;

/// Runs the weaver once with a prepared argument vector.
#[cfg_attr(test, mockall::automock)]
pub trait WeaveInvoker {
    /// Runs the weaver to completion and returns its messages in order.
    ///
    /// Blocks until the weaver exits. There is no timeout.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] when the weaver cannot be started.
    /// Diagnostics reported by a weaver that did run are returned as
    /// messages, not errors.
    fn invoke(&self, arguments: WeaveArguments) -> Result<Vec<WeaveMessage>, InvokeError>;
}

/// Invocation-level failures of the weaver.
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    /// The weaver executable could not be started.
    #[error("failed to start weaver '{program}': {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

#[cfg(test)]
mod tests;
