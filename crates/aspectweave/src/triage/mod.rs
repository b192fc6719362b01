//! Classification of weaver messages into build outcomes.
//!
//! Each message is routed to the diagnostic channel matching its severity.
//! Fatal messages carry their full cause trace. Triage only reports; whether
//! a fatal outcome fails the owning task is decided by the caller.

use tracing::{debug, error, info, warn};

use crate::message::{WeaveMessage, WeaveSeverity};

const TRIAGE_TARGET: &str = "aspectweave::triage";

/// Messages produced by one weaver invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutcome {
    messages: Vec<WeaveMessage>,
}

impl InvocationOutcome {
    /// Wraps the ordered messages of one invocation.
    #[must_use]
    pub const fn new(messages: Vec<WeaveMessage>) -> Self {
        Self { messages }
    }

    /// Messages in the order the weaver reported them.
    #[must_use]
    pub fn messages(&self) -> &[WeaveMessage] {
        &self.messages
    }

    /// Whether any message is `ABORT`, `ERROR` or `FAIL`.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.messages.iter().any(WeaveMessage::is_fatal)
    }

    /// Number of fatal messages.
    #[must_use]
    pub fn fatal_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.is_fatal())
            .count()
    }

    /// Overall verdict for the invocation.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.has_fatal() {
            Verdict::Failure
        } else if self
            .messages
            .iter()
            .any(|message| message.severity() == WeaveSeverity::Warning)
        {
            Verdict::Warning
        } else {
            Verdict::Success
        }
    }
}

impl From<Vec<WeaveMessage>> for InvocationOutcome {
    fn from(messages: Vec<WeaveMessage>) -> Self {
        Self::new(messages)
    }
}

/// Summary of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No warnings and no fatal messages.
    Success,
    /// At least one warning, nothing fatal.
    Warning,
    /// At least one fatal message.
    Failure,
}

/// Sinks receiving triaged messages.
pub trait DiagnosticChannels {
    /// Receives `ABORT`, `ERROR` and `FAIL` messages.
    fn fatal(&self, unit: &str, message: &WeaveMessage);
    /// Receives `WARNING` messages.
    fn warning(&self, unit: &str, message: &WeaveMessage);
    /// Receives `INFO` messages.
    fn info(&self, unit: &str, message: &WeaveMessage);
    /// Receives `DEBUG` messages.
    fn debug(&self, unit: &str, message: &WeaveMessage);
}

/// Channels emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingChannels;

impl DiagnosticChannels for TracingChannels {
    fn fatal(&self, unit: &str, message: &WeaveMessage) {
        let cause = message.cause().map(ToString::to_string).unwrap_or_default();
        error!(
            target: TRIAGE_TARGET,
            unit,
            severity = %message.severity(),
            cause = %cause,
            "{}",
            message.text()
        );
    }

    fn warning(&self, unit: &str, message: &WeaveMessage) {
        warn!(target: TRIAGE_TARGET, unit, "{}", message.text());
    }

    fn info(&self, unit: &str, message: &WeaveMessage) {
        info!(target: TRIAGE_TARGET, unit, "{}", message.text());
    }

    fn debug(&self, unit: &str, message: &WeaveMessage) {
        debug!(target: TRIAGE_TARGET, unit, "{}", message.text());
    }
}

/// Routes every message of `outcome` to its channel and returns the verdict.
#[must_use = "the verdict decides whether the weave failed"]
pub fn triage(
    unit: &str,
    outcome: &InvocationOutcome,
    channels: &(impl DiagnosticChannels + ?Sized),
) -> Verdict {
    for message in outcome.messages() {
        match message.severity() {
            WeaveSeverity::Abort | WeaveSeverity::Error | WeaveSeverity::Fail => {
                channels.fatal(unit, message);
            }
            WeaveSeverity::Warning => channels.warning(unit, message),
            WeaveSeverity::Info => channels.info(unit, message),
            WeaveSeverity::Debug => channels.debug(unit, message),
        }
    }
    outcome.verdict()
}
