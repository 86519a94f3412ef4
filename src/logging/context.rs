use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoggingContext {
    /// Human-facing CLI run; diagnostics go to stderr.
    Interactive,
    /// CLI run producing machine-readable output; the console stays quiet
    /// unless configured otherwise.
    MachineOutput,
    /// Library embedded in a host application that owns the terminal.
    Embedded,
}

impl LoggingContext {
    /// Returns `true` when console sinks are off unless explicitly configured.
    pub fn console_off_by_default(self) -> bool {
        matches!(
            self,
            LoggingContext::MachineOutput | LoggingContext::Embedded
        )
    }
}

/// Derive the active logging context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> LoggingContext {
    if embedded_override_enabled() {
        return LoggingContext::Embedded;
    }

    if command.wants_machine_output() {
        LoggingContext::MachineOutput
    } else {
        LoggingContext::Interactive
    }
}

fn embedded_override_enabled() -> bool {
    env::var("TIERFLOW_EMBEDDED")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
