use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Scheme file to parse and lint
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Emit either terminal-friendly text or machine-readable JSON
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Treat lint warnings as failures
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ExplainArgs {
    /// Scheme file to lay out
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Emit either terminal-friendly text or machine-readable JSON
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON payload suitable for downstream tooling
    Json,
}
