pub mod args;
pub mod commands;

pub use args::{CheckArgs, ExplainArgs, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
SCHEME COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "tierflow")]
#[command(version = crate::VERSION)]
#[command(about = "Inspect and validate tierflow pipeline schemes")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: check a scheme for problems, then explain its layout before wiring providers."
)]
pub struct Args {
    /// Workspace holding tierflow.toml and .tierflow/ (default: the scheme file's directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Workspace used for configuration and log files.
    pub fn workspace_root(&self) -> PathBuf {
        if let Some(workspace) = &self.workspace {
            return workspace.clone();
        }
        match self.command.scheme_file().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Parse and lint a scheme file",
        long_about = "Check reports every line that failed to parse plus structural lint findings (duplicate locations, missing entry step, tier gaps, type-chain breaks). Exits non-zero when any error is found.",
        after_help = "Example:\n    tierflow check ./arithmetic.scheme --format json"
    )]
    Check(CheckArgs),
    #[command(
        about = "Print the step layout of a scheme",
        long_about = "Explain groups the steps of a scheme by branch and orders them by tier, the way a built pipeline would traverse them.",
        after_help = "Example:\n    tierflow explain ./arithmetic.scheme"
    )]
    Explain(ExplainArgs),
}

impl Command {
    /// `true` when stdout carries a machine-readable payload.
    pub fn wants_machine_output(&self) -> bool {
        let format = match self {
            Command::Check(args) => args.format,
            Command::Explain(args) => args.format,
        };
        format == OutputFormat::Json
    }

    pub fn scheme_file(&self) -> &Path {
        match self {
            Command::Check(args) => &args.file,
            Command::Explain(args) => &args.file,
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = args.workspace_root();
    match args.command {
        Command::Check(check_args) => commands::check(check_args, &workspace).await,
        Command::Explain(explain_args) => commands::explain(explain_args).await,
    }
}
