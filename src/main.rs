use clap::Parser;
use std::process::ExitCode;
use tierflow::cli::{self, Args};
use tierflow::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let context = logging::detect_context(&args.command);
    let workspace = args.workspace_root();

    let _guard = match logging::init(context, Some(workspace.as_path())) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    };

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
