use crate::{
    cli::args::{CheckArgs, ExplainArgs, OutputFormat},
    core::{
        pipeline::{LintRegistry, LintResult, LintSeverity, SchemeLayout},
        ConfigLoader, Scheme,
    },
    Result,
};
use anyhow::anyhow;
use serde_json::json;
use std::path::Path;

pub async fn check(args: CheckArgs, workspace: &Path) -> Result<()> {
    tracing::info!("Checking scheme: {}", args.file.display());

    let parsed = Scheme::load(&args.file)?;
    let lints = LintRegistry::new().run(&parsed.scheme);
    let config_error = ConfigLoader::load_from_workspace(workspace)
        .err()
        .map(|err| err.to_string());

    let severities = parsed
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.severity)
        .chain(lints.iter().map(|lint| lint.severity));
    let (mut errors, mut warnings) = (0usize, 0usize);
    for severity in severities {
        match severity {
            LintSeverity::Error => errors += 1,
            LintSeverity::Warning => warnings += 1,
            LintSeverity::Info => {}
        }
    }
    if config_error.is_some() {
        errors += 1;
    }
    let failed = errors > 0 || (args.deny_warnings && warnings > 0);

    match args.format {
        OutputFormat::Text => {
            println!(
                "{}: {} step(s), {} error(s), {} warning(s)",
                args.file.display(),
                parsed.scheme.len(),
                errors,
                warnings
            );
            for diagnostic in &parsed.diagnostics {
                println!("  {}", diagnostic);
            }
            for lint in &lints {
                println!("  {}", describe_lint(lint));
            }
            if let Some(message) = &config_error {
                println!("  config: {}", message);
            }
        }
        OutputFormat::Json => {
            let payload = json!({
                "file": args.file.display().to_string(),
                "steps": parsed.scheme.len(),
                "errors": errors,
                "warnings": warnings,
                "ok": !failed,
                "diagnostics": parsed.diagnostics,
                "lints": lints,
                "config_error": config_error,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    if failed {
        return Err(anyhow!(
            "{} failed checks with {} error(s) and {} warning(s)",
            args.file.display(),
            errors,
            warnings
        ));
    }
    Ok(())
}

pub async fn explain(args: ExplainArgs) -> Result<()> {
    tracing::info!("Explaining scheme: {}", args.file.display());

    let parsed = Scheme::load(&args.file)?;
    for diagnostic in &parsed.diagnostics {
        tracing::warn!("{}", diagnostic);
    }
    let layout = SchemeLayout::from_scheme(&parsed.scheme);

    match args.format {
        OutputFormat::Text => print!("{}", layout),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&layout)?),
    }
    Ok(())
}

fn describe_lint(lint: &LintResult) -> String {
    let mut line = format!("{} [{}] {}", lint.severity, lint.code, lint.message);
    if let Some(location) = &lint.location {
        line.push_str(&format!(" at {}", location));
    }
    if let Some(suggestion) = &lint.suggestion {
        line.push_str(&format!(" (hint: {})", suggestion));
    }
    line
}
