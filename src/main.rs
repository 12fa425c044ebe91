//! VideoDB skills CLI entry point.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use videodb_skills::cli::{read_args, run_skill, Cli, Invocation, Output};
use videodb_skills::output::{render, render_error, Rendered};
use videodb_skills::skills::Skill;
use videodb_skills::SkillError;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) => {
            eprint!("{}", err.render());
            Output::usage();
            let message = err.kind().as_str().unwrap_or("invalid command line").to_string();
            return emit(&render_error(&SkillError::InvalidArgs(message)));
        }
    };

    // Skill, settings and .env files before logging, so RUST_LOG from .env applies
    let prepared = cli.prepare();

    // Initialize logging
    let default_level = prepared
        .as_ref()
        .map(|invocation| invocation.settings.general.log_level.as_str())
        .unwrap_or("warn");
    let log_level = match cli.verbose {
        0 => default_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("videodb_skills={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let Invocation {
        skill,
        settings,
        env_files,
    } = match prepared {
        Ok(invocation) => invocation,
        Err(err) => {
            Output::error(&err.to_string());
            if cli.skill.parse::<Skill>().is_err() {
                Output::usage();
            }
            return emit(&render_error(&err));
        }
    };
    tracing::debug!(?env_files, "Loaded .env files");

    let raw = match read_args(cli.args.as_deref()) {
        Ok(raw) => raw,
        Err(err) => {
            Output::usage();
            return emit(&render_error(&err));
        }
    };

    let result = run_skill(skill, &raw, &settings).await;
    if let Err(err) = &result {
        tracing::debug!(code = %err.code(), "Skill failed: {}", err);
    }
    emit(&render(&result))
}

/// Print the payload and turn the exit code into an `ExitCode`.
fn emit(rendered: &Rendered) -> Result<ExitCode> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered.stdout)?;
    stdout.flush()?;
    Ok(ExitCode::from(rendered.exit_code))
}
