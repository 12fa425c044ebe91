//! CLI module for the VideoDB skills.

mod output;
pub mod preflight;

pub use output::Output;

use crate::config::{candidate_files, load_env_files, Settings};
use crate::error::{Result, SkillError};
use crate::output::SkillOutput;
use crate::request::{SkillRequest, VideoSource};
use crate::skills::{execute, Skill};
use crate::videodb::{VideoApi, VideoDbClient};
use clap::Parser;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use tracing::{debug, info};

/// VideoDB skills - search, scene indexing and transcripts for videos
///
/// Runs one skill with a single JSON argument and prints one JSON result.
/// Skills: search, scene-index (alias: scene), transcript, upload.
#[derive(Parser, Debug)]
#[command(name = "videodb-skills")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Extra .env file, loaded before the default locations
    #[arg(long, global = true)]
    pub env_file: Option<String>,

    /// Skill to run
    pub skill: String,

    /// JSON arguments (read from stdin when omitted)
    pub args: Option<String>,
}

impl Cli {
    /// .env files to try, highest precedence first.
    pub fn env_files(&self, settings: &Settings) -> Vec<PathBuf> {
        let explicit: Vec<PathBuf> = self
            .env_file
            .as_deref()
            .map(Settings::expand_path)
            .into_iter()
            .chain(settings.env_file())
            .collect();
        candidate_files(&explicit)
    }

    /// Resolve the skill, then load settings and `.env` files.
    ///
    /// The skill comes first so an unknown name is reported even when the
    /// settings file is broken. `.env` files are loaded before the caller sets
    /// up logging, so a `RUST_LOG` from them still applies.
    pub fn prepare(&self) -> Result<Invocation> {
        let skill: Skill = self.skill.parse()?;

        let settings = match &self.config {
            Some(path) => Settings::load_from(Some(&PathBuf::from(path))),
            None => Settings::load(),
        };
        let env_files = load_env_files(&self.env_files(settings.as_ref().unwrap_or(&Settings::default())));

        let mut settings = settings?;
        settings.api.apply_env();

        Ok(Invocation {
            skill,
            settings,
            env_files,
        })
    }
}

/// Startup state for one invocation.
#[derive(Debug)]
pub struct Invocation {
    pub skill: Skill,
    pub settings: Settings,
    /// `.env` files that were actually loaded.
    pub env_files: Vec<PathBuf>,
}

/// The JSON argument: the positional if given, stdin otherwise.
pub fn read_args(args: Option<&str>) -> Result<String> {
    if let Some(args) = args {
        return Ok(args.to_string());
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(SkillError::InvalidArgs(
            "Provide the JSON arguments on the command line or on stdin".to_string(),
        ));
    }

    let mut raw = String::new();
    stdin
        .read_to_string(&mut raw)
        .map_err(|e| SkillError::InvalidArgs(format!("Failed to read stdin: {}", e)))?;
    if raw.trim().is_empty() {
        return Err(SkillError::InvalidArgs(
            "No JSON arguments given on stdin".to_string(),
        ));
    }
    Ok(raw)
}

/// Parse, check, connect and run one skill.
pub async fn run_skill(skill: Skill, raw: &str, settings: &Settings) -> Result<SkillOutput> {
    let request = SkillRequest::parse(skill, raw)?;
    debug!(?request, "Parsed request");

    let api_key = preflight::check_api_key()?;
    let base_url = settings.api.parse_base_url()?;
    let client = VideoDbClient::connect(&api_key, base_url, &settings.api).await?;
    info!(skill = %skill, collection = %client.collection().id, "Connected to VideoDB");

    let spinner = Output::spinner(progress_message(&request));
    let result = execute(&client, &request).await;
    spinner.finish_and_clear();
    result
}

fn progress_message(request: &SkillRequest) -> &'static str {
    match request.source() {
        Some(VideoSource::Url(_)) => "Uploading video to VideoDB...",
        _ => match request {
            SkillRequest::Upload(_) => "Uploading video to VideoDB...",
            SkillRequest::Transcript(_) => "Fetching transcript...",
            SkillRequest::SceneIndex(_) => "Working on scene index...",
            SkillRequest::Search(_) => "Searching...",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::output::render;

    #[test]
    fn test_cli_parses_skill_and_args() {
        let cli = Cli::try_parse_from([
            "videodb-skills",
            "-vv",
            "search",
            r#"{"video_id": "m-1", "query": "q"}"#,
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.skill, "search");
        assert!(cli.args.is_some());

        let cli = Cli::try_parse_from(["videodb-skills", "transcript"]).unwrap();
        assert!(cli.args.is_none());
    }

    #[test]
    fn test_unknown_skill_exits_one() {
        let cli = Cli::try_parse_from(["videodb-skills", "summarize", "{}"]).unwrap();
        let result = cli.skill.parse::<Skill>().map(|_| SkillOutput::Text(String::new()));
        let rendered = render(&result);
        assert_eq!(rendered.exit_code, 1);
        assert!(rendered.stdout.contains("INVALID_ARGS"));
        assert!(rendered.stdout.contains("scene-index"));
        assert!(rendered.stdout.contains("transcript"));
    }

    #[test]
    fn test_env_files_precede_defaults() {
        let cli = Cli::try_parse_from(["videodb-skills", "--env-file", "/tmp/a.env", "search"])
            .unwrap();
        let files = cli.env_files(&Settings::default());
        assert_eq!(files[0], PathBuf::from("/tmp/a.env"));
        assert!(files.len() > 1);
    }

    #[test]
    fn test_unknown_skill_reported_before_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[api\nbase_url = ").unwrap();

        let cli = Cli::try_parse_from([
            "videodb-skills",
            "--config",
            config.to_str().unwrap(),
            "summarize",
        ])
        .unwrap();
        let err = cli.prepare().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgs);
        assert!(err.to_string().contains("scene-index"));

        let cli = Cli::try_parse_from([
            "videodb-skills",
            "--config",
            config.to_str().unwrap(),
            "search",
        ])
        .unwrap();
        let err = cli.prepare().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgs);
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_prepare_loads_env_files() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join("skills.env");
        std::fs::write(&env_file, "VIDEODB_SKILLS_PREPARE_CHECK=loaded\n").unwrap();
        let config = dir.path().join("missing.toml");

        let cli = Cli::try_parse_from([
            "videodb-skills",
            "--config",
            config.to_str().unwrap(),
            "--env-file",
            env_file.to_str().unwrap(),
            "transcript",
        ])
        .unwrap();
        let invocation = cli.prepare().unwrap();
        assert_eq!(invocation.skill, Skill::Transcript);
        assert_eq!(invocation.env_files[0], env_file);
        assert_eq!(
            std::env::var("VIDEODB_SKILLS_PREPARE_CHECK").unwrap(),
            "loaded"
        );
    }

    #[test]
    fn test_positional_args_win_over_stdin() {
        assert_eq!(read_args(Some("{}")).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_invalid_args_fail_before_network() {
        // Port 9 is discard; nothing should ever connect.
        let mut settings = Settings::default();
        settings.api.base_url = "http://127.0.0.1:9".to_string();

        let err = run_skill(Skill::Search, r#"{"query": "pricing"}"#, &settings)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgs);
    }
}
