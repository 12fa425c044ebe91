//! VideoDB skills
//!
//! Command-line skills that search, index and transcribe videos through the
//! hosted VideoDB API. Each invocation takes one JSON argument and prints one
//! JSON result (or plain text for `transcript` with `format=text`).
//!
//! # Architecture
//!
//! - `config` - settings file and `.env` loading
//! - `request` - parsing of the JSON argument
//! - `videodb` - the `VideoApi` trait, its HTTP client and an in-memory double
//! - `resolver` - turning a URL or ID into a video handle
//! - `skills` - search, scene-index, transcript and upload
//! - `output` - stdout payloads and exit codes
//! - `cli` - command-line surface
//!
//! # Example
//!
//! ```rust,no_run
//! use videodb_skills::config::Settings;
//! use videodb_skills::skills::{execute, Skill};
//! use videodb_skills::request::SkillRequest;
//! use videodb_skills::videodb::VideoDbClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let client = VideoDbClient::connect(
//!         &std::env::var("VIDEODB_API_KEY")?,
//!         settings.api.parse_base_url()?,
//!         &settings.api,
//!     )
//!     .await?;
//!
//!     let request = SkillRequest::parse(
//!         Skill::Search,
//!         r#"{"video_id": "m-123", "query": "pricing"}"#,
//!     )?;
//!     let output = execute(&client, &request).await?;
//!     println!("{:?}", output);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod request;
pub mod resolver;
pub mod skills;
pub mod videodb;

pub use error::{ErrorCode, Result, SkillError};
