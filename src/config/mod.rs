//! Configuration module for the VideoDB skills.
//!
//! Handles `.env` loading and the optional settings file.

pub mod env;
mod settings;

pub use env::{candidate_files, load_env_files, API_KEY_VAR, BASE_URL_VAR};
pub use settings::{ApiSettings, GeneralSettings, Settings};
