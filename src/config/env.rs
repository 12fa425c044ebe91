//! Loading of `.env` files into the process environment.
//!
//! Files are applied in order and never override a variable that is already
//! set, so the shell environment wins, then the first file that defines a key.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable holding the VideoDB API key.
pub const API_KEY_VAR: &str = "VIDEODB_API_KEY";

/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "VIDEODB_BASE_URL";

const ENV_FILE_NAME: &str = ".env";

/// Candidate `.env` locations, most specific first.
///
/// Explicit paths come first, then the working directory, then the
/// directory holding the executable and its parent.
pub fn candidate_files(explicit: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = explicit.to_vec();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(ENV_FILE_NAME));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join(ENV_FILE_NAME));
        if let Some(parent) = exe_dir.parent() {
            candidates.push(parent.join(ENV_FILE_NAME));
        }
    }

    let mut unique = Vec::with_capacity(candidates.len());
    for path in candidates {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
}

/// Load every existing file from `candidates` into the environment.
///
/// Returns the files that were loaded. Malformed files are skipped with a
/// warning rather than aborting the invocation.
pub fn load_env_files(candidates: &[PathBuf]) -> Vec<PathBuf> {
    let mut loaded = Vec::new();

    for path in candidates {
        if !path.is_file() {
            continue;
        }

        match dotenvy::from_path(path) {
            Ok(()) => {
                debug!("Loaded environment from {}", path.display());
                loaded.push(path.clone());
            }
            Err(e) => warn!("Ignoring {}: {}", path.display(), e),
        }
    }

    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_files_come_first() {
        let explicit = PathBuf::from("/tmp/custom.env");
        let candidates = candidate_files(std::slice::from_ref(&explicit));
        assert_eq!(candidates.first(), Some(&explicit));
        assert!(candidates.iter().skip(1).all(|p| p.ends_with(ENV_FILE_NAME)));
    }

    #[test]
    fn test_candidates_are_unique() {
        let cwd_env = std::env::current_dir().unwrap().join(ENV_FILE_NAME);
        let candidates = candidate_files(&[cwd_env.clone()]);
        assert_eq!(candidates.iter().filter(|p| **p == cwd_env).count(), 1);
    }

    #[test]
    fn test_load_sets_variables_without_overriding() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "VIDEODB_SKILLS_TEST_FIRST=one").unwrap();
        writeln!(first, "VIDEODB_SKILLS_TEST_SHARED=from-first").unwrap();

        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "VIDEODB_SKILLS_TEST_SHARED=from-second").unwrap();

        let missing = PathBuf::from("/nonexistent/videodb-skills/.env");
        let loaded = load_env_files(&[
            first.path().to_path_buf(),
            missing,
            second.path().to_path_buf(),
        ]);

        assert_eq!(loaded.len(), 2);
        assert_eq!(std::env::var("VIDEODB_SKILLS_TEST_FIRST").unwrap(), "one");
        assert_eq!(
            std::env::var("VIDEODB_SKILLS_TEST_SHARED").unwrap(),
            "from-first"
        );
    }
}
