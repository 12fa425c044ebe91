//! Diagnostics for the terminal. Everything here goes to stderr; stdout is
//! reserved for the result payload.

use crate::skills::Skill;
use console::{style, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print usage with the valid skills and an example for each.
    pub fn usage() {
        eprintln!(
            "\n{} videodb-skills <skill> ['<json>']",
            style("Usage:").bold().underlined()
        );
        eprintln!("\n{}", style("Skills:").bold());
        for skill in Skill::all() {
            eprintln!(
                "  {} {:<12} {}",
                style("*").cyan(),
                style(skill.name()).bold(),
                style(skill.example()).dim()
            );
        }
    }

    /// Create a spinner, hidden when stderr is not a terminal.
    pub fn spinner(msg: &str) -> ProgressBar {
        if !Term::stderr().is_term() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
