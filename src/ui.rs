//! Terminal UI — spinners, step lines, warnings, and the final banner.
//!
//! # Design goals
//!
//! - **Quiet while working.** While a blocking git call runs the user sees only a spinner and a
//!   short label.
//! - **Every step leaves a line.** A finished step prints `✓ label`; a failed one prints
//!   `✗ label` followed by the error, so after a partial `init` the operator can see which steps
//!   completed.
//! - **Testable without a terminal.** [`Step`] is plain data; the line renderers return `String`s
//!   so tests can inspect them without touching the real terminal.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames — same style as indicatif's default.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}
fn icon_warn() -> console::StyledObject<&'static str> {
    style("!").yellow().bold()
}
/// Cyan ✓   — printed next to the final success summary.
fn icon_done() -> console::StyledObject<&'static str> {
    style("✓").cyan().bold()
}

// ─── Step result ─────────────────────────────────────────────────────────────

/// The outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Human-readable label, e.g. `"Pull ./destination1"`.
    pub label: String,
    /// The error message, if the step failed.
    pub error: Option<String>,
}

impl Step {
    pub const fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// The one-line summary, without styling when the terminal has none.
    pub fn line(&self) -> String {
        if self.failed() {
            format!("  {}  {}", icon_err(), style(&self.label).bold())
        } else {
            format!("  {}  {}", icon_ok(), style(&self.label).bold())
        }
    }

    /// Print the summary line; on failure also print the error to stderr.
    pub fn print(&self) {
        println!("{}", self.line());
        if let Some(ref msg) = self.error {
            eprintln!("  {} {}", style("Error:").red().bold(), msg);
        }
    }
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Create and start an indeterminate spinner for `label`.
///
/// The spinner draws to stderr and stays hidden when stderr is not a
/// terminal.
fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::with_template("  {spinner:.cyan}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);
    pb.set_style(spinner_style);
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ─── High-level step runner ───────────────────────────────────────────────────

/// Run `work` behind a spinner, print its ✓/✗ line, and hand back its result.
///
/// The spinner is cleared before the line is printed, so the terminal always
/// shows a clean, static summary when the step finishes.
pub fn step<T, E: std::fmt::Display>(
    label: impl Into<String>,
    work: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let label = label.into();
    let spinner = make_spinner(&label);
    let result = work();
    spinner.finish_and_clear();

    Step {
        label,
        error: result.as_ref().err().map(ToString::to_string),
    }
    .print();

    result
}

/// Record a step that completed without any blocking work.
pub fn done_step(label: impl Into<String>) {
    Step {
        label: label.into(),
        error: None,
    }
    .print();
}

// ─── Messages ─────────────────────────────────────────────────────────────────

/// Plain progress note, e.g. "Setting up backup repositories for ./src...".
pub fn note(msg: impl std::fmt::Display) {
    println!("{msg}");
}

/// Pre-existing state that is handled rather than escalated.
pub fn warn(msg: impl std::fmt::Display) {
    println!("  {}  {} {}", icon_warn(), style("Warning:").yellow().bold(), msg);
}

/// A user-input problem that aborts the command cleanly.
pub fn error(msg: impl std::fmt::Display) {
    eprintln!("  {}  {} {}", icon_err(), style("Error:").red().bold(), msg);
}

/// Final success banner.
pub fn finish(msg: impl std::fmt::Display) {
    println!();
    println!("  {} {}", icon_done(), style(msg).cyan().bold());
    println!();
}

// ─── Tests ────────────────────────────────────────────────────────────────────
