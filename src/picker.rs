//! Choosing which registered source a command operates on.
//!
//! Commands only decide *when* a choice is needed; *how* it is made is up to
//! the [`SourcePicker`] they are handed.  The binary passes
//! [`InteractivePicker`]; tests pass a fixed answer.

use anyhow::{Context, Result};
use inquire::Select;

pub trait SourcePicker {
    /// Pick one of `choices` (never empty).
    fn pick(&self, choices: &[String]) -> Result<String>;
}

/// Prompts on the terminal with an arrow-key menu.
#[derive(Debug, Default)]
pub struct InteractivePicker;

impl SourcePicker for InteractivePicker {
    fn pick(&self, choices: &[String]) -> Result<String> {
        Select::new("Select a source directory:", choices.to_vec())
            .prompt()
            .context("no source directory selected")
    }
}

/// Always answers with the same string, whether or not it is one of the
/// choices.
#[cfg(test)]
#[derive(Debug)]
pub struct FixedPicker(pub String);

#[cfg(test)]
impl SourcePicker for FixedPicker {
    fn pick(&self, _choices: &[String]) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Fails the test if a prompt is ever shown.
#[cfg(test)]
#[derive(Debug)]
pub struct NeverPicker;

#[cfg(test)]
impl SourcePicker for NeverPicker {
    fn pick(&self, choices: &[String]) -> Result<String> {
        panic!("unexpected prompt among {choices:?}");
    }
}
