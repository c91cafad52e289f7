//! Shared deterministic types for sandbox runs and sessions.
//!
//! These types define stable contracts between the executor, the session
//! controller and the HTTP layer. They carry no I/O and serialize to the
//! camelCase JSON shapes the browser client consumes.

use serde::{Deserialize, Serialize};

/// Shown in the output view when a run succeeded without printing anything.
pub const NO_OUTPUT_SENTINEL: &str = "// Code executed successfully but had no output";

/// Shown in the output view before the first run of a session.
pub const OUTPUT_PLACEHOLDER: &str = "// Output will appear here after you run your code";

/// Prefix applied to failure messages in the output view.
pub const ERROR_PREFIX: &str = "// Error: ";

/// Whether a sandbox run completed or raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// Structured result of one sandbox execution.
///
/// Immutable once produced; a session replaces it wholesale on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub outcome: Outcome,
    /// Captured print lines in call order. Kept on failure for diagnostics.
    pub lines: Vec<String>,
    /// Lines joined with `\n`, or [`NO_OUTPUT_SENTINEL`] when nothing was
    /// printed. Empty on failure.
    pub captured_output: String,
    pub error_message: Option<String>,
}

impl ExecutionResult {
    pub fn success(lines: Vec<String>) -> Self {
        let captured_output = if lines.is_empty() {
            NO_OUTPUT_SENTINEL.to_string()
        } else {
            lines.join("\n")
        };
        Self {
            outcome: Outcome::Success,
            lines,
            captured_output,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            lines,
            captured_output: String::new(),
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Text for the output view: captured output, or the prefixed error.
    pub fn display_text(&self) -> String {
        match self.outcome {
            Outcome::Success => self.captured_output.clone(),
            Outcome::Failure => format!(
                "{ERROR_PREFIX}{}",
                self.error_message.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// Lifecycle of a session's run state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Running,
    ShowingResult,
}

/// Which surface of the editor widget is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Code,
    Output,
}

/// Transient user-facing notice raised when a run fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
}
