//! Test-only helpers: deterministic patterns, a recording host sink and
//! scripted evaluators that never touch the interpreter.

use std::sync::{Arc, Mutex, PoisonError};

use crate::core::catalog::Pattern;
use crate::io::channel::OutputSink;
use crate::io::evaluator::{Fault, UntrustedEvaluator};

/// Create a deterministic pattern with placeholder text.
pub fn pattern(slug: &str, name: &str) -> Pattern {
    Pattern {
        id: 0,
        name: name.to_string(),
        slug: slug.to_string(),
        description: format!("{name} description"),
        category: "javascript".to_string(),
        difficulty: "beginner".to_string(),
        kind: "creational".to_string(),
        content: format!("<p>{name} content</p>"),
        code_example: format!("console.log('{slug} example');"),
        code_template: format!("console.log('{slug}');"),
        related_patterns: Vec::new(),
        real_world_examples: Vec::new(),
        benefits: Vec::new(),
        drawbacks: Vec::new(),
        further_reading: Vec::new(),
    }
}

/// Host sink that remembers every line it receives. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OutputSink for RecordingSink {
    fn write_line(&mut self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Evaluator that prints fixed lines and then returns a fixed outcome,
/// recording every source it was asked to run.
#[derive(Debug, Default)]
pub struct ScriptedEvaluator {
    pub lines: Vec<String>,
    pub fault: Option<String>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedEvaluator {
    pub fn printing(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|line| line.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fault: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Fail with `message` after printing.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.fault = Some(message.to_string());
        self
    }

    /// Sources passed to `evaluate`, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UntrustedEvaluator for ScriptedEvaluator {
    fn evaluate(&self, source: &str, sink: &mut dyn OutputSink) -> Result<(), Fault> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(source.to_string());
        for line in &self.lines {
            sink.write_line(line);
        }
        match &self.fault {
            Some(message) => Err(Fault::new(message.clone())),
            None => Ok(()),
        }
    }
}

/// Evaluator that panics mid-run after printing one line.
#[derive(Debug, Default)]
pub struct PanickingEvaluator;

impl UntrustedEvaluator for PanickingEvaluator {
    fn evaluate(&self, _source: &str, sink: &mut dyn OutputSink) -> Result<(), Fault> {
        sink.write_line("about to panic");
        panic!("evaluator panicked");
    }
}
