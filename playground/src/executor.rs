//! Sandbox executor: one guarded execution of untrusted source.
//!
//! The executor owns no state besides its evaluator. The diagnostic channel
//! is passed in by the caller, redirected for exactly the duration of the
//! evaluation, and handed back restored whatever the evaluation did.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::core::types::ExecutionResult;
use crate::io::channel::DiagnosticChannel;
use crate::io::config::PlaygroundConfig;
use crate::io::evaluator::{BoaEvaluator, UntrustedEvaluator};

#[derive(Clone)]
pub struct SandboxExecutor {
    evaluator: Arc<dyn UntrustedEvaluator>,
}

impl SandboxExecutor {
    pub fn new(evaluator: Arc<dyn UntrustedEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Executor backed by the JavaScript interpreter with configured limits.
    pub fn from_config(cfg: &PlaygroundConfig) -> Self {
        Self::new(Arc::new(BoaEvaluator::new(cfg.evaluator)))
    }

    /// Run `source` with the channel captured.
    ///
    /// Never fails: syntax errors and thrown values become a failure result.
    /// A panic inside the evaluator propagates, but only after the channel
    /// has been restored.
    #[instrument(skip_all, fields(source_len = source.len()))]
    pub fn execute(&self, channel: &mut DiagnosticChannel, source: &str) -> ExecutionResult {
        let mut capture = channel.capture();
        let outcome = self.evaluator.evaluate(source, &mut capture);
        let lines = capture.finish();

        match outcome {
            Ok(()) => {
                debug!(lines = lines.len(), "execution succeeded");
                ExecutionResult::success(lines)
            }
            Err(fault) => {
                info!(message = %fault.message, "execution failed");
                ExecutionResult::failure(fault.message, lines)
            }
        }
    }
}

impl Default for SandboxExecutor {
    fn default() -> Self {
        Self::new(Arc::new(BoaEvaluator::default()))
    }
}
