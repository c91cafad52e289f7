//! Execution session controller: the editor widget's run state machine.
//!
//! A session owns one source buffer and cycles
//! `Idle -> Running -> ShowingResult -> Running -> ...`. Runs are
//! serialized per session (a `run` while `Running` is ignored) and every run
//! leaves `Running`, even when its task panics or is aborted.
//!
//! All sessions opened from one [`SessionHost`] share the host's diagnostic
//! channel, so captures from different sessions never interleave.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::types::{
    ActiveView, ExecutionResult, Notification, OUTPUT_PLACEHOLDER, SessionPhase,
};
use crate::executor::SandboxExecutor;
use crate::io::channel::DiagnosticChannel;
use crate::io::config::PlaygroundConfig;
use crate::io::identity::random_id;

/// Events broadcast to observers of any session opened from a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged {
        session_id: String,
        phase: SessionPhase,
    },
    Notification {
        session_id: String,
        notification: Notification,
    },
}

/// Resources shared by every session: executor, print channel, run delay
/// and the event bus.
#[derive(Clone)]
pub struct SessionHost {
    executor: SandboxExecutor,
    channel: Arc<Mutex<DiagnosticChannel>>,
    run_delay: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHost {
    pub fn new(
        executor: SandboxExecutor,
        channel: DiagnosticChannel,
        run_delay: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            executor,
            channel: Arc::new(Mutex::new(channel)),
            run_delay,
            events,
        }
    }

    pub fn from_config(cfg: &PlaygroundConfig) -> Self {
        Self::new(
            SandboxExecutor::from_config(cfg),
            DiagnosticChannel::default(),
            cfg.run_delay(),
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Shared print channel. Exposed so the host can print through it.
    pub fn channel(&self) -> Arc<Mutex<DiagnosticChannel>> {
        Arc::clone(&self.channel)
    }

    /// Open a session seeded with `seed`. `language` is a display tag only.
    pub fn open_session(&self, seed: impl Into<String>, language: impl Into<String>) -> SessionController {
        let id = random_id();
        let language = language.into();
        debug!(session_id = %id, language = %language, "session opened");
        SessionController {
            id,
            language,
            state: Arc::new(Mutex::new(SessionState {
                source: seed.into(),
                phase: SessionPhase::Idle,
                view: ActiveView::Code,
                last_result: None,
            })),
            host: self.clone(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    source: String,
    phase: SessionPhase,
    view: ActiveView,
    last_result: Option<ExecutionResult>,
}

/// Serializable view of a session for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub language: String,
    pub source: String,
    pub phase: SessionPhase,
    pub view: ActiveView,
    /// Text of the output view.
    pub output: String,
    pub last_result: Option<ExecutionResult>,
}

/// One editor widget instance. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionController {
    id: String,
    language: String,
    state: Arc<Mutex<SessionState>>,
    host: SessionHost,
}

impl SessionController {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase
    }

    pub fn last_result(&self) -> Option<ExecutionResult> {
        self.lock_state().last_result.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            id: self.id.clone(),
            language: self.language.clone(),
            source: state.source.clone(),
            phase: state.phase,
            view: state.view,
            output: state
                .last_result
                .as_ref()
                .map(ExecutionResult::display_text)
                .unwrap_or_else(|| OUTPUT_PLACEHOLDER.to_string()),
            last_result: state.last_result.clone(),
        }
    }

    /// Events of every session on this host; filter by `session_id`.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.host.subscribe()
    }

    /// Replace the source buffer. Allowed in any phase; an in-flight run
    /// keeps the snapshot it started with.
    pub fn update_source(&self, source: impl Into<String>) {
        self.lock_state().source = source.into();
    }

    /// Switch the visible tab.
    pub fn show(&self, view: ActiveView) {
        self.lock_state().view = view;
    }

    /// Start a run of the current source.
    ///
    /// Returns `None` (and changes nothing) when a run is already in flight.
    /// Otherwise the session is `Running` with the output view shown before
    /// this returns, and the handle completes once the result is published.
    /// Must be called within a tokio runtime.
    pub fn run(&self) -> Option<JoinHandle<()>> {
        let source = {
            let mut state = self.lock_state();
            if state.phase == SessionPhase::Running {
                debug!(session_id = %self.id, "run ignored, already running");
                return None;
            }
            state.phase = SessionPhase::Running;
            state.view = ActiveView::Output;
            state.source.clone()
        };
        info!(session_id = %self.id, source_len = source.len(), "run started");
        let _ = self.host.events.send(SessionEvent::PhaseChanged {
            session_id: self.id.clone(),
            phase: SessionPhase::Running,
        });

        let pending = PendingRun {
            session_id: self.id.clone(),
            state: Arc::clone(&self.state),
            events: self.host.events.clone(),
            settled: false,
        };
        let executor = self.host.executor.clone();
        let channel = Arc::clone(&self.host.channel);
        let delay = self.host.run_delay;

        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let joined = tokio::task::spawn_blocking(move || {
                let mut channel = channel.lock().unwrap_or_else(PoisonError::into_inner);
                executor.execute(&mut channel, &source)
            })
            .await;

            match joined {
                Ok(result) => {
                    let notification = result.error_message.clone().map(|message| Notification {
                        title: "Execution Error".to_string(),
                        description: message,
                    });
                    pending.settle(result, notification);
                }
                Err(err) => {
                    warn!(error = %err, "sandbox execution did not complete");
                    pending.settle(
                        ExecutionResult::failure(format!("execution aborted: {err}"), Vec::new()),
                        Some(failed_to_execute()),
                    );
                }
            }
        }))
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn failed_to_execute() -> Notification {
    Notification {
        title: "Error".to_string(),
        description: "Failed to execute code".to_string(),
    }
}

/// Publishes the outcome of one run. If dropped before `settle` (task
/// aborted or runtime shut down), it publishes a failure instead, so the
/// session never stays `Running`.
struct PendingRun {
    session_id: String,
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    settled: bool,
}

impl PendingRun {
    fn settle(mut self, result: ExecutionResult, notification: Option<Notification>) {
        self.publish(result, notification);
    }

    fn publish(&mut self, result: ExecutionResult, notification: Option<Notification>) {
        self.settled = true;
        debug!(session_id = %self.session_id, outcome = ?result.outcome, "run finished");
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.last_result = Some(result);
            state.phase = SessionPhase::ShowingResult;
        }
        let _ = self.events.send(SessionEvent::PhaseChanged {
            session_id: self.session_id.clone(),
            phase: SessionPhase::ShowingResult,
        });
        if let Some(notification) = notification {
            let _ = self.events.send(SessionEvent::Notification {
                session_id: self.session_id.clone(),
                notification,
            });
        }
    }
}

impl Drop for PendingRun {
    fn drop(&mut self) {
        if !self.settled {
            warn!(session_id = %self.session_id, "run abandoned before completion");
            self.publish(
                ExecutionResult::failure("run was abandoned before it finished", Vec::new()),
                Some(failed_to_execute()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Outcome;
    use crate::io::evaluator::UntrustedEvaluator;
    use crate::test_support::{PanickingEvaluator, RecordingSink, ScriptedEvaluator};

    fn host_with(evaluator: Arc<dyn UntrustedEvaluator>, delay_ms: u64) -> SessionHost {
        SessionHost::new(
            SandboxExecutor::new(evaluator),
            DiagnosticChannel::new(Box::new(RecordingSink::default())),
            Duration::from_millis(delay_ms),
        )
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn new_session_is_idle_with_placeholder() {
        let host = host_with(Arc::new(ScriptedEvaluator::default()), 1);
        let session = host.open_session("console.log(1)", "javascript");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert_eq!(snapshot.view, ActiveView::Code);
        assert_eq!(snapshot.output, OUTPUT_PLACEHOLDER);
        assert_eq!(snapshot.source, "console.log(1)");
        assert!(snapshot.last_result.is_none());
    }

    #[tokio::test]
    async fn run_switches_view_immediately_then_shows_result() {
        let host = host_with(Arc::new(ScriptedEvaluator::printing(&["hi"])), 20);
        let mut rx = host.subscribe();
        let session = host.open_session("ignored", "javascript");

        let handle = session.run().expect("run starts");
        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.snapshot().view, ActiveView::Output);

        handle.await.expect("run task");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::ShowingResult);
        assert_eq!(snapshot.output, "hi");

        let events = drain(&mut rx);
        let phases: Vec<SessionPhase> = events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::PhaseChanged { phase, .. } => Some(*phase),
                SessionEvent::Notification { .. } => None,
            })
            .collect();
        assert_eq!(phases, vec![SessionPhase::Running, SessionPhase::ShowingResult]);
    }

    #[tokio::test]
    async fn failure_raises_notification() {
        let host = host_with(Arc::new(ScriptedEvaluator::failing("boom")), 1);
        let mut rx = host.subscribe();
        let session = host.open_session("ignored", "javascript");

        session.run().expect("run starts").await.expect("run task");

        let result = session.last_result().expect("result");
        assert_eq!(result.outcome, Outcome::Failure);
        assert_eq!(session.snapshot().output, "// Error: boom");
        let notified = drain(&mut rx).into_iter().any(|event| {
            matches!(
                event,
                SessionEvent::Notification { notification, .. }
                    if notification.title == "Execution Error" && notification.description == "boom"
            )
        });
        assert!(notified);
    }

    #[tokio::test]
    async fn overlapping_run_is_ignored() {
        let evaluator = Arc::new(ScriptedEvaluator::printing(&["once"]));
        let host = host_with(evaluator.clone(), 30);
        let session = host.open_session("src", "javascript");

        let first = session.run().expect("first run starts");
        assert!(session.run().is_none());

        first.await.expect("run task");
        assert_eq!(session.phase(), SessionPhase::ShowingResult);
        assert_eq!(evaluator.seen().len(), 1);
        let channel = host.channel();
        assert!(!channel.lock().expect("channel").is_redirected());
    }

    #[tokio::test]
    async fn edits_during_delay_do_not_affect_run() {
        let evaluator = Arc::new(ScriptedEvaluator::default());
        let host = host_with(evaluator.clone(), 30);
        let session = host.open_session("original", "javascript");

        let handle = session.run().expect("run starts");
        session.update_source("edited");
        handle.await.expect("run task");

        assert_eq!(evaluator.seen(), vec!["original".to_string()]);
        assert_eq!(session.snapshot().source, "edited");
    }

    #[tokio::test]
    async fn panicking_run_still_leaves_running() {
        let host = host_with(Arc::new(PanickingEvaluator), 1);
        let mut rx = host.subscribe();
        let session = host.open_session("src", "javascript");

        session.run().expect("run starts").await.expect("run task");

        assert_eq!(session.phase(), SessionPhase::ShowingResult);
        let result = session.last_result().expect("result");
        assert_eq!(result.outcome, Outcome::Failure);
        assert!(!host.channel().lock().unwrap_or_else(PoisonError::into_inner).is_redirected());
        assert!(drain(&mut rx).into_iter().any(|event| matches!(
            event,
            SessionEvent::Notification { notification, .. } if notification == failed_to_execute()
        )));
    }

    #[tokio::test]
    async fn aborted_run_still_leaves_running() {
        let evaluator = Arc::new(ScriptedEvaluator::default());
        let host = host_with(evaluator.clone(), 10_000);
        let session = host.open_session("src", "javascript");

        let handle = session.run().expect("run starts");
        handle.abort();
        let _ = handle.await;

        assert_eq!(session.phase(), SessionPhase::ShowingResult);
        assert!(evaluator.seen().is_empty());
        assert!(session.run().is_some());
    }

    #[tokio::test]
    async fn show_switches_view() {
        let host = host_with(Arc::new(ScriptedEvaluator::default()), 1);
        let session = host.open_session("src", "javascript");
        session.show(ActiveView::Output);
        assert_eq!(session.snapshot().view, ActiveView::Output);
    }
}
