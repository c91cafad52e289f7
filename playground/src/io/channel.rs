//! The diagnostic print channel shared by every sandbox run in a process.
//!
//! Executed code never touches the host handler directly. A run acquires a
//! [`Capture`] guard, which diverts every printed line into an in-memory
//! accumulator until the guard is finished or dropped. Dropping the guard
//! (including during a panic unwind) puts the host handler back.

use tracing::{debug, info};

/// Destination for printed lines.
pub trait OutputSink: Send {
    fn write_line(&mut self, line: &str);
}

/// Host handler that forwards printed lines to `tracing`.
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn write_line(&mut self, line: &str) {
        info!(target: "playground::console", "{line}");
    }
}

/// Process-wide print channel with a swappable accumulator.
pub struct DiagnosticChannel {
    handler: Box<dyn OutputSink>,
    accumulator: Option<Vec<String>>,
}

impl DiagnosticChannel {
    pub fn new(handler: Box<dyn OutputSink>) -> Self {
        Self {
            handler,
            accumulator: None,
        }
    }

    /// Print a line to whoever currently owns the channel.
    pub fn print(&mut self, line: &str) {
        match self.accumulator.as_mut() {
            Some(lines) => lines.push(line.to_string()),
            None => self.handler.write_line(line),
        }
    }

    /// True while a [`Capture`] guard is alive.
    pub fn is_redirected(&self) -> bool {
        self.accumulator.is_some()
    }

    /// Redirect the channel into a fresh accumulator.
    ///
    /// The returned guard borrows the channel exclusively, so captures cannot
    /// nest or overlap.
    pub fn capture(&mut self) -> Capture<'_> {
        self.accumulator = Some(Vec::new());
        debug!("diagnostic channel redirected");
        Capture { channel: self }
    }
}

impl Default for DiagnosticChannel {
    fn default() -> Self {
        Self::new(Box::new(TracingSink))
    }
}

/// Scoped redirection of a [`DiagnosticChannel`].
pub struct Capture<'a> {
    channel: &'a mut DiagnosticChannel,
}

impl Capture<'_> {
    /// Restore the host handler and return the captured lines in order.
    pub fn finish(self) -> Vec<String> {
        self.channel.accumulator.take().unwrap_or_default()
    }
}

impl OutputSink for Capture<'_> {
    fn write_line(&mut self, line: &str) {
        self.channel.print(line);
    }
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        if let Some(lines) = self.channel.accumulator.take() {
            debug!(
                discarded = lines.len(),
                "diagnostic channel restored without collecting output"
            );
        } else {
            debug!("diagnostic channel restored");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl OutputSink for Recorder {
        fn write_line(&mut self, line: &str) {
            self.0.lock().expect("recorder lock").push(line.to_string());
        }
    }

    impl Recorder {
        fn lines(&self) -> Vec<String> {
            self.0.lock().expect("recorder lock").clone()
        }
    }

    #[test]
    fn capture_diverts_then_restores_host_handler() {
        let host = Recorder::default();
        let mut channel = DiagnosticChannel::new(Box::new(host.clone()));

        let mut capture = channel.capture();
        capture.write_line("captured");
        let lines = capture.finish();

        channel.print("after");
        assert_eq!(lines, vec!["captured".to_string()]);
        assert_eq!(host.lines(), vec!["after".to_string()]);
        assert!(!channel.is_redirected());
    }

    #[test]
    fn dropping_guard_restores_channel() {
        let host = Recorder::default();
        let mut channel = DiagnosticChannel::new(Box::new(host.clone()));
        {
            let mut capture = channel.capture();
            capture.write_line("lost");
        }
        assert!(!channel.is_redirected());
        channel.print("visible");
        assert_eq!(host.lines(), vec!["visible".to_string()]);
    }

    #[test]
    fn panic_during_capture_still_restores() {
        let host = Recorder::default();
        let mut channel = DiagnosticChannel::new(Box::new(host.clone()));

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut capture = channel.capture();
            capture.write_line("before panic");
            panic!("evaluator blew up");
        }));

        assert!(outcome.is_err());
        assert!(!channel.is_redirected());
        channel.print("host again");
        assert_eq!(host.lines(), vec!["host again".to_string()]);
    }
}
