//! Telemetry utilities for command timing and dispatch correlation.

use std::time::Instant;
use tracing::debug;

/// Guard for timing a command handler.
///
/// Logs handler latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        debug!(command = %self.command, elapsed_ms, "Command finished");
    }
}

/// Standardized span constructors for dispatch observability.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Create a span for one message passing through the router.
    pub fn message(sender: &str) -> Span {
        info_span!("message", sender = %sender)
    }

    /// Create a span for a command node dispatch.
    pub fn dispatch(command: &str, sender: &str) -> Span {
        debug_span!("dispatch", command = %command, sender = %sender)
    }

    /// Create a span for a passive watcher evaluation.
    pub fn passive(pattern: &str) -> Span {
        debug_span!("passive", pattern = %pattern)
    }
}
