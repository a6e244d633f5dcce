//! Pluggable log sink.
//!
//! Server components report recoverable failures through this narrow
//! capability instead of calling a logging framework directly, so embedders
//! and tests can substitute their own sink. Logging is best-effort
//! reporting only; nothing ever branches on whether a line was written.

use std::sync::{Arc, Mutex};

use tracing::warn;

/// A sink for one diagnostic line at a time.
pub trait Logger: Send + Sync {
    /// Reports one diagnostic line.
    fn println(&self, message: &str);
}

/// Shared handle to a log sink, cloned into every server task.
pub type SharedLogger = Arc<dyn Logger>;

/// Default sink: forwards to `tracing` at warn level, since everything the
/// server reports through the sink is a recoverable failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn println(&self, message: &str) {
        warn!("{message}");
    }
}

/// Captures lines in memory so tests can assert on server diagnostics.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    /// Returns a copy of everything logged so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

impl Logger for MemoryLogger {
    fn println(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_logger_keeps_lines_in_order() {
        let logger = MemoryLogger::default();
        logger.println("first");
        logger.println("second");
        assert_eq!(logger.lines(), vec!["first", "second"]);
    }
}
