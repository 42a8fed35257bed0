//! Event-log capability

use std::error::Error as StdError;

/// Sink for failures that end a job.
pub trait EventLog: Send + Sync {
    fn log_exception(&self, source: &str, code: &str, error: &dyn StdError);
}

/// Writes events as `tracing` errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn log_exception(&self, source: &str, code: &str, error: &dyn StdError) {
        let mut chain = error.to_string();
        let mut cause = error.source();
        while let Some(inner) = cause {
            chain.push_str(": ");
            chain.push_str(&inner.to_string());
            cause = inner.source();
        }
        tracing::error!(source, code, "{chain}");
    }
}
