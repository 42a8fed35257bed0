//! Structured progress log of a job

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for ProgressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One progress log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: DateTime<Utc>,
    pub level: ProgressLevel,
    pub message: String,
}

impl fmt::Display for ProgressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// Append-only log shared by a job and its observers.
///
/// Every entry is mirrored to `tracing` at the matching level.
#[derive(Debug, Default)]
pub struct ProgressLog {
    entries: Mutex<Vec<ProgressEntry>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(ProgressLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(ProgressLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(ProgressLevel::Error, message.into());
    }

    fn push(&self, level: ProgressLevel, message: String) {
        match level {
            ProgressLevel::Info => tracing::info!("{message}"),
            ProgressLevel::Warning => tracing::warn!("{message}"),
            ProgressLevel::Error => tracing::error!("{message}"),
        }
        let entry = ProgressEntry {
            timestamp: Utc::now(),
            level,
            message,
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    /// Snapshot of all entries so far.
    pub fn entries(&self) -> Vec<ProgressEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether any entry has the given level.
    pub fn has(&self, level: ProgressLevel) -> bool {
        self.entries().iter().any(|e| e.level == level)
    }
}
