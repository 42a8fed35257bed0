//! Cancellable batch job
//!
//! A [`BatchJob`] wraps one long-running operation (store-all, restore-all)
//! with a licensing gate, a single-use guard and a structured progress log.
//! Every outcome, including cancellation and licensing failure, comes back
//! as a value.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use cfgsync_meta::{ObjectStore, TypeCatalog};

use crate::cancel::CancellationToken;
use crate::config::RepositoryConfiguration;
use crate::context::RunContext;
use crate::error::Result;
use crate::eventlog::{EventLog, TracingEventLog};
use crate::license::{LicenseCheck, LicenseError};
use crate::manager::RepositoryManager;
use crate::progress::ProgressLog;
use crate::summary::RunSummary;

/// Lifecycle of a job.
///
/// `Created -> Running -> {Completed, Canceled, Failed}`; a licensing
/// failure moves `Created -> Failed` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobStatus {
    Created = 0,
    Running = 1,
    Completed = 2,
    Canceled = 3,
    Failed = 4,
}

impl JobStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Canceled,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How a job run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Completed(T),
    Canceled,
    /// The operation failed; the message is also in the progress log
    Failed(String),
}

impl<T> JobOutcome<T> {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Completed(_) => JobStatus::Completed,
            Self::Canceled => JobStatus::Canceled,
            Self::Failed(_) => JobStatus::Failed,
        }
    }
}

/// Reasons a job refuses to run at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Job '{kind}' cannot run: it is already {status}")]
    InvalidState { kind: String, status: JobStatus },

    #[error(transparent)]
    License(#[from] LicenseError),
}

#[derive(Debug, thiserror::Error)]
#[error("operation panicked: {message}")]
struct Panicked {
    message: String,
}

type Operation<T> = Box<dyn FnOnce(&CancellationToken, Arc<ProgressLog>) -> Result<T> + Send>;

/// Single-use runner for one cancellable operation.
pub struct BatchJob<T> {
    kind: String,
    status: AtomicU8,
    operation: Mutex<Option<Operation<T>>>,
    license: Arc<dyn LicenseCheck>,
    event_log: Arc<dyn EventLog>,
    progress: Arc<ProgressLog>,
}

impl<T> BatchJob<T> {
    /// Create a job running `operation`, gated by `license`.
    ///
    /// The operation receives the run's cancellation token and the job's
    /// progress log. Returning `Error::Cancelled` ends the job as canceled.
    pub fn new<F>(kind: impl Into<String>, license: Arc<dyn LicenseCheck>, operation: F) -> Self
    where
        F: FnOnce(&CancellationToken, Arc<ProgressLog>) -> Result<T> + Send + 'static,
    {
        Self {
            kind: kind.into(),
            status: AtomicU8::new(JobStatus::Created as u8),
            operation: Mutex::new(Some(Box::new(operation))),
            license,
            event_log: Arc::new(TracingEventLog),
            progress: Arc::new(ProgressLog::new()),
        }
    }

    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = event_log;
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressLog>) -> Self {
        self.progress = progress;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn progress(&self) -> &Arc<ProgressLog> {
        &self.progress
    }

    /// Claim the job, moving it out of `Created`.
    fn claim(&self, to: JobStatus) -> std::result::Result<(), JobError> {
        self.status
            .compare_exchange(
                JobStatus::Created as u8,
                to as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(|_| ())
            .map_err(|current| JobError::InvalidState {
                kind: self.kind.clone(),
                status: JobStatus::from_u8(current),
            })
    }

    fn finish(&self, status: JobStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    /// Run the job to completion on the calling thread.
    ///
    /// `token` may be cancelled from any other thread while the job runs.
    ///
    /// # Errors
    ///
    /// `JobError::InvalidState` when the job was run before, and
    /// `JobError::License` when the licensing check fails. In the latter
    /// case the job is marked failed without ever running.
    pub fn run(&self, token: &CancellationToken) -> std::result::Result<JobOutcome<T>, JobError> {
        let status = self.status();
        if status != JobStatus::Created {
            return Err(JobError::InvalidState {
                kind: self.kind.clone(),
                status,
            });
        }

        if let Err(error) = self.license.check_feature_license() {
            self.claim(JobStatus::Failed)?;
            self.progress.error(format!("{}: {error}", self.kind));
            self.event_log.log_exception(&self.kind, "license", &error);
            return Err(error.into());
        }

        self.claim(JobStatus::Running)?;
        let operation = match self.operation.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(operation) = operation else {
            self.finish(JobStatus::Failed);
            return Err(JobError::InvalidState {
                kind: self.kind.clone(),
                status: JobStatus::Failed,
            });
        };

        let span = tracing::info_span!("job", kind = %self.kind);
        let _guard = span.enter();
        self.progress.info(format!("{} started", self.kind));

        let progress = Arc::clone(&self.progress);
        let result = catch_unwind(AssertUnwindSafe(|| operation(token, progress)));
        let outcome = match result {
            Ok(Ok(value)) => {
                self.progress.info(format!("{} completed", self.kind));
                JobOutcome::Completed(value)
            }
            Ok(Err(error)) if error.is_cancelled() => {
                self.progress.info("Operation cancelled");
                JobOutcome::Canceled
            }
            Ok(Err(error)) => {
                self.event_log.log_exception(&self.kind, "failed", &error);
                self.progress.error(format!("{} failed: {error}", self.kind));
                JobOutcome::Failed(error.to_string())
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let error = Panicked { message };
                self.event_log.log_exception(&self.kind, "panic", &error);
                self.progress.error(format!("{} failed: {error}", self.kind));
                JobOutcome::Failed(error.to_string())
            }
        };
        self.finish(outcome.status());
        Ok(outcome)
    }
}

impl<T> std::fmt::Debug for BatchJob<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchJob")
            .field("kind", &self.kind)
            .field("status", &self.status())
            .finish()
    }
}

/// Job storing every participating type into the repository.
pub fn store_all_job(
    config: RepositoryConfiguration,
    catalog: Arc<TypeCatalog>,
    store: Arc<dyn ObjectStore>,
    license: Arc<dyn LicenseCheck>,
) -> BatchJob<RunSummary> {
    BatchJob::new("store-all", license, move |token, progress| {
        let ctx = RunContext::new(config, catalog, store)
            .with_cancellation(token.clone())
            .with_progress(progress);
        RepositoryManager::new(&ctx).store_all()
    })
}

/// Job restoring every participating type from the repository.
pub fn restore_all_job(
    config: RepositoryConfiguration,
    catalog: Arc<TypeCatalog>,
    store: Arc<dyn ObjectStore>,
    license: Arc<dyn LicenseCheck>,
) -> BatchJob<RunSummary> {
    BatchJob::new("restore-all", license, move |token, progress| {
        let ctx = RunContext::new(config, catalog, store)
            .with_cancellation(token.clone())
            .with_progress(progress);
        RepositoryManager::new(&ctx).restore_all()
    })
}
