//! Repository synchronization engine
//!
//! This crate moves configuration objects between an [`ObjectStore`] and a
//! directory tree of object documents, implementing:
//!
//! - **Path mapping**: bijective object key to repository path translation
//! - **Bulk serialization**: parallel store of one type, write-if-changed,
//!   orphan cleanup
//! - **Restore**: dependency-ordered upsert with deferred reference patching
//! - **Repository manager**: store-all and restore-all over the type graph
//! - **Batch jobs**: single-use, licensed, cancellable wrappers with a
//!   progress log
//!
//! # Architecture
//!
//! ```text
//!                  cfgsync-cli
//!                       |
//!                  cfgsync-core
//!                       |
//!     +-----------------+-----------------+
//!     |                 |                 |
//! cfgsync-fs      cfgsync-meta     cfgsync-content
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cfgsync_core::{CancellationToken, LicenseKey, RepositoryConfiguration, store_all_job};
//!
//! let job = store_all_job(
//!     RepositoryConfiguration::load("/srv/repo")?,
//!     database.catalog(),
//!     database.store(),
//!     Arc::new(LicenseKey::new(Some(key))),
//! );
//! let outcome = job.run(&CancellationToken::new())?;
//! ```
//!
//! [`ObjectStore`]: cfgsync_meta::ObjectStore

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod eventlog;
pub mod job;
pub mod license;
pub mod manager;
pub mod mapper;
pub mod pool;
pub mod progress;
pub mod restorer;
pub mod serializer;
pub mod summary;
pub mod translation;

pub use cancel::CancellationToken;
pub use config::{CONFIG_FILE_NAME, RepositoryConfiguration};
pub use context::RunContext;
pub use error::{Error, Result};
pub use eventlog::{EventLog, TracingEventLog};
pub use job::{BatchJob, JobError, JobOutcome, JobStatus, restore_all_job, store_all_job};
pub use license::{LicenseCheck, LicenseError, LicenseKey};
pub use manager::RepositoryManager;
pub use progress::{ProgressEntry, ProgressLevel, ProgressLog};
pub use restorer::{PendingReference, Restorer, StoredDocument};
pub use serializer::BulkSerializer;
pub use summary::{ObjectError, ObjectErrorKind, RunSummary};
pub use translation::TranslationTable;
