//! Error types for cfgsync-core

/// Result type for cfgsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a store or restore run.
///
/// Problems scoped to a single object never surface here; they are
/// collected as [`ObjectError`](crate::ObjectError)s in the run summary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The run observed its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// An identifier or path does not fit the repository layout
    #[error("Invalid repository path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Repository configuration is unusable
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from cfgsync-fs
    #[error(transparent)]
    Fs(#[from] cfgsync_fs::Error),

    /// Catalog or data-access error from cfgsync-meta
    #[error(transparent)]
    Meta(#[from] cfgsync_meta::Error),

    /// Document or comparison error from cfgsync-content
    #[error(transparent)]
    Content(#[from] cfgsync_content::Error),
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
