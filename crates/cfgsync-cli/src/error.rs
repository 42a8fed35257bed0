//! Error types for cfgsync-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from cfgsync-core
    #[error(transparent)]
    Core(#[from] cfgsync_core::Error),

    /// Error from cfgsync-meta
    #[error(transparent)]
    Meta(#[from] cfgsync_meta::Error),

    /// Error from cfgsync-content
    #[error(transparent)]
    Content(#[from] cfgsync_content::Error),

    /// Error from cfgsync-fs
    #[error(transparent)]
    Fs(#[from] cfgsync_fs::Error),

    /// The batch job refused to run
    #[error(transparent)]
    Job(#[from] cfgsync_core::JobError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A pipeline stage failed; later stages were not run
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<CliError>,
    },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn stage(stage: &'static str, source: CliError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }
}
