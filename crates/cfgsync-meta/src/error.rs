//! Error types for cfgsync-meta

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] cfgsync_fs::Error),

    #[error("Unknown object type: {name}")]
    UnknownType { name: String },

    #[error("Object {guid} of type {type_name} has no code name")]
    MissingIdentifier { type_name: String, guid: uuid::Uuid },

    #[error("Dependency cycle between types: {}", participants.join(", "))]
    DependencyCycle { participants: Vec<String> },

    #[error("Invalid object filter pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid connection string: {message}")]
    InvalidConnectionString { message: String },

    #[error("Object {id} of type {type_name} not found")]
    ObjectNotFound { type_name: String, id: i64 },

    #[error("Object store lock poisoned")]
    StorePoisoned,
}
