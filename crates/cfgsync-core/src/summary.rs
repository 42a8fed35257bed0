//! Per-run counters and object-scoped errors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a failure scoped to one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectErrorKind {
    /// Identifier cannot be mapped, descriptor or schema missing, document
    /// inconsistent with its location
    Configuration,
    /// A reference could not be resolved to an existing object
    ReferenceResolution,
    /// The object document could not be parsed
    Serialization,
    /// Reading or writing the object's file failed
    Io,
}

impl fmt::Display for ObjectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::ReferenceResolution => "reference resolution",
            Self::Serialization => "serialization",
            Self::Io => "I/O",
        };
        f.write_str(label)
    }
}

/// A failure that skipped one object without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectError {
    pub type_name: String,
    /// Code name, GUID or repository path of the object
    pub object: String,
    pub kind: ObjectErrorKind,
    pub message: String,
}

impl ObjectError {
    pub fn new(
        type_name: impl Into<String>,
        object: impl Into<String>,
        kind: ObjectErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            object: object.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}': {} error: {}",
            self.type_name, self.object, self.kind, self.message
        )
    }
}

/// Outcome counters of a store or restore run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Files written with new content
    pub stored: usize,
    /// Files whose content was already up to date
    pub unchanged: usize,
    /// Orphaned files removed
    pub deleted: usize,
    /// Objects created or updated in the database
    pub restored: usize,
    /// Deferred references patched after all objects existed
    pub patched: usize,
    pub errors: Vec<ObjectError>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&mut self, error: ObjectError) {
        tracing::warn!(
            type_name = %error.type_name,
            object = %error.object,
            kind = %error.kind,
            "Skipped object: {}",
            error.message
        );
        self.errors.push(error);
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.stored += other.stored;
        self.unchanged += other.unchanged;
        self.deleted += other.deleted;
        self.restored += other.restored;
        self.patched += other.patched;
        self.errors.extend(other.errors);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_of(&self, kind: ObjectErrorKind) -> impl Iterator<Item = &ObjectError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stored, {} unchanged, {} deleted, {} restored, {} patched, {} errors",
            self.stored,
            self.unchanged,
            self.deleted,
            self.restored,
            self.patched,
            self.errors.len()
        )
    }
}
