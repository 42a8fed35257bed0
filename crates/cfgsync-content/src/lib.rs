//! Object documents and repository tree comparison
//!
//! [`ObjectDocument`] is the canonical on-disk form of one configuration
//! object. [`Comparator`] walks two repository trees and reports the
//! differences as [`Issue`]s.

pub mod compare;
pub mod document;
pub mod error;

pub use compare::{Comparator, CompareOptions, Issue, IssueKind, compare_directories};
pub use document::{DOCUMENT_EXTENSION, ObjectDocument, ReferenceEntry};
pub use error::{Error, Result};
