//! Object type catalog and data-access capability.
//!
//! This crate describes the configuration objects the engine serializes:
//! the object model, per-type descriptors, the type catalog with its
//! schema-change subscriptions, the dependency graph used to order types,
//! and the [`ObjectStore`] capability through which instances are read and
//! written.

pub mod catalog;
pub mod connection;
pub mod database;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod object;
pub mod store;

pub use catalog::TypeCatalog;
pub use connection::ConnectionString;
pub use database::{Database, DatabaseSnapshot};
pub use descriptor::{IdentityKind, ObjectTypeDescriptor, ReferenceDescriptor};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, RestorePlan};
pub use object::{FieldValue, ObjectInstance, ObjectKey};
pub use store::{MemoryStore, ObjectFilter, ObjectStore, wildcard};
