//! Shared test fixtures for the cfgsync workspace.
//!
//! This crate provides standardised fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`catalog`]: a sample type catalog and database covering scoped,
//!   binding, self-referencing, cyclic and custom types
//! - [`repo`]: [`TestRepo`](repo::TestRepo) temporary repository directory
//! - [`store`]: [`ObservedStore`](store::ObservedStore), an object store
//!   wrapper that reports every call

pub mod catalog;
pub mod repo;
pub mod store;
