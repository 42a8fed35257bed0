//! Filesystem layer for the configuration repository engine
//!
//! Provides normalized paths, atomic locked writes, deterministic tree
//! walking and format-agnostic loading of configuration and snapshot files.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod walk;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::NormalizedPath;
pub use walk::{FileListing, list_files};
