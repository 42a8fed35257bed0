//! Repository configuration
//!
//! Settings may live in an optional `cfgsync.toml` at the repository root:
//!
//! ```toml
//! include_bindings = true
//! workers = 4
//! delete_orphans = true
//! excluded_types = ["cms.session", "analytics.*"]
//!
//! [object_filters]
//! "cms.user" = ["test_*", "guest"]
//! ```

use std::collections::BTreeMap;

use cfgsync_fs::{ConfigStore, NormalizedPath};
use cfgsync_meta::{ObjectFilter, ObjectTypeDescriptor, wildcard};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the optional settings file at the repository root
pub const CONFIG_FILE_NAME: &str = "cfgsync.toml";

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_true() -> bool {
    true
}

/// Root path and per-run options of a repository.
///
/// Fixed for the duration of a job: the run context owns its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfiguration {
    #[serde(skip, default = "default_root")]
    pub root: NormalizedPath,
    /// Store and restore binding (child/link) types
    #[serde(default)]
    pub include_bindings: bool,
    /// Worker threads for parallel store
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Delete files whose object no longer exists
    #[serde(default = "default_true")]
    pub delete_orphans: bool,
    /// Type names (with `*` wildcards) left out of every run
    #[serde(default)]
    pub excluded_types: Vec<String>,
    /// Type name -> code-name patterns (with `*` wildcards) to skip
    #[serde(default)]
    pub object_filters: BTreeMap<String, Vec<String>>,
}

fn default_root() -> NormalizedPath {
    NormalizedPath::new(".")
}

impl RepositoryConfiguration {
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            include_bindings: false,
            workers: default_workers(),
            delete_orphans: true,
            excluded_types: Vec::new(),
            object_filters: BTreeMap::new(),
        }
    }

    /// Configuration for `root`, reading `cfgsync.toml` there if present.
    pub fn load(root: impl Into<NormalizedPath>) -> Result<Self> {
        let root = root.into();
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::new(root));
        }
        let mut config: Self = ConfigStore::new().load(&path)?;
        tracing::debug!(path = %path, "Loaded repository configuration");
        config.root = root;
        Ok(config)
    }

    pub fn with_bindings(mut self, include: bool) -> Self {
        self.include_bindings = include;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_delete_orphans(mut self, delete: bool) -> Self {
        self.delete_orphans = delete;
        self
    }

    pub fn excluding_type(mut self, pattern: impl Into<String>) -> Self {
        self.excluded_types.push(pattern.into());
        self
    }

    pub fn with_object_filter(
        mut self,
        type_name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        self.object_filters
            .entry(type_name.into())
            .or_default()
            .push(pattern.into());
        self
    }

    /// Whether a type takes part in runs under this configuration.
    pub fn includes(&self, descriptor: &ObjectTypeDescriptor) -> Result<bool> {
        if !descriptor.participates(self.include_bindings) {
            return Ok(false);
        }
        for pattern in &self.excluded_types {
            if wildcard(pattern)?.is_match(&descriptor.name) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Object filter configured for a type.
    pub fn filter_for(&self, type_name: &str) -> Result<ObjectFilter> {
        let mut filter = ObjectFilter::all();
        for pattern in self.object_filters.get(type_name).into_iter().flatten() {
            filter = filter.excluding(pattern)?;
        }
        Ok(filter)
    }
}
