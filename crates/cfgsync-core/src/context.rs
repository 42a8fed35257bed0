//! Run context
//!
//! Everything one store or restore run needs, constructed when the run
//! starts and dropped when it ends. Nothing here is process-global.

use std::sync::Arc;

use cfgsync_meta::{ObjectStore, ObjectTypeDescriptor, TypeCatalog};

use crate::cancel::CancellationToken;
use crate::config::RepositoryConfiguration;
use crate::error::Result;
use crate::progress::ProgressLog;
use crate::translation::TranslationTable;

pub struct RunContext {
    config: RepositoryConfiguration,
    catalog: Arc<TypeCatalog>,
    store: Arc<dyn ObjectStore>,
    translation: TranslationTable,
    cancel: CancellationToken,
    progress: Arc<ProgressLog>,
}

impl RunContext {
    pub fn new(
        config: RepositoryConfiguration,
        catalog: Arc<TypeCatalog>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            catalog,
            store,
            translation: TranslationTable::new(),
            cancel: CancellationToken::new(),
            progress: Arc::new(ProgressLog::new()),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressLog>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &RepositoryConfiguration {
        &self.config
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn translation(&self) -> &TranslationTable {
        &self.translation
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    /// Types taking part in this run, sorted by name.
    pub fn participating_types(&self) -> Result<Vec<&ObjectTypeDescriptor>> {
        let mut types = Vec::new();
        for descriptor in self.catalog.descriptors() {
            if self.config.includes(descriptor)? {
                types.push(descriptor);
            }
        }
        Ok(types)
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("root", &self.config.root)
            .field("types", &self.catalog.type_names().len())
            .field("translations", &self.translation.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
