//! File-backed database snapshots
//!
//! A snapshot file holds the type descriptors and the object instances of a
//! database. The format is picked from the file extension by
//! [`ConfigStore`].

use std::sync::Arc;

use cfgsync_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::catalog::TypeCatalog;
use crate::connection::ConnectionString;
use crate::descriptor::ObjectTypeDescriptor;
use crate::error::Result;
use crate::object::ObjectInstance;
use crate::store::MemoryStore;

/// Serialized form of a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    #[serde(default)]
    pub types: Vec<ObjectTypeDescriptor>,
    #[serde(default)]
    pub objects: Vec<ObjectInstance>,
}

/// An opened database: catalog plus object store, backed by a snapshot file.
#[derive(Debug)]
pub struct Database {
    path: NormalizedPath,
    license: Option<String>,
    catalog: Arc<TypeCatalog>,
    store: Arc<MemoryStore>,
}

impl Database {
    /// Open the snapshot named by a connection string.
    pub fn open(connection: &ConnectionString) -> Result<Self> {
        let path = NormalizedPath::new(&connection.source);
        let snapshot: DatabaseSnapshot = ConfigStore::new().load(&path)?;
        tracing::debug!(
            path = %path,
            types = snapshot.types.len(),
            objects = snapshot.objects.len(),
            "Opened database snapshot"
        );
        Self::from_snapshot(path, connection.license.clone(), snapshot)
    }

    pub fn from_snapshot(
        path: NormalizedPath,
        license: Option<String>,
        snapshot: DatabaseSnapshot,
    ) -> Result<Self> {
        Ok(Self {
            path,
            license,
            catalog: Arc::new(TypeCatalog::from_descriptors(snapshot.types)),
            store: Arc::new(MemoryStore::from_objects(snapshot.objects)?),
        })
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    pub fn catalog(&self) -> Arc<TypeCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Current contents as a snapshot.
    pub fn snapshot(&self) -> Result<DatabaseSnapshot> {
        Ok(DatabaseSnapshot {
            types: self.catalog.descriptors().cloned().collect(),
            objects: self.store.objects()?,
        })
    }

    /// Write the current contents back to the snapshot file.
    pub fn save(&self) -> Result<()> {
        let snapshot = self.snapshot()?;
        ConfigStore::new().save(&self.path, &snapshot)?;
        tracing::debug!(path = %self.path, objects = snapshot.objects.len(), "Saved database snapshot");
        Ok(())
    }
}
