//! Object type catalog
//!
//! The catalog is the type-catalog provider the engine consumes: it maps
//! type names to descriptors and owns the explicit list of listeners that
//! are told when a custom type's schema changes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

use crate::descriptor::ObjectTypeDescriptor;
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;

/// Callback invoked with the name of a type whose schema changed.
pub type SchemaListener = Box<dyn Fn(&str) + Send + Sync>;

/// Registry of object type descriptors.
///
/// # Example
///
/// ```
/// use cfgsync_meta::{ObjectTypeDescriptor, TypeCatalog};
///
/// let mut catalog = TypeCatalog::new();
/// catalog.register(ObjectTypeDescriptor::new("cms.site"));
/// catalog.register(ObjectTypeDescriptor::new("cms.role").with_reference("site_id", "cms.site"));
///
/// assert!(catalog.get("cms.role").is_ok());
/// assert_eq!(catalog.type_names(), vec!["cms.role", "cms.site"]);
/// ```
#[derive(Default)]
pub struct TypeCatalog {
    descriptors: BTreeMap<String, ObjectTypeDescriptor>,
    listeners: RwLock<Vec<SchemaListener>>,
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read().map(|l| l.len()).unwrap_or(0);
        f.debug_struct("TypeCatalog")
            .field("descriptors", &self.descriptors.keys().collect::<Vec<_>>())
            .field("listeners", &listeners)
            .finish()
    }
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ObjectTypeDescriptor>) -> Self {
        let mut catalog = Self::new();
        for descriptor in descriptors {
            catalog.register(descriptor);
        }
        catalog
    }

    /// Register a descriptor, replacing any previous one with the same name.
    pub fn register(&mut self, descriptor: ObjectTypeDescriptor) {
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a descriptor by type name.
    pub fn get(&self, name: &str) -> Result<&ObjectTypeDescriptor> {
        self.descriptors.get(name).ok_or_else(|| Error::UnknownType {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// All registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ObjectTypeDescriptor> {
        self.descriptors.values()
    }

    /// Descriptors taking part in a run with the given binding option.
    pub fn participating(&self, include_bindings: bool) -> Vec<&ObjectTypeDescriptor> {
        self.descriptors
            .values()
            .filter(|d| d.participates(include_bindings))
            .collect()
    }

    /// Custom types whose schema is defined by objects of `schema_type`.
    pub fn custom_types_of(&self, schema_type: &str) -> Vec<&ObjectTypeDescriptor> {
        self.descriptors
            .values()
            .filter(|d| d.schema_type.as_deref() == Some(schema_type))
            .collect()
    }

    /// Dependency graph over the given descriptors.
    pub fn dependency_graph<'a>(
        &self,
        descriptors: impl IntoIterator<Item = &'a ObjectTypeDescriptor>,
    ) -> DependencyGraph {
        DependencyGraph::from_descriptors(descriptors)
    }

    /// Subscribe to schema changes of custom types.
    pub fn on_schema_changed(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(Box::new(listener)),
            Err(poisoned) => poisoned.into_inner().push(Box::new(listener)),
        }
    }

    /// Synchronously invoke every schema listener for `type_name`.
    ///
    /// Returns the number of listeners invoked.
    pub fn notify_schema_changed(&self, type_name: &str) -> usize {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracing::debug!(type_name, listeners = listeners.len(), "Schema changed");
        for listener in listeners.iter() {
            listener(type_name);
        }
        listeners.len()
    }
}
