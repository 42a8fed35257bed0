//! Data-access capability and an in-memory implementation

use std::collections::BTreeMap;
use std::sync::RwLock;

use regex::Regex;

use crate::descriptor::{IdentityKind, ObjectTypeDescriptor};
use crate::error::{Error, Result};
use crate::object::{ObjectInstance, ObjectKey};

/// Predicate restricting which instances of a type are enumerated.
///
/// Patterns match the object's code name (or GUID for objects without
/// one); `*` matches any run of characters.
#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    scope: Option<String>,
    excluded: Vec<Regex>,
}

impl ObjectFilter {
    /// A filter that accepts every instance.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to objects of one scope.
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Exclude objects whose identifier matches a wildcard pattern.
    pub fn excluding(mut self, pattern: &str) -> Result<Self> {
        self.excluded.push(wildcard(pattern)?);
        Ok(self)
    }

    pub fn matches(&self, instance: &ObjectInstance) -> bool {
        if let Some(scope) = &self.scope
            && instance.scope.as_ref() != Some(scope)
        {
            return false;
        }
        let identifier = instance.display_name();
        !self.excluded.iter().any(|re| re.is_match(&identifier))
    }
}

/// Compile a pattern where `*` matches any run of characters and everything
/// else matches literally.
pub fn wildcard(pattern: &str) -> Result<Regex> {
    let source = format!(
        "^{}$",
        pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*")
    );
    Regex::new(&source).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Data-access capability consumed by the engine.
///
/// Implementations must be safe to call from several worker threads.
pub trait ObjectStore: Send + Sync {
    /// Instances of a type that pass the filter, in a stable order.
    fn enumerate(
        &self,
        descriptor: &ObjectTypeDescriptor,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectInstance>>;

    /// Look up an instance by database ID.
    fn get(&self, type_name: &str, id: i64) -> Result<Option<ObjectInstance>>;

    /// Look up an instance by portable key.
    fn find(&self, descriptor: &ObjectTypeDescriptor, key: &ObjectKey)
    -> Result<Option<ObjectInstance>>;

    /// Insert (`id == 0`) or update an instance. Returns its database ID.
    fn save(&self, instance: ObjectInstance) -> Result<i64>;

    /// Set or clear one reference field of a stored instance.
    fn set_reference(&self, type_name: &str, id: i64, field: &str, target: Option<i64>)
    -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<(String, i64), ObjectInstance>,
    next_id: i64,
}

/// Thread-safe in-memory [`ObjectStore`].
///
/// Backs the CLI's snapshot databases and the test suites.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given objects. Objects keep their IDs;
    /// objects with `id == 0` get fresh ones.
    pub fn from_objects(objects: impl IntoIterator<Item = ObjectInstance>) -> Result<Self> {
        let store = Self::new();
        for object in objects {
            store.save(object)?;
        }
        Ok(store)
    }

    /// All objects, ordered by type name then ID.
    pub fn objects(&self) -> Result<Vec<ObjectInstance>> {
        let state = self.state.read().map_err(|_| Error::StorePoisoned)?;
        Ok(state.objects.values().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn enumerate(
        &self,
        descriptor: &ObjectTypeDescriptor,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectInstance>> {
        let state = self.state.read().map_err(|_| Error::StorePoisoned)?;
        Ok(state
            .objects
            .values()
            .filter(|o| o.type_name == descriptor.name && filter.matches(o))
            .cloned()
            .collect())
    }

    fn get(&self, type_name: &str, id: i64) -> Result<Option<ObjectInstance>> {
        let state = self.state.read().map_err(|_| Error::StorePoisoned)?;
        Ok(state.objects.get(&(type_name.to_string(), id)).cloned())
    }

    fn find(
        &self,
        descriptor: &ObjectTypeDescriptor,
        key: &ObjectKey,
    ) -> Result<Option<ObjectInstance>> {
        let state = self.state.read().map_err(|_| Error::StorePoisoned)?;
        Ok(state
            .objects
            .values()
            .find(|o| {
                o.type_name == key.type_name
                    && o.scope == key.scope
                    && match descriptor.identity {
                        IdentityKind::CodeName => {
                            o.code_name.as_deref() == Some(key.identifier.as_str())
                        }
                        IdentityKind::Guid => o.guid.to_string() == key.identifier,
                    }
            })
            .cloned())
    }

    fn save(&self, mut instance: ObjectInstance) -> Result<i64> {
        let mut state = self.state.write().map_err(|_| Error::StorePoisoned)?;
        if instance.id == 0 {
            state.next_id += 1;
            instance.id = state.next_id;
        } else {
            state.next_id = state.next_id.max(instance.id);
        }
        let id = instance.id;
        state
            .objects
            .insert((instance.type_name.clone(), id), instance);
        Ok(id)
    }

    fn set_reference(
        &self,
        type_name: &str,
        id: i64,
        field: &str,
        target: Option<i64>,
    ) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::StorePoisoned)?;
        let object = state
            .objects
            .get_mut(&(type_name.to_string(), id))
            .ok_or_else(|| Error::ObjectNotFound {
                type_name: type_name.to_string(),
                id,
            })?;
        match target {
            Some(target) => object.references.insert(field.to_string(), target),
            None => object.references.remove(field),
        };
        Ok(())
    }
}
