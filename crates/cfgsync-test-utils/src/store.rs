//! Object store wrapper for observing engine calls.

use std::sync::Arc;

use cfgsync_meta::{
    MemoryStore, ObjectFilter, ObjectInstance, ObjectKey, ObjectStore, ObjectTypeDescriptor,
    Result,
};

/// One call made through an [`ObservedStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Enumerate(String),
    Save(String),
}

type Hook = Box<dyn Fn(&StoreCall) + Send + Sync>;

/// Delegates to a [`MemoryStore`] and runs a hook before each enumerate
/// and save.
///
/// Lets tests cancel a run at a precise point, or record the order in
/// which types were visited.
pub struct ObservedStore {
    inner: Arc<MemoryStore>,
    hook: Hook,
}

impl ObservedStore {
    pub fn new(inner: Arc<MemoryStore>, hook: impl Fn(&StoreCall) + Send + Sync + 'static) -> Self {
        Self {
            inner,
            hook: Box::new(hook),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryStore> {
        &self.inner
    }
}

impl ObjectStore for ObservedStore {
    fn enumerate(
        &self,
        descriptor: &ObjectTypeDescriptor,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectInstance>> {
        (self.hook)(&StoreCall::Enumerate(descriptor.name.clone()));
        self.inner.enumerate(descriptor, filter)
    }

    fn get(&self, type_name: &str, id: i64) -> Result<Option<ObjectInstance>> {
        self.inner.get(type_name, id)
    }

    fn find(
        &self,
        descriptor: &ObjectTypeDescriptor,
        key: &ObjectKey,
    ) -> Result<Option<ObjectInstance>> {
        self.inner.find(descriptor, key)
    }

    fn save(&self, instance: ObjectInstance) -> Result<i64> {
        (self.hook)(&StoreCall::Save(instance.type_name.clone()));
        self.inner.save(instance)
    }

    fn set_reference(
        &self,
        type_name: &str,
        id: i64,
        field: &str,
        target: Option<i64>,
    ) -> Result<()> {
        self.inner.set_reference(type_name, id, field, target)
    }
}
