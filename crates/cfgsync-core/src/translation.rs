//! Translation between database IDs and portable keys
//!
//! The table is the one piece of shared mutable state during a run. It is
//! append-mostly and backed by concurrent maps so that parallel store
//! workers can record references without a global lock.

use cfgsync_meta::ObjectKey;
use dashmap::DashMap;

/// Run-scoped bidirectional map `(type, id) <-> ObjectKey`.
#[derive(Debug, Default)]
pub struct TranslationTable {
    keys: DashMap<(String, i64), ObjectKey>,
    ids: DashMap<ObjectKey, i64>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that object `id` of `key.type_name` has `key`.
    ///
    /// A later record for the same ID or key replaces the earlier one.
    pub fn record(&self, id: i64, key: ObjectKey) {
        if let Some(old) = self.keys.insert((key.type_name.clone(), id), key.clone())
            && old != key
        {
            self.ids.remove(&old);
        }
        self.ids.insert(key, id);
    }

    pub fn key_of(&self, type_name: &str, id: i64) -> Option<ObjectKey> {
        self.keys
            .get(&(type_name.to_string(), id))
            .map(|entry| entry.value().clone())
    }

    pub fn id_of(&self, key: &ObjectKey) -> Option<i64> {
        self.ids.get(key).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
