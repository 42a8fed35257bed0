//! Bulk serializer: one object type to its repository files

use std::collections::BTreeSet;

use cfgsync_content::{ObjectDocument, ReferenceEntry};
use cfgsync_fs::checksum::Checksum;
use cfgsync_fs::{NormalizedPath, io, list_files};
use cfgsync_meta::{ObjectFilter, ObjectInstance, ObjectKey, ObjectTypeDescriptor};

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::mapper;
use crate::pool::map_parallel;
use crate::summary::{ObjectError, ObjectErrorKind, RunSummary};

/// What happened to one object during a store.
enum StoreOutcome {
    Written(String),
    Unchanged(String),
    /// Skipped; carries the object's path when it could be computed, so its
    /// existing file is not treated as an orphan
    Skipped(ObjectError, Option<String>),
    Cancelled,
}

/// Writes the instances of one type into the repository.
pub struct BulkSerializer<'a> {
    ctx: &'a RunContext,
}

impl<'a> BulkSerializer<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Store every instance of `descriptor` that passes `filter`.
    ///
    /// Instances are written in parallel. With `delete_orphans`, files
    /// under the type's directory that belong to no stored instance are
    /// removed afterwards.
    ///
    /// # Errors
    ///
    /// `Error::Cancelled` when cancellation is observed; files completed
    /// before that point stay in place. Failures of single objects are
    /// recorded in the returned summary instead.
    pub fn store_objects(
        &self,
        descriptor: &ObjectTypeDescriptor,
        filter: &ObjectFilter,
        delete_orphans: bool,
    ) -> Result<RunSummary> {
        self.ctx.cancellation().check()?;
        let span = tracing::info_span!("store", type_name = %descriptor.name);
        let _guard = span.enter();

        let instances = descriptor.enumerate(self.ctx.store(), filter)?;
        tracing::debug!(count = instances.len(), "Enumerated instances");

        let mut summary = RunSummary::new();
        let mut keyed = Vec::with_capacity(instances.len());
        for instance in instances {
            match descriptor.key_of(&instance) {
                Ok(key) => {
                    self.ctx.translation().record(instance.id, key.clone());
                    keyed.push((instance, key));
                }
                Err(e) => summary.record_error(ObjectError::new(
                    &descriptor.name,
                    instance.display_name(),
                    ObjectErrorKind::Configuration,
                    e.to_string(),
                )),
            }
        }

        let outcomes = map_parallel(self.ctx.config().workers, keyed, |(instance, key)| {
            self.store_one(descriptor, &instance, &key)
        });

        let mut kept = BTreeSet::new();
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                StoreOutcome::Written(path) => {
                    summary.stored += 1;
                    kept.insert(path);
                }
                StoreOutcome::Unchanged(path) => {
                    summary.unchanged += 1;
                    kept.insert(path);
                }
                StoreOutcome::Skipped(error, path) => {
                    summary.record_error(error);
                    kept.extend(path);
                }
                StoreOutcome::Cancelled => cancelled = true,
            }
        }
        if cancelled {
            return Err(Error::Cancelled);
        }

        if delete_orphans {
            summary.deleted = self.delete_orphans(descriptor, &kept)?;
        }

        tracing::info!(
            stored = summary.stored,
            unchanged = summary.unchanged,
            deleted = summary.deleted,
            errors = summary.errors.len(),
            "Stored type"
        );
        Ok(summary)
    }

    fn store_one(
        &self,
        descriptor: &ObjectTypeDescriptor,
        instance: &ObjectInstance,
        key: &ObjectKey,
    ) -> StoreOutcome {
        if self.ctx.cancellation().is_cancelled() {
            return StoreOutcome::Cancelled;
        }

        let path = match mapper::to_path(key) {
            Ok(path) => path,
            Err(e) => {
                return StoreOutcome::Skipped(
                    ObjectError::new(
                        &descriptor.name,
                        key.identifier.as_str(),
                        ObjectErrorKind::Configuration,
                        e.to_string(),
                    ),
                    None,
                );
            }
        };

        let document = match self.document(descriptor, instance, key) {
            Ok(document) => document,
            Err(error) => return StoreOutcome::Skipped(error, Some(path)),
        };

        let file = self.ctx.config().root.join(&path);
        match write_if_changed(&file, &document.render()) {
            Ok(true) => {
                tracing::debug!(path = %path, "Wrote object");
                StoreOutcome::Written(path)
            }
            Ok(false) => StoreOutcome::Unchanged(path),
            Err(e) => StoreOutcome::Skipped(
                ObjectError::new(
                    &descriptor.name,
                    key.identifier.as_str(),
                    ObjectErrorKind::Io,
                    e.to_string(),
                ),
                Some(path),
            ),
        }
    }

    /// Build the portable document of an instance.
    fn document(
        &self,
        descriptor: &ObjectTypeDescriptor,
        instance: &ObjectInstance,
        key: &ObjectKey,
    ) -> std::result::Result<ObjectDocument, ObjectError> {
        let object_error = |kind, message: String| {
            ObjectError::new(&descriptor.name, key.identifier.as_str(), kind, message)
        };

        let mut document = ObjectDocument::new(&descriptor.name, instance.guid);
        document.code_name = instance.code_name.clone();
        document.scope = instance.scope.clone();
        document.fields = instance
            .fields
            .iter()
            .filter(|(name, _)| !descriptor.is_excluded_field(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        for (field, &target_id) in &instance.references {
            if descriptor.is_excluded_field(field) {
                continue;
            }
            let reference = descriptor.reference(field).ok_or_else(|| {
                object_error(
                    ObjectErrorKind::Configuration,
                    format!("'{field}' is not a declared reference of {}", descriptor.name),
                )
            })?;
            let target = self
                .resolve_key(&reference.target_type, target_id)
                .map_err(|message| object_error(ObjectErrorKind::ReferenceResolution, message))?;
            document.references.insert(
                field.clone(),
                ReferenceEntry {
                    type_name: target.type_name,
                    key: target.identifier,
                    scope: target.scope,
                },
            );
        }

        Ok(document)
    }

    /// Portable key of a referenced object, via the translation table or
    /// the store.
    fn resolve_key(&self, type_name: &str, id: i64) -> std::result::Result<ObjectKey, String> {
        if let Some(key) = self.ctx.translation().key_of(type_name, id) {
            return Ok(key);
        }
        let target_type = self.ctx.catalog().get(type_name).map_err(|e| e.to_string())?;
        let target = self
            .ctx
            .store()
            .get(type_name, id)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("referenced {type_name} with ID {id} does not exist"))?;
        let key = target_type.key_of(&target).map_err(|e| e.to_string())?;
        self.ctx.translation().record(id, key.clone());
        Ok(key)
    }

    /// Remove files of this type that no stored instance accounts for.
    fn delete_orphans(
        &self,
        descriptor: &ObjectTypeDescriptor,
        kept: &BTreeSet<String>,
    ) -> Result<usize> {
        let root = &self.ctx.config().root;
        let type_dir = mapper::type_dir(&descriptor.name)?;
        let dir = root.join(&type_dir);
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut deleted = 0;
        for relative in list_files(&dir)?.files {
            let path = format!("{type_dir}/{relative}");
            let ours = mapper::from_path(&path)
                .map(|key| key.type_name == descriptor.name)
                .unwrap_or(false);
            if !ours || kept.contains(&path) {
                continue;
            }
            let file = root.join(&path);
            if io::remove_file(&file)? {
                tracing::debug!(path = %path, "Deleted orphaned object file");
                deleted += 1;
            }
            if let Some(parent) = file.parent() {
                io::prune_empty_dirs(&parent, root);
            }
        }
        Ok(deleted)
    }
}

/// Write `content` unless the file already holds exactly that.
///
/// Returns whether the file was written.
fn write_if_changed(file: &NormalizedPath, content: &str) -> cfgsync_fs::Result<bool> {
    if Checksum::of_file(file)? == Some(Checksum::of(content)) {
        return Ok(false);
    }
    io::write_atomic(file, content.as_bytes())?;
    Ok(true)
}
