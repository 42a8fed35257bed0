//! Restore of one object type from its repository files

use std::collections::{BTreeMap, BTreeSet};

use cfgsync_content::ObjectDocument;
use cfgsync_fs::{io, list_files};
use cfgsync_meta::{IdentityKind, ObjectInstance, ObjectKey, ObjectTypeDescriptor};

use crate::context::RunContext;
use crate::error::Result;
use crate::mapper;
use crate::summary::{ObjectError, ObjectErrorKind, RunSummary};

/// A reference that is set only after every object has been restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    pub type_name: String,
    pub object_id: i64,
    /// Display name of the referencing object
    pub object: String,
    pub field: String,
    pub target: ObjectKey,
}

/// A parsed object document together with its repository path.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub path: String,
    pub key: ObjectKey,
    pub document: ObjectDocument,
}

/// Reads object documents of one type and upserts them into the store.
pub struct Restorer<'a> {
    ctx: &'a RunContext,
}

impl<'a> Restorer<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Read and validate every document of a type, ordered by path.
    ///
    /// Files that cannot be read, parsed or matched to their location are
    /// returned as errors; hidden files are ignored.
    pub fn read_documents(
        &self,
        descriptor: &ObjectTypeDescriptor,
    ) -> Result<(Vec<StoredDocument>, Vec<ObjectError>)> {
        let root = &self.ctx.config().root;
        let type_dir = mapper::type_dir(&descriptor.name)?;
        let dir = root.join(&type_dir);
        if !dir.is_dir() {
            return Ok((Vec::new(), Vec::new()));
        }

        let listing = list_files(&dir)?;
        let mut documents = Vec::new();
        let mut errors: Vec<ObjectError> = listing
            .unreadable
            .into_iter()
            .map(|(path, reason)| {
                ObjectError::new(
                    &descriptor.name,
                    format!("{type_dir}/{path}"),
                    ObjectErrorKind::Io,
                    reason,
                )
            })
            .collect();

        for relative in listing.files {
            if relative.rsplit('/').next().is_some_and(|name| name.starts_with('.')) {
                continue;
            }
            let path = format!("{type_dir}/{relative}");
            match self.read_document(descriptor, &path) {
                Ok(document) => documents.push(document),
                Err(error) => errors.push(error),
            }
        }
        Ok((documents, errors))
    }

    fn read_document(
        &self,
        descriptor: &ObjectTypeDescriptor,
        path: &str,
    ) -> std::result::Result<StoredDocument, ObjectError> {
        let error = |kind, message: String| ObjectError::new(&descriptor.name, path, kind, message);

        let key = mapper::from_path(path)
            .map_err(|e| error(ObjectErrorKind::Configuration, e.to_string()))?;
        let text = io::read_text(&self.ctx.config().root.join(path))
            .map_err(|e| error(ObjectErrorKind::Io, e.to_string()))?;
        let document = ObjectDocument::parse(&text)
            .map_err(|e| error(ObjectErrorKind::Serialization, e.to_string()))?;

        let identifier = match descriptor.identity {
            IdentityKind::CodeName => document.code_name.clone(),
            IdentityKind::Guid => Some(document.guid.to_string()),
        };
        let consistent = document.type_name == descriptor.name
            && key.type_name == descriptor.name
            && document.scope == key.scope
            && identifier.as_deref() == Some(key.identifier.as_str());
        if !consistent {
            return Err(error(
                ObjectErrorKind::Configuration,
                "document contents do not match its location".to_string(),
            ));
        }

        Ok(StoredDocument {
            path: path.to_string(),
            key,
            document,
        })
    }

    /// Restore every document of a type.
    ///
    /// References in `deferred` are not resolved now; they are appended to
    /// `pending` for [`Restorer::patch_references`].
    ///
    /// # Errors
    ///
    /// `Error::Cancelled` between objects once cancellation is requested,
    /// or a store failure. Unresolvable references and bad documents are
    /// recorded per object in the summary.
    pub fn restore_objects(
        &self,
        descriptor: &ObjectTypeDescriptor,
        deferred: &BTreeSet<String>,
        pending: &mut Vec<PendingReference>,
    ) -> Result<RunSummary> {
        self.ctx.cancellation().check()?;
        let span = tracing::info_span!("restore", type_name = %descriptor.name);
        let _guard = span.enter();

        let (documents, errors) = self.read_documents(descriptor)?;
        let mut summary = RunSummary::new();
        for error in errors {
            summary.record_error(error);
        }

        for stored in documents {
            self.ctx.cancellation().check()?;
            match self.restore_one(descriptor, &stored, deferred)? {
                Ok(mut deferred_refs) => {
                    summary.restored += 1;
                    pending.append(&mut deferred_refs);
                }
                Err(error) => summary.record_error(error),
            }
        }

        tracing::info!(
            restored = summary.restored,
            errors = summary.errors.len(),
            "Restored type"
        );
        Ok(summary)
    }

    /// Upsert one object. The outer result carries store failures, the
    /// inner one object-scoped problems.
    fn restore_one(
        &self,
        descriptor: &ObjectTypeDescriptor,
        stored: &StoredDocument,
        deferred: &BTreeSet<String>,
    ) -> Result<std::result::Result<Vec<PendingReference>, ObjectError>> {
        let document = &stored.document;
        let object = stored.key.identifier.as_str();
        let error = |kind, message: String| ObjectError::new(&descriptor.name, object, kind, message);

        let mut references = BTreeMap::new();
        let mut later = Vec::new();
        for (field, entry) in &document.references {
            let Some(declared) = descriptor.reference(field) else {
                return Ok(Err(error(
                    ObjectErrorKind::Configuration,
                    format!("'{field}' is not a declared reference of {}", descriptor.name),
                )));
            };
            if declared.target_type != entry.type_name {
                return Ok(Err(error(
                    ObjectErrorKind::Configuration,
                    format!(
                        "reference '{field}' points at {} but {} is declared",
                        entry.type_name, declared.target_type
                    ),
                )));
            }

            let target = ObjectKey::new(&entry.type_name, entry.scope.clone(), &entry.key);
            if deferred.contains(field) {
                later.push((field.clone(), target));
                continue;
            }
            match self.resolve_id(&target)? {
                Some(id) => {
                    references.insert(field.clone(), id);
                }
                None => {
                    return Ok(Err(error(
                        ObjectErrorKind::ReferenceResolution,
                        format!("reference '{field}' to {target} could not be resolved"),
                    )));
                }
            }
        }

        let existing = self.ctx.store().find(descriptor, &stored.key)?;

        let mut instance = ObjectInstance::new(&descriptor.name, document.guid);
        instance.code_name = document.code_name.clone();
        instance.scope = document.scope.clone();
        instance.fields = document.fields.clone();
        instance.references = references;
        if let Some(existing) = existing {
            instance.id = existing.id;
            // Values the repository never holds, and deferred references
            // not yet patched, keep their database state
            for (name, value) in existing.fields {
                if descriptor.is_excluded_field(&name) {
                    instance.fields.insert(name, value);
                }
            }
            for (name, id) in existing.references {
                if descriptor.is_excluded_field(&name) || deferred.contains(&name) {
                    instance.references.entry(name).or_insert(id);
                }
            }
        }

        let id = self.ctx.store().save(instance)?;
        self.ctx.translation().record(id, stored.key.clone());
        tracing::debug!(object, id, "Restored object");

        Ok(Ok(later
            .into_iter()
            .map(|(field, target)| PendingReference {
                type_name: descriptor.name.clone(),
                object_id: id,
                object: object.to_string(),
                field,
                target,
            })
            .collect()))
    }

    /// Database ID of the object with `key`, via the translation table or
    /// the store.
    fn resolve_id(&self, key: &ObjectKey) -> Result<Option<i64>> {
        if let Some(id) = self.ctx.translation().id_of(key) {
            return Ok(Some(id));
        }
        let Ok(descriptor) = self.ctx.catalog().get(&key.type_name) else {
            return Ok(None);
        };
        let found = self.ctx.store().find(descriptor, key)?;
        Ok(found.map(|object| {
            self.ctx.translation().record(object.id, key.clone());
            object.id
        }))
    }

    /// Set references deferred during restore.
    pub fn patch_references(&self, pending: Vec<PendingReference>) -> Result<RunSummary> {
        let mut summary = RunSummary::new();
        for reference in pending {
            self.ctx.cancellation().check()?;
            match self.resolve_id(&reference.target)? {
                Some(target_id) => {
                    self.ctx.store().set_reference(
                        &reference.type_name,
                        reference.object_id,
                        &reference.field,
                        Some(target_id),
                    )?;
                    summary.patched += 1;
                }
                None => summary.record_error(ObjectError::new(
                    &reference.type_name,
                    reference.object.as_str(),
                    ObjectErrorKind::ReferenceResolution,
                    format!(
                        "deferred reference '{}' to {} could not be resolved",
                        reference.field, reference.target
                    ),
                )),
            }
        }
        Ok(summary)
    }
}
