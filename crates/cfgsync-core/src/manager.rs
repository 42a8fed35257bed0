//! Repository manager: store or restore every participating type
//!
//! Both directions walk the types in dependency-first layers computed by
//! [`DependencyGraph::restore_plan`](cfgsync_meta::DependencyGraph::restore_plan).
//! Store runs the types of a layer concurrently; restore is strictly
//! sequential so that database IDs are assigned deterministically.
//!
//! Restore runs in two passes. Types whose schema is data-defined (custom
//! types), and every type depending on one, wait for the second pass: by
//! then the objects defining their schema have been restored, schema
//! listeners have been notified and the types can be filled. References
//! that cannot be ordered (declared deferred, self references and edges
//! dropped to break cycles) are patched after both passes.

use std::collections::{BTreeSet, HashSet};

use cfgsync_meta::{ObjectFilter, ObjectTypeDescriptor, RestorePlan};

use crate::context::RunContext;
use crate::error::Result;
use crate::pool::map_parallel;
use crate::restorer::Restorer;
use crate::serializer::BulkSerializer;
use crate::summary::{ObjectError, ObjectErrorKind, RunSummary};

/// Drives full store and restore runs over a [`RunContext`].
pub struct RepositoryManager<'a> {
    ctx: &'a RunContext,
}

impl<'a> RepositoryManager<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    fn plan(&self) -> Result<(Vec<&'a ObjectTypeDescriptor>, RestorePlan)> {
        let types = self.ctx.participating_types()?;
        let plan = self
            .ctx
            .catalog()
            .dependency_graph(types.iter().copied())
            .restore_plan();
        Ok((types, plan))
    }

    /// Serialize every participating type into the repository.
    pub fn store_all(&self) -> Result<RunSummary> {
        let (types, plan) = self.plan()?;
        let config = self.ctx.config();
        self.ctx.progress().info(format!(
            "Storing {} object types into {}",
            types.len(),
            config.root
        ));

        let mut summary = RunSummary::new();
        for layer in &plan.layers {
            self.ctx.cancellation().check()?;
            let descriptors = layer
                .iter()
                .map(|name| self.ctx.catalog().get(name))
                .collect::<cfgsync_meta::Result<Vec<_>>>()?;

            let store_type = |descriptor: &ObjectTypeDescriptor| -> Result<RunSummary> {
                let filter = config.filter_for(&descriptor.name)?;
                let stored = BulkSerializer::new(self.ctx).store_objects(
                    descriptor,
                    &filter,
                    config.delete_orphans,
                )?;
                self.ctx
                    .progress()
                    .info(format!("Stored {}: {stored}", descriptor.name));
                Ok(stored)
            };
            let results = map_parallel(config.workers, descriptors, store_type);
            for result in results {
                summary.merge(result?);
            }
        }

        self.ctx.progress().info(format!("Store finished: {summary}"));
        Ok(summary)
    }

    /// Recreate or update database objects from the repository.
    ///
    /// Objects present in the database but absent from the repository are
    /// left untouched.
    pub fn restore_all(&self) -> Result<RunSummary> {
        let (types, plan) = self.plan()?;
        self.ctx.progress().info(format!(
            "Restoring {} object types from {}",
            types.len(),
            self.ctx.config().root
        ));

        let (first_pass, second_pass) = self.split_passes(&plan)?;
        let restorer = Restorer::new(self.ctx);
        let mut pending = Vec::new();
        let mut summary = RunSummary::new();

        for descriptor in first_pass {
            self.ctx.cancellation().check()?;
            let deferred = deferred_fields(descriptor, &plan);
            let restored = restorer.restore_objects(descriptor, &deferred, &mut pending)?;
            self.ctx
                .progress()
                .info(format!("Restored {}: {restored}", descriptor.name));
            summary.merge(restored);
        }

        for descriptor in second_pass {
            self.ctx.cancellation().check()?;
            if let Some(reason) = self.schema_missing(descriptor)? {
                self.ctx
                    .progress()
                    .warn(format!("Skipping {}: {reason}", descriptor.name));
                summary.merge(self.skip_type(&restorer, descriptor, &reason)?);
                continue;
            }
            if descriptor.is_custom() {
                self.ctx.catalog().notify_schema_changed(&descriptor.name);
            }
            let deferred = deferred_fields(descriptor, &plan);
            let restored = restorer.restore_objects(descriptor, &deferred, &mut pending)?;
            self.ctx
                .progress()
                .info(format!("Restored {}: {restored}", descriptor.name));
            summary.merge(restored);
        }

        self.ctx.cancellation().check()?;
        if !pending.is_empty() {
            let patched = restorer.patch_references(pending)?;
            self.ctx
                .progress()
                .info(format!("Patched {} deferred references", patched.patched));
            summary.merge(patched);
        }

        self.ctx.progress().info(format!("Restore finished: {summary}"));
        Ok(summary)
    }

    /// Split the plan order into the two restore passes.
    fn split_passes(
        &self,
        plan: &RestorePlan,
    ) -> Result<(Vec<&'a ObjectTypeDescriptor>, Vec<&'a ObjectTypeDescriptor>)> {
        let mut first = Vec::new();
        let mut second = Vec::new();
        let mut late: HashSet<&str> = HashSet::new();

        for name in plan.order() {
            let descriptor = self.ctx.catalog().get(&name)?;
            let waits = descriptor.is_custom()
                || descriptor
                    .references
                    .iter()
                    .any(|r| late.contains(r.target_type.as_str()));
            if waits {
                late.insert(descriptor.name.as_str());
                second.push(descriptor);
            } else {
                first.push(descriptor);
            }
        }
        Ok((first, second))
    }

    /// Why a second-pass type cannot be restored yet, if it cannot.
    fn schema_missing(&self, descriptor: &ObjectTypeDescriptor) -> Result<Option<String>> {
        let Some(schema_type) = &descriptor.schema_type else {
            return Ok(None);
        };
        let Ok(schema_descriptor) = self.ctx.catalog().get(schema_type) else {
            return Ok(Some(format!("schema type {schema_type} is not registered")));
        };
        let defined = schema_descriptor
            .enumerate(self.ctx.store(), &ObjectFilter::all())?
            .iter()
            .any(|object| object.code_name.as_deref() == Some(descriptor.name.as_str()));
        Ok((!defined).then(|| {
            format!(
                "schema object {schema_type}:{} has not been restored",
                descriptor.name
            )
        }))
    }

    /// Record every document of a type that cannot be restored.
    fn skip_type(
        &self,
        restorer: &Restorer<'_>,
        descriptor: &ObjectTypeDescriptor,
        reason: &str,
    ) -> Result<RunSummary> {
        let (documents, errors) = restorer.read_documents(descriptor)?;
        let mut summary = RunSummary::new();
        for error in errors {
            summary.record_error(error);
        }
        for stored in documents {
            summary.record_error(ObjectError::new(
                &descriptor.name,
                stored.key.identifier,
                ObjectErrorKind::Configuration,
                reason,
            ));
        }
        Ok(summary)
    }
}

/// Reference fields of a type resolved only after all objects exist.
fn deferred_fields(descriptor: &ObjectTypeDescriptor, plan: &RestorePlan) -> BTreeSet<String> {
    descriptor
        .references
        .iter()
        .filter(|r| {
            r.deferred
                || r.target_type == descriptor.name
                || plan.is_broken(&descriptor.name, &r.target_type)
        })
        .map(|r| r.field.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_meta::DependencyGraph;

    #[test]
    fn deferred_fields_cover_declared_self_and_broken_edges() {
        let descriptor = ObjectTypeDescriptor::new("b")
            .with_reference("c_id", "c")
            .with_reference("parent_id", "b")
            .with_deferred_reference("owner_id", "site")
            .with_reference("site_id", "site");

        let mut graph = DependencyGraph::new();
        graph.add_node("site");
        graph.add_edge("b", "c");
        graph.add_edge("c", "b");
        graph.add_edge("b", "site");
        let plan = graph.restore_plan();

        let fields: Vec<_> = deferred_fields(&descriptor, &plan).into_iter().collect();
        assert_eq!(fields, vec!["c_id", "owner_id", "parent_id"]);
    }
}
