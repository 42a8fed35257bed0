//! Object type descriptors

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::object::{ObjectInstance, ObjectKey};
use crate::store::{ObjectFilter, ObjectStore};

/// Which property identifies an object portably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    #[default]
    CodeName,
    Guid,
}

/// A reference field pointing at an object of another (or the same) type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    pub field: String,
    pub target_type: String,
    /// Resolved in a second restore pass instead of ordering the types
    #[serde(default)]
    pub deferred: bool,
}

fn default_true() -> bool {
    true
}

/// Metadata for one serializable kind of configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub identity: IdentityKind,
    #[serde(default)]
    pub references: Vec<ReferenceDescriptor>,
    /// Whether the type takes part in repository synchronization at all
    #[serde(default = "default_true")]
    pub eligible: bool,
    /// Binding (child/link) types are only stored when bindings are included
    #[serde(default)]
    pub is_binding: bool,
    /// Transient fields that are never written to the repository
    #[serde(default)]
    pub excluded_fields: Vec<String>,
    /// For custom types: the type whose object (with code name equal to
    /// this type's name) defines this type's schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
}

impl ObjectTypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: IdentityKind::CodeName,
            references: Vec::new(),
            eligible: true,
            is_binding: false,
            excluded_fields: Vec::new(),
            schema_type: None,
        }
    }

    pub fn with_identity(mut self, identity: IdentityKind) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_reference(mut self, field: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.references.push(ReferenceDescriptor {
            field: field.into(),
            target_type: target_type.into(),
            deferred: false,
        });
        self
    }

    pub fn with_deferred_reference(
        mut self,
        field: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        self.references.push(ReferenceDescriptor {
            field: field.into(),
            target_type: target_type.into(),
            deferred: true,
        });
        self
    }

    pub fn binding(mut self) -> Self {
        self.is_binding = true;
        self
    }

    pub fn ineligible(mut self) -> Self {
        self.eligible = false;
        self
    }

    pub fn excluding_field(mut self, field: impl Into<String>) -> Self {
        self.excluded_fields.push(field.into());
        self
    }

    pub fn custom(mut self, schema_type: impl Into<String>) -> Self {
        self.schema_type = Some(schema_type.into());
        self
    }

    /// Whether this type's schema is itself data-defined.
    pub fn is_custom(&self) -> bool {
        self.schema_type.is_some()
    }

    /// Whether instances of this type are synchronized under the given
    /// binding option.
    pub fn participates(&self, include_bindings: bool) -> bool {
        self.eligible && (include_bindings || !self.is_binding)
    }

    /// Types that must be restored before this one.
    ///
    /// Deferred and self references are excluded: they are patched after
    /// the objects exist.
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.references
            .iter()
            .filter(|r| !r.deferred && r.target_type != self.name)
            .map(|r| r.target_type.as_str())
            .collect()
    }

    pub fn reference(&self, field: &str) -> Option<&ReferenceDescriptor> {
        self.references.iter().find(|r| r.field == field)
    }

    pub fn is_excluded_field(&self, field: &str) -> bool {
        self.excluded_fields.iter().any(|f| f == field)
    }

    /// The portable identifier of an instance of this type.
    pub fn identifier_of(&self, instance: &ObjectInstance) -> Result<String> {
        match self.identity {
            IdentityKind::Guid => Ok(instance.guid.to_string()),
            IdentityKind::CodeName => instance
                .code_name
                .clone()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| Error::MissingIdentifier {
                    type_name: self.name.clone(),
                    guid: instance.guid,
                }),
        }
    }

    /// The portable key of an instance of this type.
    pub fn key_of(&self, instance: &ObjectInstance) -> Result<ObjectKey> {
        Ok(ObjectKey::new(
            self.name.clone(),
            instance.scope.clone(),
            self.identifier_of(instance)?,
        ))
    }

    /// Enumerate this type's instances through the data-access capability.
    pub fn enumerate(
        &self,
        store: &dyn ObjectStore,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectInstance>> {
        store.enumerate(self, filter)
    }
}
