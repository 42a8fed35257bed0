//! Object instances as supplied by the data-access layer

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scalar field value of an object.
///
/// Absent values are represented by the field being missing from
/// [`ObjectInstance::fields`], never by a null variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One configuration object as stored in the database.
///
/// `id` and the values in `references` are database-internal IDs; they are
/// never written to a repository. `id == 0` marks an object not yet saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub type_name: String,
    #[serde(default)]
    pub id: i64,
    pub guid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_name: Option<String>,
    /// Owning site (or other tenant) for scoped objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Reference field name -> database ID of the referenced object
    #[serde(default)]
    pub references: BTreeMap<String, i64>,
}

impl ObjectInstance {
    pub fn new(type_name: impl Into<String>, guid: Uuid) -> Self {
        Self {
            type_name: type_name.into(),
            id: 0,
            guid,
            code_name: None,
            scope: None,
            fields: BTreeMap::new(),
            references: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_code_name(mut self, code_name: impl Into<String>) -> Self {
        self.code_name = Some(code_name.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_reference(mut self, field: impl Into<String>, target_id: i64) -> Self {
        self.references.insert(field.into(), target_id);
        self
    }

    /// Code name if present, otherwise the GUID. Used in log messages.
    pub fn display_name(&self) -> String {
        self.code_name
            .clone()
            .unwrap_or_else(|| self.guid.to_string())
    }
}

/// Portable identity of an object: what the repository uses instead of a
/// database ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Code name or GUID, depending on the type's identity kind
    pub identifier: String,
}

impl ObjectKey {
    pub fn new(
        type_name: impl Into<String>,
        scope: Option<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            scope,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}@{}", self.type_name, self.identifier, scope),
            None => write!(f, "{}:{}", self.type_name, self.identifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_deserialize_to_narrowest_variant() {
        let json = r#"{"a": true, "b": 3, "c": 1.5, "d": "text"}"#;
        let fields: BTreeMap<String, FieldValue> = serde_json::from_str(json).unwrap();

        assert_eq!(fields["a"], FieldValue::Bool(true));
        assert_eq!(fields["b"], FieldValue::Integer(3));
        assert_eq!(fields["c"], FieldValue::Float(1.5));
        assert_eq!(fields["d"], FieldValue::Text("text".into()));
    }

    #[test]
    fn key_display_includes_scope() {
        let key = ObjectKey::new("cms.role", Some("corporate".into()), "editor");
        assert_eq!(key.to_string(), "cms.role:editor@corporate");

        let global = ObjectKey::new("cms.role", None, "admin");
        assert_eq!(global.to_string(), "cms.role:admin");
    }

    #[test]
    fn display_name_falls_back_to_guid() {
        let guid = Uuid::nil();
        let object = ObjectInstance::new("cms.binding", guid);
        assert_eq!(object.display_name(), guid.to_string());
    }
}
