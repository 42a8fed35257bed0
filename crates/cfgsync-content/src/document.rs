//! On-disk representation of one configuration object
//!
//! Each object is stored as a small TOML document:
//!
//! ```toml
//! type = "cms.role"
//! guid = "5b0e8c52-6b1f-4e0b-9a57-1f3a2f8f6c11"
//! code_name = "editor"
//! scope = "corporate"
//!
//! [fields]
//! display_name = "Editor"
//! enabled = true
//!
//! [references]
//! site_id = { type = "cms.site", key = "corporate" }
//! ```
//!
//! Rendering is deterministic: header keys come in a fixed order, fields and
//! references are sorted by name, and nothing time-dependent is written, so
//! storing an unchanged object twice gives byte-identical output.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use cfgsync_meta::FieldValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// File extension of object documents
pub const DOCUMENT_EXTENSION: &str = "toml";

/// A reference to another object by its portable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "type")]
    pub type_name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// The serialized form of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDocument {
    #[serde(rename = "type")]
    pub type_name: String,
    pub guid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceEntry>,
}

impl ObjectDocument {
    pub fn new(type_name: impl Into<String>, guid: Uuid) -> Self {
        Self {
            type_name: type_name.into(),
            guid,
            code_name: None,
            scope: None,
            fields: BTreeMap::new(),
            references: BTreeMap::new(),
        }
    }

    /// Parse a document from its TOML text.
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::parse("TOML", e.message()))
    }

    /// Render the document in canonical form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_pair(&mut out, "type", &string_value(&self.type_name));
        push_pair(&mut out, "guid", &string_value(&self.guid.to_string()));
        if let Some(code_name) = &self.code_name {
            push_pair(&mut out, "code_name", &string_value(code_name));
        }
        if let Some(scope) = &self.scope {
            push_pair(&mut out, "scope", &string_value(scope));
        }

        if !self.fields.is_empty() {
            out.push_str("\n[fields]\n");
            for (name, value) in &self.fields {
                push_pair(&mut out, name, &field_value(value));
            }
        }

        if !self.references.is_empty() {
            out.push_str("\n[references]\n");
            for (name, reference) in &self.references {
                let mut inline = format!(
                    "{{ type = {}, key = {}",
                    string_value(&reference.type_name),
                    string_value(&reference.key)
                );
                if let Some(scope) = &reference.scope {
                    let _ = write!(inline, ", scope = {}", string_value(scope));
                }
                inline.push_str(" }");
                push_pair(&mut out, name, &inline);
            }
        }

        out
    }
}

fn push_pair(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "{} = {}", render_key(key), value);
}

fn render_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        string_value(key)
    }
}

fn string_value(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Bool(v) => toml::Value::Boolean(*v).to_string(),
        FieldValue::Integer(v) => toml::Value::Integer(*v).to_string(),
        FieldValue::Float(v) => toml::Value::Float(*v).to_string(),
        FieldValue::Text(v) => string_value(v),
    }
}
