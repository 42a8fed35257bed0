//! Tests for the object document format

use cfgsync_content::{ObjectDocument, ReferenceEntry};
use cfgsync_meta::FieldValue;
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn editor_role() -> ObjectDocument {
    let mut doc = ObjectDocument::new(
        "cms.role",
        Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
    );
    doc.code_name = Some("editor".into());
    doc.scope = Some("corporate".into());
    doc.fields.insert("enabled".into(), FieldValue::Bool(true));
    doc.fields.insert("display_name".into(), FieldValue::from("Content editor"));
    doc.fields.insert("priority".into(), FieldValue::Integer(10));
    doc.fields.insert("weight".into(), FieldValue::Float(0.5));
    doc.references.insert(
        "site_id".into(),
        ReferenceEntry {
            type_name: "cms.site".into(),
            key: "corporate".into(),
            scope: None,
        },
    );
    doc.references.insert(
        "parent_role_id".into(),
        ReferenceEntry {
            type_name: "cms.role".into(),
            key: "author".into(),
            scope: Some("corporate".into()),
        },
    );
    doc
}

#[test]
fn test_render_is_canonical() {
    insta::assert_snapshot!(editor_role().render(), @r#"
    type = "cms.role"
    guid = "550e8400-e29b-41d4-a716-446655440000"
    code_name = "editor"
    scope = "corporate"

    [fields]
    display_name = "Content editor"
    enabled = true
    priority = 10
    weight = 0.5

    [references]
    parent_role_id = { type = "cms.role", key = "author", scope = "corporate" }
    site_id = { type = "cms.site", key = "corporate" }
    "#);
}

#[test]
fn test_render_then_parse_preserves_document() {
    let doc = editor_role();
    let parsed = ObjectDocument::parse(&doc.render()).unwrap();
    assert_eq!(parsed, doc);
}

#[test]
fn test_render_is_independent_of_insertion_order() {
    let mut a = ObjectDocument::new("cms.site", Uuid::nil());
    a.fields.insert("b".into(), FieldValue::Integer(2));
    a.fields.insert("a".into(), FieldValue::Integer(1));

    let mut b = ObjectDocument::new("cms.site", Uuid::nil());
    b.fields.insert("a".into(), FieldValue::Integer(1));
    b.fields.insert("b".into(), FieldValue::Integer(2));

    assert_eq!(a.render(), b.render());
}

#[test]
fn test_text_needing_escapes_survives() {
    let mut doc = ObjectDocument::new("cms.setting", Uuid::nil());
    doc.code_name = Some("odd key".into());
    doc.fields.insert(
        "value".into(),
        FieldValue::from("line one\nline \"two\"\t'quoted'\\"),
    );
    doc.fields.insert("with space".into(), FieldValue::from(""));

    let parsed = ObjectDocument::parse(&doc.render()).unwrap();
    assert_eq!(parsed, doc);
}

#[test]
fn test_parse_hand_written_document() {
    let source = r#"
type = "cms.site"
guid = "550e8400-e29b-41d4-a716-446655440000"
code_name = "corporate"

[fields]
domain = "example.com"
"#;
    let doc = ObjectDocument::parse(source).unwrap();
    assert_eq!(doc.type_name, "cms.site");
    assert_eq!(doc.code_name.as_deref(), Some("corporate"));
    assert!(doc.scope.is_none());
    assert!(doc.references.is_empty());
    assert_eq!(
        doc.fields.get("domain"),
        Some(&FieldValue::Text("example.com".into()))
    );
}
