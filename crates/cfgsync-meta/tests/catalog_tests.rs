//! Integration tests for the type catalog, dependency ordering and snapshots

use cfgsync_fs::{ConfigStore, NormalizedPath};
use cfgsync_meta::{
    ConnectionString, Database, DatabaseSnapshot, IdentityKind, ObjectFilter, ObjectInstance,
    ObjectKey, ObjectStore, ObjectTypeDescriptor, TypeCatalog,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

fn cms_catalog() -> TypeCatalog {
    TypeCatalog::from_descriptors([
        ObjectTypeDescriptor::new("cms.site"),
        ObjectTypeDescriptor::new("cms.role").with_reference("site_id", "cms.site"),
        ObjectTypeDescriptor::new("cms.user").with_deferred_reference("default_role_id", "cms.role"),
        ObjectTypeDescriptor::new("cms.userrole")
            .with_identity(IdentityKind::Guid)
            .with_reference("user_id", "cms.user")
            .with_reference("role_id", "cms.role")
            .binding(),
        ObjectTypeDescriptor::new("cms.category")
            .with_reference("parent_id", "cms.category")
            .with_reference("site_id", "cms.site"),
    ])
}

#[test]
fn test_catalog_graph_orders_dependencies_first() {
    let catalog = cms_catalog();
    let graph = catalog.dependency_graph(catalog.participating(true));
    let layers = graph.layers().unwrap();

    assert_eq!(
        layers,
        vec![
            vec!["cms.site".to_string(), "cms.user".to_string()],
            vec!["cms.category".to_string(), "cms.role".to_string()],
            vec!["cms.userrole".to_string()],
        ]
    );
}

#[test]
fn test_bindings_left_out_of_graph_when_excluded() {
    let catalog = cms_catalog();
    let graph = catalog.dependency_graph(catalog.participating(false));

    let order = graph.topological_sort().unwrap();
    assert!(!order.contains(&"cms.userrole".to_string()));
    assert_eq!(graph.node_count(), 4);
}

#[test]
fn test_restore_plan_without_cycles_breaks_nothing() {
    let catalog = cms_catalog();
    let plan = catalog
        .dependency_graph(catalog.participating(true))
        .restore_plan();

    assert!(plan.broken_edges.is_empty());
    assert_eq!(plan.order().len(), 5);
}

#[rstest]
#[case("db.json")]
#[case("db.toml")]
#[case("db.yaml")]
fn test_database_snapshot_formats(#[case] file_name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = NormalizedPath::new(dir.path().join(file_name));
    let site_guid = Uuid::new_v4();

    let snapshot = DatabaseSnapshot {
        types: cms_catalog().descriptors().cloned().collect(),
        objects: vec![
            // ordered the way the store lists them: by type, then ID
            ObjectInstance::new("cms.role", Uuid::new_v4())
                .with_id(2)
                .with_code_name("editor")
                .with_scope("corporate")
                .with_reference("site_id", 1),
            ObjectInstance::new("cms.site", site_guid)
                .with_id(1)
                .with_code_name("corporate")
                .with_field("display_name", "Corporate site")
                .with_field("enabled", true),
        ],
    };
    ConfigStore::new().save(&path, &snapshot).unwrap();

    let db = Database::open(&ConnectionString::parse(path.as_str()).unwrap()).unwrap();
    assert_eq!(db.snapshot().unwrap(), snapshot);

    let role_type = db.catalog().get("cms.role").unwrap().clone();
    let key = ObjectKey::new("cms.role", Some("corporate".into()), "editor");
    let role = db.store().find(&role_type, &key).unwrap().unwrap();
    assert_eq!(role.references.get("site_id"), Some(&1));
}

#[test]
fn test_descriptor_enumerates_through_store() {
    let catalog = cms_catalog();
    let db = Database::from_snapshot(
        NormalizedPath::new("unused.json"),
        None,
        DatabaseSnapshot {
            types: Vec::new(),
            objects: vec![
                ObjectInstance::new("cms.site", Uuid::new_v4()).with_code_name("corporate"),
                ObjectInstance::new("cms.site", Uuid::new_v4()).with_code_name("test_site"),
                ObjectInstance::new("cms.role", Uuid::new_v4()).with_code_name("admin"),
            ],
        },
    )
    .unwrap();
    let store = db.store();

    let sites = catalog
        .get("cms.site")
        .unwrap()
        .enumerate(&*store, &ObjectFilter::all().excluding("test_*").unwrap())
        .unwrap();

    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].code_name.as_deref(), Some("corporate"));
}
