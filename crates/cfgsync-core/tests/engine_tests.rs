//! Store and restore runs against the sample catalog

use std::sync::{Arc, Mutex};

use cfgsync_content::{CompareOptions, compare_directories};
use cfgsync_core::{
    CancellationToken, Error, ObjectErrorKind, RepositoryConfiguration, RepositoryManager,
    RunContext,
};
use cfgsync_meta::{
    FieldValue, MemoryStore, ObjectInstance, ObjectStore, ObjectTypeDescriptor, TypeCatalog,
};
use cfgsync_test_utils::catalog::{
    CATEGORY, FORM, PRODUCT, ROLE, SITE, USER, WORKFLOW, WORKFLOW_STEP, guid, sample_catalog,
    sample_objects, sample_store, without_excluded_fields,
};
use cfgsync_test_utils::repo::TestRepo;
use cfgsync_test_utils::store::{ObservedStore, StoreCall};
use pretty_assertions::assert_eq;

fn config(repo: &TestRepo) -> RepositoryConfiguration {
    RepositoryConfiguration::new(repo.normalized_root()).with_workers(4)
}

fn store_into(config: RepositoryConfiguration, store: Arc<dyn ObjectStore>) {
    let ctx = RunContext::new(config, Arc::new(sample_catalog()), store);
    let summary = RepositoryManager::new(&ctx).store_all().unwrap();
    assert!(summary.is_clean(), "{:?}", summary.errors);
}

fn stored_sample(repo: &TestRepo) {
    store_into(config(repo), Arc::new(sample_store()));
}

/// Object with the given type and code name.
fn object(store: &MemoryStore, type_name: &str, code_name: &str) -> ObjectInstance {
    store
        .objects()
        .unwrap()
        .into_iter()
        .find(|o| o.type_name == type_name && o.code_name.as_deref() == Some(code_name))
        .unwrap_or_else(|| panic!("no {type_name} '{code_name}'"))
}

#[test]
fn test_store_all_writes_one_file_per_object() {
    let repo = TestRepo::new();
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), Arc::new(sample_store()));

    let summary = RepositoryManager::new(&ctx).store_all().unwrap();

    assert_eq!(summary.stored, 11);
    assert!(summary.is_clean());
    assert_eq!(
        repo.files(),
        vec![
            "cms.category/news.toml",
            "cms.category/sports.toml",
            "cms.form/custom.product.toml",
            "cms.role/@main/admin.toml",
            "cms.role/@main/editor.toml",
            "cms.site/main.toml",
            "cms.user/alice.toml",
            "cms.user/bob.toml",
            "cms.workflow/publish.toml",
            "cms.workflowstep/review.toml",
            "custom.product/widget.toml",
        ]
    );
}

#[test]
fn test_stored_documents_use_portable_keys() {
    let repo = TestRepo::new();
    stored_sample(&repo);

    repo.assert_file_contains(
        "cms.role/@main/admin.toml",
        "site_id = { type = \"cms.site\", key = \"main\" }",
    );
    repo.assert_file_contains(
        "cms.category/sports.toml",
        "parent_id = { type = \"cms.category\", key = \"news\" }",
    );
    repo.assert_file_contains("cms.site/main.toml", &format!("guid = \"{}\"", guid(1)));

    // Excluded fields and database IDs never reach the repository
    assert!(!repo.read("cms.user/alice.toml").contains("password_hash"));
    assert!(!repo.read("cms.site/main.toml").contains("last_modified"));
    assert!(!repo.read("cms.category/sports.toml").contains("= 7"));
}

#[test]
fn test_store_is_idempotent() {
    let first = TestRepo::new();
    let second = TestRepo::new();
    stored_sample(&first);
    stored_sample(&second);

    let issues = compare_directories(
        &first.normalized_root(),
        &second.normalized_root(),
        &CompareOptions::default(),
    )
    .unwrap();
    assert_eq!(issues, vec![]);

    let ctx = RunContext::new(config(&first), Arc::new(sample_catalog()), Arc::new(sample_store()));
    let again = RepositoryManager::new(&ctx).store_all().unwrap();
    assert_eq!(again.stored, 0);
    assert_eq!(again.unchanged, 11);
    assert_eq!(again.deleted, 0);
}

#[test]
fn test_round_trip_through_empty_database() {
    let original = TestRepo::new();
    stored_sample(&original);

    let restored = Arc::new(MemoryStore::new());
    let ctx = RunContext::new(config(&original), Arc::new(sample_catalog()), restored.clone());
    let summary = RepositoryManager::new(&ctx).restore_all().unwrap();
    assert!(summary.is_clean(), "{:?}", summary.errors);
    assert_eq!(summary.restored, 11);
    assert_eq!(summary.patched, 2);

    let copy = TestRepo::new();
    store_into(config(&copy), restored.clone());
    let issues = compare_directories(
        &original.normalized_root(),
        &copy.normalized_root(),
        &CompareOptions::default(),
    )
    .unwrap();
    assert_eq!(issues, vec![]);

    // References point at the new IDs
    let news = object(&restored, CATEGORY, "news");
    let sports = object(&restored, CATEGORY, "sports");
    assert_eq!(sports.references["parent_id"], news.id);
    let publish = object(&restored, WORKFLOW, "publish");
    let review = object(&restored, WORKFLOW_STEP, "review");
    assert_eq!(publish.references["first_step_id"], review.id);
    assert_eq!(review.references["workflow_id"], publish.id);
}

#[test]
fn test_restore_follows_dependency_order() {
    let repo = TestRepo::new();
    stored_sample(&repo);

    let visited = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&visited);
    let store = ObservedStore::new(Arc::new(MemoryStore::new()), move |call| {
        if let StoreCall::Save(type_name) = call {
            let mut seen = seen.lock().unwrap();
            if seen.last() != Some(type_name) {
                seen.push(type_name.clone());
            }
        }
    });
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), Arc::new(store));
    RepositoryManager::new(&ctx).restore_all().unwrap();

    let order = visited.lock().unwrap().clone();
    let position = |name: &str| order.iter().position(|t| t == name).unwrap();
    assert!(position(SITE) < position(ROLE));
    assert!(position(SITE) < position(CATEGORY));
    assert!(position(WORKFLOW) < position(WORKFLOW_STEP));
    // Custom types wait for their schema
    assert_eq!(order.last().map(String::as_str), Some(PRODUCT));
    assert!(position(FORM) < position(PRODUCT));
}

#[test]
fn test_restore_updates_existing_objects_in_place() {
    let repo = TestRepo::new();
    stored_sample(&repo);
    let edited = repo
        .read("cms.user/alice.toml")
        .replace("alice@example.com", "alice@corp.example.com");
    repo.write("cms.user/alice.toml", &edited);

    let store = Arc::new(sample_store());
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), store.clone());
    let summary = RepositoryManager::new(&ctx).restore_all().unwrap();
    assert!(summary.is_clean(), "{:?}", summary.errors);

    let alice = object(&store, USER, "alice");
    assert_eq!(alice.id, 4);
    assert_eq!(
        alice.fields["email"],
        FieldValue::Text("alice@corp.example.com".into())
    );
    // Never serialized, so never overwritten
    assert_eq!(alice.fields["password_hash"], FieldValue::Text("x1y2z3".into()));
    assert_eq!(store.len(), sample_objects().len());
}

#[test]
fn test_restore_leaves_unrepresented_objects_alone() {
    let repo = TestRepo::new();
    stored_sample(&repo);
    std::fs::remove_file(repo.root().join("cms.user/bob.toml")).unwrap();

    let store = Arc::new(sample_store());
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), store.clone());
    RepositoryManager::new(&ctx).restore_all().unwrap();

    assert_eq!(object(&store, USER, "bob").id, 5);
}

#[test]
fn test_restored_objects_match_original() {
    let repo = TestRepo::new();
    stored_sample(&repo);

    let store = Arc::new(MemoryStore::new());
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), store.clone());
    RepositoryManager::new(&ctx).restore_all().unwrap();

    let expected = without_excluded_fields(sample_objects());
    for original in expected.iter().filter(|o| o.code_name.is_some()) {
        let code_name = original.code_name.as_deref().unwrap();
        let restored = object(&store, &original.type_name, code_name);
        assert_eq!(restored.guid, original.guid);
        assert_eq!(restored.scope, original.scope);
        assert_eq!(restored.fields, original.fields, "{code_name}");
    }
}

#[test]
fn test_child_with_absent_parent_yields_one_reference_error() {
    let catalog = TypeCatalog::from_descriptors([
        ObjectTypeDescriptor::new("test.parent"),
        ObjectTypeDescriptor::new("test.child").with_reference("parent_id", "test.parent"),
    ]);
    let repo = TestRepo::new();
    repo.write(
        "test.child/c1.toml",
        &format!(
            "type = \"test.child\"\nguid = \"{}\"\ncode_name = \"c1\"\n\n[references]\nparent_id = {{ type = \"test.parent\", key = \"p1\" }}\n",
            guid(100)
        ),
    );

    let store = Arc::new(MemoryStore::new());
    let ctx = RunContext::new(config(&repo), Arc::new(catalog), store.clone());
    let summary = RepositoryManager::new(&ctx).restore_all().unwrap();

    assert_eq!(summary.restored, 0);
    assert_eq!(summary.errors.len(), 1);
    let error = &summary.errors[0];
    assert_eq!(error.kind, ObjectErrorKind::ReferenceResolution);
    assert_eq!(error.type_name, "test.child");
    assert_eq!(error.object, "c1");
    assert!(store.is_empty());
}

#[test]
fn test_custom_types_notify_schema_listeners() {
    let repo = TestRepo::new();
    stored_sample(&repo);

    let catalog = sample_catalog();
    let notified = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notified);
    catalog.on_schema_changed(move |type_name| sink.lock().unwrap().push(type_name.to_string()));

    let store = Arc::new(MemoryStore::new());
    let ctx = RunContext::new(config(&repo), Arc::new(catalog), store.clone());
    RepositoryManager::new(&ctx).restore_all().unwrap();

    assert_eq!(*notified.lock().unwrap(), vec![PRODUCT.to_string()]);
    assert_eq!(object(&store, PRODUCT, "widget").fields["price"], FieldValue::Float(9.5));
}

#[test]
fn test_custom_type_without_schema_object_is_skipped() {
    let repo = TestRepo::new();
    stored_sample(&repo);
    std::fs::remove_file(repo.root().join("cms.form/custom.product.toml")).unwrap();

    let store = Arc::new(MemoryStore::new());
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), store.clone());
    let summary = RepositoryManager::new(&ctx).restore_all().unwrap();

    let errors: Vec<_> = summary.errors_of(ObjectErrorKind::Configuration).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].type_name, PRODUCT);
    assert_eq!(summary.restored, 9);
}

#[test]
fn test_orphaned_files_are_deleted() {
    let repo = TestRepo::new();
    stored_sample(&repo);
    repo.write("cms.user/carol.toml", "type = \"cms.user\"\n");
    repo.write("cms.user/notes.txt", "kept");

    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), Arc::new(sample_store()));
    let summary = RepositoryManager::new(&ctx).store_all().unwrap();

    assert_eq!(summary.deleted, 1);
    repo.assert_file_not_exists("cms.user/carol.toml");
    repo.assert_file_exists("cms.user/notes.txt");
}

#[test]
fn test_orphans_kept_when_deletion_disabled() {
    let repo = TestRepo::new();
    stored_sample(&repo);
    repo.write("cms.role/@other/ghost.toml", "type = \"cms.role\"\n");

    store_into(config(&repo).with_delete_orphans(false), Arc::new(sample_store()));
    repo.assert_file_exists("cms.role/@other/ghost.toml");

    stored_sample(&repo);
    repo.assert_file_not_exists("cms.role/@other/ghost.toml");
    // Emptied scope directories are pruned
    assert!(!repo.root().join("cms.role/@other").exists());
}

#[test]
fn test_object_filters_and_excluded_types() {
    let repo = TestRepo::new();
    let config = config(&repo)
        .with_object_filter(USER, "b*")
        .excluding_type("cms.work*");
    store_into(config, Arc::new(sample_store()));

    repo.assert_file_exists("cms.user/alice.toml");
    repo.assert_file_not_exists("cms.user/bob.toml");
    assert!(!repo.root().join("cms.workflow").exists());
    assert!(!repo.root().join("cms.workflowstep").exists());
}

#[test]
fn test_bindings_are_stored_only_when_included() {
    let repo = TestRepo::new();
    stored_sample(&repo);
    assert!(!repo.root().join("cms.userrole").exists());

    store_into(config(&repo).with_bindings(true), Arc::new(sample_store()));
    let path = format!("cms.userrole/{}.toml", guid(6));
    repo.assert_file_contains(&path, "user_id = { type = \"cms.user\", key = \"alice\" }");
    repo.assert_file_contains(
        &path,
        "role_id = { type = \"cms.role\", key = \"admin\", scope = \"main\" }",
    );
}

#[test]
fn test_unresolvable_reference_skips_only_that_object() {
    let repo = TestRepo::new();
    let store = sample_store();
    store
        .save(
            ObjectInstance::new(ROLE, guid(50))
                .with_code_name("ghost")
                .with_scope("main")
                .with_reference("site_id", 999),
        )
        .unwrap();

    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), Arc::new(store));
    let summary = RepositoryManager::new(&ctx).store_all().unwrap();

    assert_eq!(summary.stored, 11);
    let errors: Vec<_> = summary.errors_of(ObjectErrorKind::ReferenceResolution).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].object, "ghost");
    repo.assert_file_not_exists("cms.role/@main/ghost.toml");
}

#[test]
fn test_store_stops_at_cancellation() {
    let repo = TestRepo::new();
    let token = CancellationToken::new();
    let trigger = token.clone();
    let store = ObservedStore::new(Arc::new(sample_store()), move |call| {
        if *call == StoreCall::Enumerate(ROLE.to_string()) {
            trigger.cancel();
        }
    });
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), Arc::new(store))
        .with_cancellation(token);

    let err = RepositoryManager::new(&ctx).store_all().unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    repo.assert_file_exists("cms.site/main.toml");
    repo.assert_file_not_exists("cms.role/@main/admin.toml");
    assert!(!repo.root().join("cms.workflow").exists());
    assert!(repo.files().iter().all(|f| !f.ends_with(".tmp")));
}

#[test]
fn test_restore_stops_at_cancellation() {
    let repo = TestRepo::new();
    stored_sample(&repo);

    let token = CancellationToken::new();
    let trigger = token.clone();
    let inner = Arc::new(MemoryStore::new());
    let store = ObservedStore::new(inner.clone(), move |call| {
        if *call == StoreCall::Save(ROLE.to_string()) {
            trigger.cancel();
        }
    });
    let ctx = RunContext::new(config(&repo), Arc::new(sample_catalog()), Arc::new(store))
        .with_cancellation(token);

    let err = RepositoryManager::new(&ctx).restore_all().unwrap_err();

    assert!(err.is_cancelled());
    let objects = inner.objects().unwrap();
    assert_eq!(objects.iter().filter(|o| o.type_name == ROLE).count(), 1);
    assert!(objects.iter().all(|o| o.type_name != WORKFLOW_STEP));
}
