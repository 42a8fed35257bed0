//! Sample type catalog and database contents.
//!
//! The catalog models a small CMS:
//!
//! | type | notes |
//! |---|---|
//! | `cms.site` | root type, excludes `last_modified` |
//! | `cms.role` | scoped by site, references `cms.site` |
//! | `cms.user` | excludes `password_hash` |
//! | `cms.userrole` | binding, GUID identity, references user and role |
//! | `cms.category` | self reference `parent_id` |
//! | `cms.workflow` / `cms.workflowstep` | reference each other (cycle) |
//! | `cms.form` | defines the schema of custom types |
//! | `custom.product` | custom type, schema defined by a `cms.form` object |
//!
//! Object IDs and GUIDs are fixed so tests can refer to them.

use cfgsync_meta::{IdentityKind, MemoryStore, ObjectInstance, ObjectTypeDescriptor, TypeCatalog};
use uuid::Uuid;

pub const SITE: &str = "cms.site";
pub const ROLE: &str = "cms.role";
pub const USER: &str = "cms.user";
pub const USER_ROLE: &str = "cms.userrole";
pub const CATEGORY: &str = "cms.category";
pub const WORKFLOW: &str = "cms.workflow";
pub const WORKFLOW_STEP: &str = "cms.workflowstep";
pub const FORM: &str = "cms.form";
pub const PRODUCT: &str = "custom.product";

/// Deterministic GUID for fixture object `n`.
pub fn guid(n: u128) -> Uuid {
    Uuid::from_u128(0x5ee0_0000_0000_4000_8000_0000_0000_0000 | n)
}

/// Descriptors of the sample catalog.
pub fn sample_descriptors() -> Vec<ObjectTypeDescriptor> {
    vec![
        ObjectTypeDescriptor::new(SITE).excluding_field("last_modified"),
        ObjectTypeDescriptor::new(ROLE).with_reference("site_id", SITE),
        ObjectTypeDescriptor::new(USER).excluding_field("password_hash"),
        ObjectTypeDescriptor::new(USER_ROLE)
            .with_identity(IdentityKind::Guid)
            .with_reference("user_id", USER)
            .with_reference("role_id", ROLE)
            .binding(),
        ObjectTypeDescriptor::new(CATEGORY)
            .with_reference("site_id", SITE)
            .with_reference("parent_id", CATEGORY),
        ObjectTypeDescriptor::new(WORKFLOW).with_reference("first_step_id", WORKFLOW_STEP),
        ObjectTypeDescriptor::new(WORKFLOW_STEP).with_reference("workflow_id", WORKFLOW),
        ObjectTypeDescriptor::new(FORM),
        ObjectTypeDescriptor::new(PRODUCT).custom(FORM),
    ]
}

pub fn sample_catalog() -> TypeCatalog {
    TypeCatalog::from_descriptors(sample_descriptors())
}

/// Objects of the sample database, with fixed IDs.
pub fn sample_objects() -> Vec<ObjectInstance> {
    vec![
        ObjectInstance::new(SITE, guid(1))
            .with_id(1)
            .with_code_name("main")
            .with_field("display_name", "Main site")
            .with_field("domain", "www.example.com")
            .with_field("last_modified", "2024-01-01T00:00:00Z"),
        ObjectInstance::new(ROLE, guid(2))
            .with_id(2)
            .with_code_name("admin")
            .with_scope("main")
            .with_field("display_name", "Administrator")
            .with_field("is_global", true)
            .with_reference("site_id", 1),
        ObjectInstance::new(ROLE, guid(3))
            .with_id(3)
            .with_code_name("editor")
            .with_scope("main")
            .with_field("display_name", "Editor")
            .with_field("is_global", false)
            .with_reference("site_id", 1),
        ObjectInstance::new(USER, guid(4))
            .with_id(4)
            .with_code_name("alice")
            .with_field("email", "alice@example.com")
            .with_field("enabled", true)
            .with_field("password_hash", "x1y2z3"),
        ObjectInstance::new(USER, guid(5))
            .with_id(5)
            .with_code_name("bob")
            .with_field("email", "bob@example.com")
            .with_field("enabled", false),
        ObjectInstance::new(USER_ROLE, guid(6))
            .with_id(6)
            .with_reference("user_id", 4)
            .with_reference("role_id", 2),
        ObjectInstance::new(CATEGORY, guid(7))
            .with_id(7)
            .with_code_name("news")
            .with_field("order", 1_i64)
            .with_reference("site_id", 1),
        ObjectInstance::new(CATEGORY, guid(8))
            .with_id(8)
            .with_code_name("sports")
            .with_field("order", 2_i64)
            .with_reference("site_id", 1)
            .with_reference("parent_id", 7),
        ObjectInstance::new(WORKFLOW, guid(9))
            .with_id(9)
            .with_code_name("publish")
            .with_reference("first_step_id", 10),
        ObjectInstance::new(WORKFLOW_STEP, guid(10))
            .with_id(10)
            .with_code_name("review")
            .with_field("order", 1_i64)
            .with_reference("workflow_id", 9),
        ObjectInstance::new(FORM, guid(11))
            .with_id(11)
            .with_code_name(PRODUCT)
            .with_field("fields", "name;price"),
        ObjectInstance::new(PRODUCT, guid(12))
            .with_id(12)
            .with_code_name("widget")
            .with_field("name", "Widget")
            .with_field("price", 9.5),
    ]
}

/// A store holding [`sample_objects`].
pub fn sample_store() -> MemoryStore {
    match MemoryStore::from_objects(sample_objects()) {
        Ok(store) => store,
        Err(e) => panic!("sample_store: {e}"),
    }
}

/// Strip the fields the repository never holds, as declared by
/// [`sample_descriptors`].
///
/// Useful for comparing a restored database against the original.
pub fn without_excluded_fields(objects: Vec<ObjectInstance>) -> Vec<ObjectInstance> {
    let catalog = sample_catalog();
    objects
        .into_iter()
        .map(|mut object| {
            if let Ok(descriptor) = catalog.get(&object.type_name) {
                object
                    .fields
                    .retain(|name, _| !descriptor.is_excluded_field(name));
            }
            object
        })
        .collect()
}
