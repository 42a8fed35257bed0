//! Property tests for the repository path mapper

use cfgsync_core::mapper::{escape, from_path, to_path};
use cfgsync_meta::ObjectKey;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,12}",
        "[A-Za-z0-9 ._@%/\\\\:*?\"<>|-]{1,24}",
        "\\PC{1,16}",
        Just("CON".to_string()),
        Just("nul.txt".to_string()),
        Just("..".to_string()),
    ]
}

fn key() -> impl Strategy<Value = ObjectKey> {
    (segment(), proptest::option::of(segment()), segment())
        .prop_map(|(type_name, scope, identifier)| ObjectKey::new(type_name, scope, identifier))
}

proptest! {
    #[test]
    fn from_path_inverts_to_path(key in key()) {
        // Over-long names are rejected, never truncated
        if let Ok(path) = to_path(&key) {
            prop_assert_eq!(from_path(&path).unwrap(), key);
        }
    }

    #[test]
    fn distinct_keys_map_to_distinct_paths(a in key(), b in key()) {
        if let (Ok(pa), Ok(pb)) = (to_path(&a), to_path(&b)) {
            prop_assert_eq!(pa == pb, a == b);
        }
    }

    #[test]
    fn escaped_segments_are_portable(value in segment()) {
        let escaped = escape(&value);
        prop_assert!(escaped.bytes().all(|b| b.is_ascii_alphanumeric() || b"._-%".contains(&b)));
        prop_assert!(!escaped.starts_with('.'));
        prop_assert!(!escaped.ends_with('.'));
    }
}

#[test]
fn over_long_identifier_is_rejected() {
    let key = ObjectKey::new("cms.role", None, "x".repeat(300));
    let err = to_path(&key).unwrap_err();
    assert!(err.to_string().contains("limit"), "{err}");
}

#[test]
fn non_canonical_paths_are_rejected() {
    // Lowercase hex and needless escapes have a canonical twin
    assert!(from_path("cms.role/a%2fb.toml").is_err());
    assert!(from_path("cms.role/%61dmin.toml").is_err());
    assert!(from_path("cms.role/a%2Fb.toml").is_ok());
}
