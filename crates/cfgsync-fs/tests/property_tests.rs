use cfgsync_fs::NormalizedPath;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_normalization_invariants(s in "\\PC*") {
        let path = NormalizedPath::new(&s);
        let as_str = path.as_str();

        prop_assert!(!as_str.contains('\\'));

        // Only a network prefix may start with a double slash
        let remainder = as_str.strip_prefix("//").unwrap_or(as_str);
        prop_assert!(!remainder.contains("//"));

        // Trailing separators are trimmed except for bare roots
        if as_str.len() > 2 {
            prop_assert!(!as_str.ends_with('/'));
        }

        // Normalization is idempotent through the native form
        let roundtripped = NormalizedPath::new(path.to_native());
        prop_assert_eq!(path, roundtripped);
    }

    #[test]
    fn test_join_properties(a in "\\PC*", b in "[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
        let base = NormalizedPath::new(&a);
        let joined = base.join(&b);

        prop_assert!(!joined.as_str().contains('\\'));
        prop_assert!(joined.as_str().ends_with(&b));
        prop_assert_eq!(joined.relative_to(&base), Some(b.clone()).filter(|_| base.as_str() != "."));
    }

    #[test]
    fn test_join_empty_is_identity(a in "\\PC*") {
        let base = NormalizedPath::new(&a);
        prop_assert_eq!(base.join(""), base.clone());
        prop_assert_eq!(base.join("."), base);
    }
}
