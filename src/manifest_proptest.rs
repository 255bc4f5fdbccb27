//! Property-based tests for manifest round-trips and name handling.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use crate::manifest::{self, GalaxyInfo, Manifest, Platform};
    use crate::path::{display_relative, ExcludeSet};
    use crate::role::default_prefix;
    use proptest::prelude::*;

    fn platform() -> impl Strategy<Value = Platform> {
        (
            "[A-Z][a-zA-Z]{1,10}",
            prop::collection::vec("[0-9]{1,2}", 0..3),
        )
            .prop_map(|(name, versions)| Platform { name, versions })
    }

    fn manifest() -> impl Strategy<Value = Manifest> {
        (
            prop::option::of("[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}"),
            prop::option::of("[a-z]{1,12}"),
            prop::option::of(prop::collection::vec(platform(), 0..3)),
            prop::collection::btree_map("[a-z_]{1,10}", "[a-z ]{1,20}", 0..4),
            prop::collection::btree_map("[a-z_]{1,10}\\.yml", "[a-z_]{1,10}", 0..3),
            prop::option::of("[a-z]{1,6}_"),
        )
            .prop_map(
                |(version, author, platforms, variables, include_when, prefix)| Manifest {
                    version,
                    galaxy_info: Some(GalaxyInfo {
                        author,
                        platforms,
                        ..GalaxyInfo::default()
                    }),
                    variables: Some(variables),
                    include_when: Some(include_when),
                    prefix,
                    ..Manifest::default()
                },
            )
    }

    // ============================================================================
    // manifest round-trip
    // ============================================================================

    proptest! {
        /// Property: writing then reading a manifest yields the same document
        #[test]
        fn manifest_text_round_trips(doc in manifest()) {
            let text = manifest::to_string(&doc).unwrap();
            let parsed = manifest::parse(&text, Path::new("meta/main.yml")).unwrap();
            prop_assert_eq!(parsed, doc);
        }

        /// Property: unknown top-level keys survive a rewrite
        #[test]
        fn unknown_keys_are_preserved(key in "x_[a-z]{1,8}", value in "[a-z]{1,8}") {
            let mut extra = BTreeMap::new();
            extra.insert(key.clone(), serde_yaml::Value::from(value.clone()));
            let doc = Manifest { extra, ..Manifest::initial() };
            let text = manifest::to_string(&doc).unwrap();
            let parsed = manifest::parse(&text, Path::new("meta/main.yml")).unwrap();
            prop_assert_eq!(parsed.extra.get(&key), Some(&serde_yaml::Value::from(value)));
        }
    }

    // ============================================================================
    // default_prefix
    // ============================================================================

    proptest! {
        /// Property: the derived prefix is lower-case, dash-free and ends with '_'
        #[test]
        fn default_prefix_shape(name in "[A-Za-z][A-Za-z0-9_-]{0,20}") {
            let prefix = default_prefix(&name);
            prop_assert!(prefix.ends_with('_'));
            prop_assert!(!prefix.contains('-'));
            prop_assert_eq!(prefix.to_lowercase(), prefix.clone());
            prop_assert_eq!(prefix.len(), name.len() + 1);
        }
    }

    // ============================================================================
    // exclusion and display
    // ============================================================================

    proptest! {
        /// Property: the default exclusion hides exactly the paths with a hidden component
        #[test]
        fn dot_exclusion_matches_hidden_components(
            parts in prop::collection::vec("\\.?[a-z]{1,8}", 1..4)
        ) {
            let relative = parts.join("/");
            let set = ExcludeSet::from_csv(".*").unwrap();
            let hidden = parts.iter().any(|p| p.starts_with('.'));
            prop_assert_eq!(set.is_excluded(Path::new(&relative)), hidden);
        }

        /// Property: display_relative is stable for already normalized paths
        #[test]
        fn display_relative_identity(parts in prop::collection::vec("[a-z]{1,8}", 1..4)) {
            let relative = parts.join("/");
            prop_assert_eq!(display_relative(Path::new(&relative)), relative);
        }
    }
}
