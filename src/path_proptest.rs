//! Property-based tests for path segments, node paths and ordering.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use std::collections::BTreeSet;

    use crate::definition::TreeDefinition;
    use crate::merge::ConfigurationTreeBuilder;
    use crate::ordering::tests::{names, Named};
    use crate::ordering::DependencyOrderer;
    use crate::path::{NodePath, PathSegment};
    use proptest::prelude::*;

    const NAME: &str = "[a-z][a-z0-9:_-]{0,8}";

    // ============================================================================
    // PathSegment property tests
    // ============================================================================

    proptest! {
        /// Property: printing and parsing a segment gives back the same segment
        #[test]
        fn segment_display_round_trips(name in NAME, index in 0usize..50) {
            let segment = PathSegment::new(&name, index).unwrap();
            let parsed = PathSegment::parse(&segment.to_string()).unwrap();
            prop_assert!(parsed.exact_eq(&segment));
        }

        /// Property: force_index and suppress_index never change sibling identity
        #[test]
        fn index_promotion_keeps_identity(name in NAME, index in 0usize..3) {
            let segment = PathSegment::new(&name, index).unwrap();
            prop_assert_eq!(&segment.force_index(), &segment);
            prop_assert_eq!(&segment.suppress_index(), &segment);
            prop_assert!(segment.force_index().index() >= 1);
            prop_assert_ne!(segment.suppress_index().index(), 1);
        }

        /// Property: ordering is by name first, index second
        #[test]
        fn segments_order_by_name_then_index(
            a in NAME,
            b in NAME,
            i in 1usize..10,
            j in 1usize..10,
        ) {
            let left = PathSegment::new(&a, i).unwrap();
            let right = PathSegment::new(&b, j).unwrap();
            let expected = a.cmp(&b).then(i.cmp(&j));
            prop_assert_eq!(left.cmp(&right), expected);
        }

        /// Property: a leading zero or a zero index is always rejected
        #[test]
        fn zero_indices_are_rejected(name in NAME, digits in "0[0-9]{0,3}") {
            let text = format!("{}[{}]", name, digits);
            prop_assert!(PathSegment::parse(&text).is_err());
        }
    }

    // ============================================================================
    // NodePath property tests
    // ============================================================================

    proptest! {
        /// Property: canonical paths survive a print/parse round trip
        #[test]
        fn node_path_round_trips(parts in prop::collection::vec((NAME, 0usize..4), 0..6)) {
            let mut path = NodePath::root();
            for (name, index) in &parts {
                path = path.child(PathSegment::new(name, *index).unwrap());
            }
            let parsed = NodePath::parse(&path.to_string()).unwrap();
            prop_assert_eq!(&parsed, &path);
            prop_assert_eq!(parsed.depth(), parts.len());
        }

        /// Property: every proper prefix of a path is one of its ancestors
        #[test]
        fn parents_are_ancestors(parts in prop::collection::vec(NAME, 1..6)) {
            let path = NodePath::parse(&format!("/{}", parts.join("/"))).unwrap();
            let mut current = path.parent();
            while let Some(ancestor) = current {
                prop_assert!(ancestor.is_ancestor_of(&path));
                prop_assert!(path.starts_with(&ancestor));
                prop_assert!(!path.is_ancestor_of(&ancestor));
                current = ancestor.parent();
            }
        }
    }

    // ============================================================================
    // DependencyOrderer property tests
    // ============================================================================

    /// An acyclic item set: item `i` may only depend on items before it.
    fn acyclic_items() -> impl Strategy<Value = Vec<Named>> {
        prop::collection::btree_set("[a-z]{1,6}", 1..12).prop_flat_map(|set| {
            let names: Vec<String> = set.into_iter().collect();
            let count = names.len();
            prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..3), count)
                .prop_map(move |deps| {
                    names
                        .iter()
                        .enumerate()
                        .map(|(i, name)| {
                            let after: BTreeSet<String> = if i == 0 {
                                BTreeSet::new()
                            } else {
                                deps[i].iter().map(|d| names[d.index(i)].clone()).collect()
                            };
                            Named {
                                name: name.clone(),
                                after,
                            }
                        })
                        .collect()
                })
        })
    }

    proptest! {
        /// Property: the sort result does not depend on the input order
        #[test]
        fn sort_is_deterministic(
            (items, shuffled) in acyclic_items()
                .prop_flat_map(|items| (Just(items.clone()), Just(items).prop_shuffle()))
        ) {
            let mut first = items;
            let mut second = shuffled;
            DependencyOrderer::new("module").sort(&mut first).unwrap();
            DependencyOrderer::new("module").sort(&mut second).unwrap();
            prop_assert_eq!(names(&first), names(&second));
        }

        /// Property: every item comes after all of its dependencies
        #[test]
        fn sort_respects_dependencies(items in acyclic_items()) {
            let mut sorted = items;
            DependencyOrderer::new("module").sort(&mut sorted).unwrap();
            let order = names(&sorted);
            for item in &sorted {
                let position = order.iter().position(|n| *n == item.name).unwrap();
                for dependency in &item.after {
                    let before = order.iter().position(|n| n == dependency).unwrap();
                    prop_assert!(before < position);
                }
            }
        }
    }

    // ============================================================================
    // Same-name sibling property tests
    // ============================================================================

    proptest! {
        /// Property: after deleting any sibling, the rest are numbered 1..N
        #[test]
        fn deleting_a_sibling_keeps_numbering_contiguous(count in 1usize..8, victim in 1usize..8) {
            let victim = victim.min(count);
            let mut builder = ConfigurationTreeBuilder::new();
            let mut def = TreeDefinition::parse("/a").unwrap();
            for index in 1..=count {
                def.root_mut().add_node(&format!("s[{}]", index)).unwrap();
            }
            builder.push_definition("g/p/m", "a.yaml", &def).unwrap();

            let mut delete = TreeDefinition::parse(&format!("/a/s[{}]", victim)).unwrap();
            delete.root_mut().mark_deleted();
            builder.push_definition("g/p/m", "b.yaml", &delete).unwrap();
            let tree = builder.build();

            let a = tree.resolve_node(&NodePath::parse("/a").unwrap()).unwrap();
            let keys: Vec<String> = a.children().map(|(key, _)| key.to_string()).collect();
            let expected: Vec<String> = (1..count).map(|i| format!("s[{}]", i)).collect();
            prop_assert_eq!(keys, expected);
        }
    }
}
