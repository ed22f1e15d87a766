//! Resource map comparison

use crate::resources::{ResourceKey, ResourceMap, ResourceValue};
use std::collections::BTreeMap;

/// Reference and target values of a key the two maps disagree on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub reference: Option<ResourceValue>,
    pub target: Option<ResourceValue>,
}

impl Difference {
    /// Only the target defines this key
    pub fn is_addition(&self) -> bool {
        self.reference.is_none() && self.target.is_some()
    }

    /// Only the reference defines this key
    pub fn is_removal(&self) -> bool {
        self.reference.is_some() && self.target.is_none()
    }

    /// The same difference seen from the other side
    pub fn swapped(&self) -> Self {
        Self {
            reference: self.target.clone(),
            target: self.reference.clone(),
        }
    }
}

/// Differences keyed by resource
pub type Differences = BTreeMap<ResourceKey, Difference>;

/// Every key on which `reference` and `target` disagree
///
/// A key missing from one side differs from any value on the other,
/// including the empty string.
pub fn compare(reference: &ResourceMap, target: &ResourceMap) -> Differences {
    let mut differences = Differences::new();

    for (key, value) in reference {
        match target.get(key) {
            Some(other) if other == value => {}
            other => {
                differences.insert(
                    key.clone(),
                    Difference {
                        reference: Some(value.clone()),
                        target: other.cloned(),
                    },
                );
            }
        }
    }

    for (key, value) in target {
        if !reference.contains_key(key) {
            differences.insert(
                key.clone(),
                Difference {
                    reference: None,
                    target: Some(value.clone()),
                },
            );
        }
    }

    differences
}

/// Target entries whose key the reference also defines
pub fn common(reference: &ResourceMap, target: &ResourceMap) -> ResourceMap {
    target
        .iter()
        .filter(|(key, _)| reference.contains_key(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Target-side values of a difference set
///
/// Keys only the reference defines have nothing to override and are left out.
pub fn overrides(differences: &Differences) -> ResourceMap {
    differences
        .iter()
        .filter_map(|(key, diff)| diff.target.clone().map(|value| (key.clone(), value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{parse_resources, ResourceKind};
    use proptest::prelude::*;

    fn string(name: &str) -> ResourceKey {
        ResourceKey::new(ResourceKind::String, name)
    }

    fn text(value: &str) -> ResourceValue {
        ResourceValue::text(value)
    }

    fn parse(xml: &str) -> ResourceMap {
        parse_resources(xml)
            .unwrap()
            .into_iter()
            .map(|e| (e.key, e.value))
            .collect()
    }

    #[test]
    fn test_scenario_changed_and_added() {
        let reference: ResourceMap = [(string("foo"), text("bar"))].into_iter().collect();
        let target: ResourceMap = [(string("foo"), text("baz")), (string("extra"), text("x"))]
            .into_iter()
            .collect();

        let diff = compare(&reference, &target);
        assert_eq!(diff.len(), 2);
        assert_eq!(
            diff[&string("foo")],
            Difference {
                reference: Some(text("bar")),
                target: Some(text("baz")),
            }
        );
        assert!(diff[&string("extra")].is_addition());
        assert_eq!(diff[&string("extra")].target, Some(text("x")));

        let cleaned = common(&reference, &target);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[&string("foo")], text("baz"));
    }

    #[test]
    fn test_absent_differs_from_empty() {
        let reference: ResourceMap = [(string("a"), text(""))].into_iter().collect();
        let diff = compare(&reference, &ResourceMap::new());
        assert!(diff[&string("a")].is_removal());
    }

    #[test]
    fn test_no_case_coercion_on_values() {
        let key = ResourceKey::new(ResourceKind::Bool, "flag");
        let reference: ResourceMap = [(key.clone(), text("true"))].into_iter().collect();
        let target: ResourceMap = [(key.clone(), text("True"))].into_iter().collect();
        assert!(compare(&reference, &target).contains_key(&key));
    }

    #[test]
    fn test_whitespace_in_values_is_significant() {
        let reference: ResourceMap = parse(r#"<resources><string name="sep">, </string></resources>"#);
        let target: ResourceMap = parse(r#"<resources><string name="SEP">,</string></resources>"#);

        let diff = compare(&reference, &target);
        assert_eq!(
            diff[&string("sep")],
            Difference {
                reference: Some(text(", ")),
                target: Some(text(",")),
            }
        );
        assert_eq!(common(&reference, &target)[&string("sep")], text(","));
    }

    #[test]
    fn test_overrides_drop_removals() {
        let reference: ResourceMap = [(string("gone"), text("x")), (string("same"), text("y"))]
            .into_iter()
            .collect();
        let target: ResourceMap = [(string("same"), text("z"))].into_iter().collect();

        let result = overrides(&compare(&reference, &target));
        assert_eq!(result.len(), 1);
        assert_eq!(result[&string("same")], text("z"));
    }

    fn arb_value() -> impl Strategy<Value = ResourceValue> {
        prop_oneof![
            "[ab]{0,2}".prop_map(ResourceValue::Text),
            prop::collection::vec("[ab]{0,1}", 0..3).prop_map(ResourceValue::Items),
        ]
    }

    fn arb_map() -> impl Strategy<Value = ResourceMap> {
        let key = (0usize..ResourceKind::ALL.len(), "[a-c]{1,2}")
            .prop_map(|(kind, name)| ResourceKey::new(ResourceKind::ALL[kind], &name));
        prop::collection::btree_map(key, arb_value(), 0..8)
    }

    proptest! {
        #[test]
        fn prop_key_in_diff_iff_values_disagree(a in arb_map(), b in arb_map()) {
            let diff = compare(&a, &b);
            for key in a.keys().chain(b.keys()) {
                prop_assert_eq!(diff.contains_key(key), a.get(key) != b.get(key));
            }
            for key in diff.keys() {
                prop_assert!(a.contains_key(key) || b.contains_key(key));
            }
        }

        #[test]
        fn prop_compare_with_self_is_empty(a in arb_map()) {
            prop_assert!(compare(&a, &a).is_empty());
        }

        #[test]
        fn prop_compare_is_symmetric(a in arb_map(), b in arb_map()) {
            let forward = compare(&a, &b);
            let backward = compare(&b, &a);
            prop_assert_eq!(forward.len(), backward.len());
            for (key, diff) in &forward {
                prop_assert_eq!(backward.get(key), Some(&diff.swapped()));
            }
        }

        #[test]
        fn prop_common_is_key_intersection(a in arb_map(), b in arb_map()) {
            let cleaned = common(&a, &b);
            for (key, value) in &cleaned {
                prop_assert!(a.contains_key(key));
                prop_assert_eq!(b.get(key), Some(value));
            }
            let expected = a.keys().filter(|k| b.contains_key(*k)).count();
            prop_assert_eq!(cleaned.len(), expected);
        }
    }
}
