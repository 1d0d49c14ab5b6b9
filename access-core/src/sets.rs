//! Set operations over access-list identifiers.
//!
//! Inputs are plain slices that may contain duplicates. Every result is
//! deduplicated and sorted so callers and tests can compare them directly.

use std::collections::{BTreeMap, BTreeSet};

fn to_set<S: AsRef<str>>(items: &[S]) -> BTreeSet<&str> {
    items.iter().map(AsRef::as_ref).collect()
}

fn to_vec(set: BTreeSet<&str>) -> Vec<String> {
    set.into_iter().map(str::to_string).collect()
}

/// Identifiers present in both `a` and `b`.
pub fn intersection<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    let right = to_set(b);
    to_vec(to_set(a).into_iter().filter(|id| right.contains(id)).collect())
}

/// Identifiers of `a` missing from `b`.
///
/// An empty `a` gives an empty result and an empty `b` gives `a` itself.
pub fn difference<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    if a.is_empty() {
        return Vec::new();
    }
    if b.is_empty() {
        return to_vec(to_set(a));
    }

    let right = to_set(b);
    to_vec(to_set(a).into_iter().filter(|id| !right.contains(id)).collect())
}

pub fn union<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    let mut all = to_set(a);
    all.extend(b.iter().map(AsRef::as_ref));
    to_vec(all)
}

/// Elements of `b` whose key also appears in `a`.
///
/// The element is taken from `b` so the result reflects the remote side
/// when `b` is what the service returned. One element per key, ordered by key.
pub fn intersection_by_key<T, K, F>(a: &[T], b: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let wanted: BTreeSet<K> = a.iter().map(&key).collect();
    let mut kept = BTreeMap::new();
    for item in b {
        let item_key = key(item);
        if wanted.contains(&item_key) {
            kept.entry(item_key).or_insert_with(|| item.clone());
        }
    }
    kept.into_values().collect()
}

/// Elements of `a` that are missing from `b` or differ from their counterpart.
///
/// `same` decides whether two elements with the same key carry the same
/// assignment. One element per key, ordered by key.
pub fn difference_by<T, K, F, E>(a: &[T], b: &[T], key: F, same: E) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
    E: Fn(&T, &T) -> bool,
{
    let existing: BTreeMap<K, &T> = b.iter().map(|item| (key(item), item)).collect();
    let mut changed = BTreeMap::new();
    for item in a {
        let item_key = key(item);
        let unchanged = existing
            .get(&item_key)
            .is_some_and(|counterpart| same(item, counterpart));
        if !unchanged {
            changed.entry(item_key).or_insert_with(|| item.clone());
        }
    }
    changed.into_values().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn intersection_keeps_shared_ids_once() {
        let result = intersection(&["g3", "g1", "g2", "g1"], &["g2", "g1", "g9"]);
        assert_eq!(result, ids(&["g1", "g2"]));
    }

    #[test]
    fn difference_special_cases() {
        let empty: [&str; 0] = [];
        assert!(difference(&empty, &["a"]).is_empty());
        assert_eq!(difference(&["b", "a", "b"], &empty), ids(&["a", "b"]));
        assert_eq!(difference(&["a", "b", "c"], &["b"]), ids(&["a", "c"]));
    }

    #[test]
    fn union_merges_and_sorts() {
        assert_eq!(union(&["c", "a"], &["b", "a"]), ids(&["a", "b", "c"]));
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: &'static str,
        policy: Option<&'static str>,
    }

    fn entry(id: &'static str, policy: Option<&'static str>) -> Entry {
        Entry { id, policy }
    }

    #[test]
    fn keyed_intersection_takes_elements_from_right() {
        let declared = vec![entry("g1", Some("local")), entry("g2", None)];
        let remote = vec![entry("g2", Some("remote")), entry("g5", None)];

        let kept = intersection_by_key(&declared, &remote, |item| item.id);
        assert_eq!(kept, vec![entry("g2", Some("remote"))]);
    }

    #[test]
    fn keyed_difference_reports_missing_and_changed() {
        let wanted = vec![
            entry("g1", Some("p1")),
            entry("g2", Some("p2")),
            entry("g3", None),
        ];
        let remote = vec![entry("g1", Some("P1")), entry("g2", Some("other"))];

        let changed = difference_by(
            &wanted,
            &remote,
            |item| item.id,
            |left, right| {
                left.policy.map(str::to_lowercase) == right.policy.map(str::to_lowercase)
            },
        );
        assert_eq!(changed, vec![entry("g2", Some("p2")), entry("g3", None)]);
    }

    fn id_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-e]{1,2}", 0..8)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn intersection_commutes(a in id_list(), b in id_list()) {
            prop_assert_eq!(intersection(&a, &b), intersection(&b, &a));
        }

        #[test]
        fn difference_with_self_is_empty(a in id_list()) {
            prop_assert!(difference(&a, &a).is_empty());
        }

        #[test]
        fn union_with_difference_covers_right(a in id_list(), b in id_list()) {
            let covered: BTreeSet<String> = union(&a, &difference(&b, &a)).into_iter().collect();
            prop_assert!(b.iter().all(|id| covered.contains(id)));
        }

        #[test]
        fn results_are_sorted_and_unique(a in id_list(), b in id_list()) {
            for result in [intersection(&a, &b), difference(&a, &b), union(&a, &b)] {
                let mut normalized = result.clone();
                normalized.sort();
                normalized.dedup();
                prop_assert_eq!(result, normalized);
            }
        }
    }
}
