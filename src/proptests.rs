use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;
use std::ops::ControlFlow;

const DEFAULT: u64 = u64::MAX;

pub(crate) fn validate_trie<K: AsRef<[u8]>, V>(t: &CritBitTrie<K, V>) {
    let Some(root) = t.root else {
        assert_eq!(t.count(), 0, "empty trie must have no nodes");
        assert_eq!(t.nodes.live(), 0, "empty trie must hold no live slots");
        return;
    };

    let mut leaves = 0usize;
    let mut branches = 0usize;
    let mut stack: Vec<(arena::NodeRef, Option<CritBit>)> = vec![(root, None)];
    while let Some((r, bound)) = stack.pop() {
        if r.is_leaf() {
            leaves += 1;
            continue;
        }

        branches += 1;
        let branch = *t.nodes.branch(r);
        if let Some(bound) = bound {
            assert!(
                bound < branch.crit,
                "branch bits must strictly increase along a path"
            );
        }
        for (dir, &child) in branch.children.iter().enumerate() {
            for (k, _) in t.subtree_iter(Some(child)) {
                assert_eq!(
                    branch.crit.direction(k.as_ref()),
                    dir,
                    "leaf sits on the wrong side of {:?}",
                    branch.crit
                );
            }
            stack.push((child, Some(branch.crit)));
        }
    }

    assert_eq!(leaves, t.len(), "reachable leaf count must match len");
    assert_eq!(branches, t.internal_count(), "reachable branch count must match");
    assert_eq!(branches + 1, leaves, "a binary trie has one fewer branch than leaves");
    assert_eq!(t.nodes.live(), t.count(), "no unreachable live slots");
}

/// Trailing zero bytes do not distinguish keys.
fn canonical(key: &[u8]) -> &[u8] {
    let end = key.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &key[..end]
}

fn clashes(m: &BTreeMap<Vec<u8>, u64>, key: &[u8]) -> bool {
    !m.contains_key(key) && m.keys().any(|k| canonical(k) == canonical(key))
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A small alphabet, zero included, so keys collide, share prefixes and clash.
    let byte = prop::sample::select(vec![0x00u8, 0x01, 0x61, 0x62, 0x7F, 0x80, 0xFF]);
    prop::collection::vec(byte, 0..=10)
}

fn prefix_strategy() -> impl Strategy<Value = Vec<u8>> {
    let byte = prop::sample::select(vec![0x00u8, 0x61, 0x62, 0xFF]);
    prop::collection::vec(byte, 0..=3)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "key_strategy()")] Vec<u8>, u64),
    #[proptest(weight = 25)]
    Remove(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 15)]
    Lookup(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 5)]
    Select(#[proptest(strategy = "0usize..64")] usize),
    #[proptest(weight = 5)]
    Prefix(#[proptest(strategy = "prefix_strategy()")] Vec<u8>),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let mut t: CritBitTrie<Vec<u8>, u64> = CritBitTrie::new(DEFAULT);
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    if clashes(&m, &key) {
                        let rejected = t
                            .insert(key.clone(), value)
                            .map_err(|e| (e.kind(), e.into_entry()));
                        prop_assert_eq!(rejected, Err((Error::Clashes, (key, value))));
                    } else {
                        prop_assert_eq!(t.insert(key.clone(), value), Ok(()));
                        m.insert(key, value);
                    }
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&key), m.remove(&key));
                }
                Op::Lookup(key) => {
                    let expected = m.get(&key).copied().unwrap_or(DEFAULT);
                    prop_assert_eq!(*t.lookup(&key), expected);
                }
                Op::Select(k) => {
                    let got = t.select(k).map(|(k, v)| (k.clone(), *v));
                    let expected = m.iter().nth(k).map(|(k, v)| (k.clone(), *v));
                    prop_assert_eq!(got, expected);
                }
                Op::Prefix(prefix) => {
                    let expected: Vec<(Vec<u8>, u64)> = m
                        .iter()
                        .filter(|(k, _)| k.starts_with(&prefix))
                        .map(|(k, v)| (k.clone(), *v))
                        .collect();

                    let mut got = Vec::new();
                    let res = t.lookup_prefix(&prefix, |k, v| {
                        got.push((k.clone(), *v));
                        ControlFlow::<()>::Continue(())
                    });
                    if expected.is_empty() {
                        prop_assert_eq!(res, Err(Error::NotFound));
                    } else {
                        prop_assert_eq!(res, Ok(ControlFlow::Continue(())));
                    }
                    prop_assert_eq!(&got, &expected);

                    let iterated: Vec<(Vec<u8>, u64)> =
                        t.prefix_iter(&prefix).map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(iterated, expected);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_failed_insert_is_atomic(keys in prop::collection::vec(key_strategy(), 1..48)) {
        let mut t: CritBitTrie<Vec<u8>, u64> = CritBitTrie::new(DEFAULT);
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, key) in keys.into_iter().enumerate() {
            if m.contains_key(&key) || clashes(&m, &key) {
                continue;
            }

            let before: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let count = t.count();
            let internal = t.internal_count();

            // `count` fails the leaf allocation; `count + 1` fails the branch
            // allocation (an empty trie needs no branch).
            let limits = if t.is_empty() { vec![count] } else { vec![count, count + 1] };
            for limit in limits {
                t.set_node_limit(Some(limit));
                let rejected = t
                    .insert(key.clone(), i as u64)
                    .map_err(|e| (e.kind(), e.into_entry()));
                prop_assert_eq!(rejected, Err((Error::OutOfMemory, (key.clone(), i as u64))));
                prop_assert_eq!(t.count(), count);
                prop_assert_eq!(t.internal_count(), internal);
                prop_assert_eq!(t.get(&key), None);
                let after: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(&after, &before);
                validate_trie(&t);
            }

            t.set_node_limit(None);
            prop_assert_eq!(t.insert(key.clone(), i as u64), Ok(()));
            m.insert(key, i as u64);
        }

        for (k, v) in &m {
            prop_assert_eq!(t.get(k), Some(v));
        }
    }

    #[test]
    fn prop_select_is_sorted(keys in prop::collection::vec(key_strategy(), 0..200)) {
        let mut t: CritBitTrie<Vec<u8>, ()> = CritBitTrie::new(());
        for key in keys {
            // Clashing keys are rejected and leave the trie as it was.
            let _ = t.insert(key, ());
        }
        let selected: Vec<Vec<u8>> = (0..t.len()).map(|k| t.select(k).unwrap().0.clone()).collect();
        prop_assert!(selected.windows(2).all(|w| w[0] < w[1]), "keys must strictly ascend");
        prop_assert_eq!(t.select(t.len()), None);
        validate_trie(&t);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"c".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"a\0b".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_set();

    for_each_permutation(&keys, |perm| {
        let mut t: CritBitTrie<Vec<u8>, u64> = CritBitTrie::new(DEFAULT);
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            t.insert(k.clone(), v).unwrap();
            m.insert(k, v);
        }

        validate_trie(&t);
        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base_trie: CritBitTrie<Vec<u8>, u64> = CritBitTrie::new(DEFAULT);
    let mut base_map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        base_trie.insert(k.clone(), v).unwrap();
        base_map.insert(k.clone(), v);
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_trie.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.remove(&k), m.remove(&k));
            assert_eq!(t.len(), m.len());
            validate_trie(&t);
            for (k, v) in &m {
                assert_eq!(t.get(k), Some(v));
            }
        }
        assert_eq!(t.len(), 0);
        assert!(t.root.is_none());
    });
}
