use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use skiplattice::{debug, SkipMap};

fn check(map: &SkipMap<i64, i64>) {
    if let Err(violation) = debug::validate_map(map) {
        panic!("{violation}");
    }
}

// ─── End-to-end scenarios ────────────────────────────────────────────────────

#[test]
fn duplicate_insert_is_rejected() {
    let mut map = SkipMap::with_seed(1);
    let pairs = [(2, 4), (1, 2), (3, 8), (3, 8), (4, 16), (0, 1), (5, 32)];
    let mut outcomes = Vec::new();
    for (k, v) in pairs {
        outcomes.push(map.insert(k, v).1);
    }
    assert_eq!(
        outcomes,
        vec![true, true, true, false, true, true, true],
        "only the second (3, 8) is refused"
    );
    assert_eq!(map.len(), 6);
    let entries: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(entries, vec![(0, 1), (1, 2), (2, 4), (3, 8), (4, 16), (5, 32)]);
    check(&map);
}

#[test]
fn balanced_twenty_keys_have_exact_heights() {
    let mut map = SkipMap::with_seed(2);
    for k in 0..20 {
        map.insert(k, k);
    }
    map.balance();
    check(&map);

    let survey = debug::survey_map(&map);
    assert_eq!(survey.level_count, 5);
    // element i (1-based) spans 1 + v2(i) levels; the head column spans all 5
    assert_eq!(
        survey.column_heights,
        vec![1, 2, 1, 3, 1, 2, 1, 4, 1, 2, 1, 3, 1, 2, 1, 5, 1, 2, 1, 3]
    );
}

fn random_churn(n: i64, seed: u64) {
    let mut keys: Vec<i64> = (0..n).collect();
    let mut rng = SmallRng::seed_from_u64(seed);
    keys.shuffle(&mut rng);

    let mut map = SkipMap::with_seed(seed);
    for (i, &k) in keys.iter().enumerate() {
        assert!(map.insert(k, i as i64).1);
    }
    assert_eq!(map.len(), n as usize);
    check(&map);

    keys.shuffle(&mut rng);
    for &k in &keys {
        assert_eq!(map.remove(&k), 1);
    }
    assert_eq!(map.len(), 0);
    assert_eq!(debug::survey_map(&map).level_count, 0);
    check(&map);
}

#[test]
fn insert_then_erase_all_random_keys() {
    random_churn(50_000, 3);
}

#[test]
#[ignore = "million-entry churn; run with --ignored"]
fn insert_then_erase_all_million_keys() {
    random_churn(1_000_000, 4);
}

#[test]
fn full_sweep_balances_unbalanced_map() {
    let mut map = SkipMap::with_seed(5);
    for k in 0..1000 {
        map.insert(k, -k);
    }
    assert!(!map.is_balanced());

    let mut count = 0;
    let mut sweep = map.balancing_iter();
    while let Some((&k, v)) = sweep.next() {
        assert_eq!(*v, -k);
        count += 1;
    }
    assert_eq!(count, 1000);
    assert!(map.is_balanced());
    check(&map);

    // balance() after the sweep is a no-op
    let before = debug::survey_map(&map);
    map.balance();
    assert_eq!(debug::survey_map(&map), before);
}

#[test]
fn balance_then_sweep_observes_no_change() {
    let mut map = SkipMap::with_seed(6);
    for k in 0..100 {
        map.insert(k, k);
    }
    map.balance();
    let before = debug::survey_map(&map);

    let mut sweep = map.balancing_iter();
    while sweep.next().is_some() {}
    assert!(map.is_balanced());
    assert_eq!(debug::survey_map(&map), before);
    check(&map);
}

#[test]
fn same_seed_same_structure() {
    let mut a = SkipMap::with_seed(7);
    let mut b = SkipMap::with_seed(7);
    for k in 0..500 {
        a.insert(k, k);
        b.insert(k, k);
    }
    assert_eq!(debug::survey_map(&a), debug::survey_map(&b));
}

// ─── Model-based tests against BTreeMap ──────────────────────────────────────

#[derive(Debug, Clone)]
enum MapOp {
    Insert(i64, i64),
    HintedInsert(i64, i64),
    Remove(i64),
    Get(i64),
    Count(i64),
    PopFront,
    PopBack,
    Balance,
    Sweep,
}

fn op_strategy() -> impl Strategy<Value = MapOp> {
    let key = -200i64..200;
    let value = any::<i64>();
    prop_oneof![
        6 => (key.clone(), value.clone()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        3 => (key.clone(), value).prop_map(|(k, v)| MapOp::HintedInsert(k, v)),
        4 => key.clone().prop_map(MapOp::Remove),
        2 => key.clone().prop_map(MapOp::Get),
        1 => key.prop_map(MapOp::Count),
        1 => Just(MapOp::PopFront),
        1 => Just(MapOp::PopBack),
        1 => Just(MapOp::Balance),
        1 => Just(MapOp::Sweep),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Replays a random operation sequence on both SkipMap and BTreeMap
    /// and requires identical observable behavior throughout, with the
    /// graph invariants re-validated after every mutation.
    #[test]
    fn behaves_like_btreemap(ops in proptest::collection::vec(op_strategy(), 1..800)) {
        let mut map: SkipMap<i64, i64> = SkipMap::new();
        let mut model: BTreeMap<i64, i64> = BTreeMap::new();

        for op in &ops {
            match *op {
                MapOp::Insert(k, v) => {
                    let (_, inserted) = map.insert(k, v);
                    let expect = !model.contains_key(&k);
                    if expect {
                        model.insert(k, v);
                    }
                    prop_assert_eq!(inserted, expect, "insert({}, {})", k, v);
                }
                MapOp::HintedInsert(k, v) => {
                    let hint = map.lower_bound(&k);
                    let before = map.len();
                    map.insert_hint(hint, k, v);
                    let expect = !model.contains_key(&k);
                    if expect {
                        model.insert(k, v);
                    }
                    prop_assert_eq!(map.len() == before + 1, expect);
                }
                MapOp::Remove(k) => {
                    let removed = map.remove(&k);
                    let expect = usize::from(model.remove(&k).is_some());
                    prop_assert_eq!(removed, expect, "remove({})", k);
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(map.get(&k), model.get(&k));
                    prop_assert_eq!(map.contains_key(&k), model.contains_key(&k));
                }
                MapOp::Count(k) => {
                    let expect = usize::from(model.contains_key(&k));
                    prop_assert_eq!(map.count(&k), expect);
                }
                MapOp::PopFront => {
                    prop_assert_eq!(map.pop_front(), model.pop_first());
                }
                MapOp::PopBack => {
                    prop_assert_eq!(map.pop_back(), model.pop_last());
                }
                MapOp::Balance => {
                    map.balance();
                    prop_assert!(map.is_balanced());
                }
                MapOp::Sweep => {
                    let mut sweep = map.balancing_iter();
                    while sweep.next().is_some() {}
                    prop_assert!(map.is_balanced());
                }
            }
            prop_assert_eq!(map.len(), model.len());
            if let Err(violation) = debug::validate_map(&map) {
                return Err(TestCaseError::fail(violation.to_string()));
            }
        }

        prop_assert!(map.iter().map(|(&k, &v)| (k, v)).eq(model.into_iter()));
    }

    /// Bound queries agree with BTreeMap ranges.
    #[test]
    fn bounds_agree_with_btreemap(
        keys in proptest::collection::btree_set(-100i64..100, 0..120),
        probe in -110i64..110,
    ) {
        let map: SkipMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
        let model: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();

        let lower = model.range(probe..).next().map(|(&k, _)| k);
        let upper = model.range((std::ops::Bound::Excluded(probe), std::ops::Bound::Unbounded))
            .next()
            .map(|(&k, _)| k);

        prop_assert_eq!(map.entry(map.lower_bound(&probe)).map(|(&k, _)| k), lower);
        prop_assert_eq!(map.entry(map.upper_bound(&probe)).map(|(&k, _)| k), upper);
    }
}
