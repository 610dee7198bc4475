use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use skiplattice::{debug, SkipMultimap};

fn check(map: &SkipMultimap<i64, i64>) {
    if let Err(violation) = debug::validate_multimap(map) {
        panic!("{violation}");
    }
}

// ─── End-to-end scenarios ────────────────────────────────────────────────────

#[test]
fn ten_thousand_duplicates() {
    let mut map = SkipMultimap::with_seed(1);
    for i in 0..10_000 {
        map.insert(15, i);
    }
    map.insert(0, 0);
    map.insert(16, 16);
    check(&map);

    assert_eq!(map.count(&15), 10_000);
    let run: Vec<i64> = {
        let (low, high) = map.equal_range(&15);
        map.range(low, high).map(|(_, &v)| v).collect()
    };
    assert!(run.into_iter().eq(0..10_000), "values keep insertion order");

    assert_eq!(map.remove(&15), 10_000);
    assert_eq!(map.len(), 2);
    check(&map);
    let rest: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(rest, vec![(0, 0), (16, 16)]);
}

/// Two multimaps holding the same entry multiset agree element-wise when
/// built through different hinted sequences: appending in order at the
/// upper bound, and prepending in reverse order at the lower bound (a
/// hint that lies before the key).
#[test]
fn hinted_sequences_converge() {
    let pairs: Vec<(i64, i64)> = vec![(2, 9), (5, 1), (5, 2), (5, 3), (7, 8), (7, 9)];

    let mut forward = SkipMultimap::with_seed(2);
    for &(k, v) in &pairs {
        forward.insert(k, v);
    }

    let mut backward = SkipMultimap::with_seed(3);
    backward.insert(2, 9);
    backward.insert(7, 8);
    backward.insert(7, 9);
    // reverse order through a hint placed before the key: each insert goes
    // to the lower bound, i.e. the front of the run
    for &(k, v) in [(5i64, 3i64), (5, 2), (5, 1)].iter() {
        let early = backward.find(&2);
        backward.insert_hint(early, k, v);
    }

    assert_eq!(forward, backward);
    check(&forward);
    check(&backward);
}

#[test]
fn full_sweep_balances() {
    let mut map = SkipMultimap::with_seed(4);
    for i in 0..500 {
        map.insert(i % 50, i);
    }
    assert!(!map.is_balanced());
    let mut sweep = map.balancing_iter();
    let mut count = 0;
    while sweep.next().is_some() {
        count += 1;
    }
    assert_eq!(count, 500);
    assert!(map.is_balanced());
    check(&map);
}

// ─── Model-based tests against a sorted vector ───────────────────────────────

/// The reference model: a vector kept sorted by key, with each new entry
/// placed after every entry of an equivalent key (upper-bound insertion).
#[derive(Default)]
struct VecModel {
    entries: Vec<(i64, i64)>,
}

impl VecModel {
    fn insert(&mut self, key: i64, value: i64) {
        let at = self.entries.partition_point(|&(k, _)| k <= key);
        self.entries.insert(at, (key, value));
    }

    fn remove(&mut self, key: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|&(k, _)| k != key);
        before - self.entries.len()
    }

    fn count(&self, key: i64) -> usize {
        self.entries.iter().filter(|&&(k, _)| k == key).count()
    }
}

#[derive(Debug, Clone)]
enum MultiOp {
    Insert(i64, i64),
    Remove(i64),
    Count(i64),
    PopFront,
    PopBack,
    Balance,
}

fn op_strategy() -> impl Strategy<Value = MultiOp> {
    let key = -30i64..30; // narrow range to force many duplicates
    let value = any::<i64>();
    prop_oneof![
        8 => (key.clone(), value).prop_map(|(k, v)| MultiOp::Insert(k, v)),
        3 => key.clone().prop_map(MultiOp::Remove),
        2 => key.prop_map(MultiOp::Count),
        1 => Just(MultiOp::PopFront),
        1 => Just(MultiOp::PopBack),
        1 => Just(MultiOp::Balance),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn behaves_like_sorted_vec(ops in proptest::collection::vec(op_strategy(), 1..600)) {
        let mut map: SkipMultimap<i64, i64> = SkipMultimap::new();
        let mut model = VecModel::default();

        for op in &ops {
            match *op {
                MultiOp::Insert(k, v) => {
                    map.insert(k, v);
                    model.insert(k, v);
                }
                MultiOp::Remove(k) => {
                    prop_assert_eq!(map.remove(&k), model.remove(k), "remove({})", k);
                }
                MultiOp::Count(k) => {
                    prop_assert_eq!(map.count(&k), model.count(k));
                }
                MultiOp::PopFront => {
                    let expect = if model.entries.is_empty() {
                        None
                    } else {
                        Some(model.entries.remove(0))
                    };
                    prop_assert_eq!(map.pop_front(), expect);
                }
                MultiOp::PopBack => {
                    prop_assert_eq!(map.pop_back(), model.entries.pop());
                }
                MultiOp::Balance => {
                    map.balance();
                    prop_assert!(map.is_balanced());
                }
            }
            prop_assert_eq!(map.len(), model.entries.len());
            if let Err(violation) = debug::validate_multimap(&map) {
                return Err(TestCaseError::fail(violation.to_string()));
            }
        }

        prop_assert!(map.iter().map(|(&k, &v)| (k, v)).eq(model.entries.into_iter()));
    }
}
