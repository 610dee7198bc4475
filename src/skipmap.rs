//! SkipMap stores key-value pairs, with the keys being unique and always
//! sorted.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::compare::{Comparator, LessThan};
use crate::iter::{BalancingIter, Cursor, IntoIter, Iter, Keys, Values};
use crate::lattice::{Bias, Lattice, LazyProducer, PairProducer, RawInsert};
use crate::level_generator::Geometric;

/// The error returned by [`SkipMap::at`] and friends when no entry has an
/// equivalent key.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid key: no entry with an equivalent key")]
pub struct KeyNotFound;

// ////////////////////////////////////////////////////////////////////////////
// SkipMap
// ////////////////////////////////////////////////////////////////////////////

/// An ordered map from unique keys to values, backed by a self-balancing
/// skiplist.
///
/// Lookup, insertion and removal run in expected `O(log n)`; an in-order
/// traversal, or an explicit [`balance`](SkipMap::balance), reshapes the
/// probabilistic structure into a perfectly regular one so that subsequent
/// searches hit the `log2(n)` bound deterministically.  Inserting with a
/// correct [`Cursor`] hint is amortized `O(1)`.
///
/// Keys are compared through a [`Comparator`]; with the default
/// [`LessThan`] this is the natural order of `K: Ord`.  Two keys are
/// treated as the same when neither compares less than the other.
///
/// # Examples
///
/// ```
/// use skiplattice::SkipMap;
///
/// let mut map = SkipMap::new();
/// map.insert(2, "two");
/// map.insert(1, "one");
/// map.insert(3, "three");
///
/// assert_eq!(map.len(), 3);
/// assert_eq!(map.get(&2), Some(&"two"));
/// let keys: Vec<_> = map.keys().copied().collect();
/// assert_eq!(keys, vec![1, 2, 3]);
/// ```
pub struct SkipMap<K, V, C = LessThan> {
    pub(crate) core: Lattice<K, V, C, false>,
}

// ///////////////////////////////////////////////
// Construction
// ///////////////////////////////////////////////

impl<K, V> SkipMap<K, V> {
    /// Create an empty map ordered by `K: Ord`, with a randomly seeded
    /// column-height source.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let map: SkipMap<i64, String> = SkipMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        SkipMap {
            core: Lattice::with_parts(LessThan, Geometric::new()),
        }
    }

    /// Create an empty map whose column heights are drawn from a source
    /// with the given seed.  Two maps with the same seed and the same
    /// insertion sequence end up with the same node graph, which tests
    /// rely on.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut a = SkipMap::with_seed(7);
    /// let mut b = SkipMap::with_seed(7);
    /// a.extend((0..100).map(|x| (x, x)));
    /// b.extend((0..100).map(|x| (x, x)));
    /// assert_eq!(
    ///     skiplattice::debug::survey_map(&a),
    ///     skiplattice::debug::survey_map(&b),
    /// );
    /// ```
    #[inline]
    pub fn with_seed(seed: u64) -> Self {
        SkipMap {
            core: Lattice::with_parts(LessThan, Geometric::with_seed(seed)),
        }
    }
}

impl<K, V, C> SkipMap<K, V, C>
where
    C: Comparator<K>,
{
    /// Create an empty map with a custom key order.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::{OrderBy, SkipMap};
    ///
    /// let mut map = SkipMap::with_order(OrderBy(|a: &i32, b: &i32| b < a));
    /// map.extend([(1, "one"), (3, "three"), (2, "two")]);
    /// let keys: Vec<_> = map.keys().copied().collect();
    /// assert_eq!(keys, vec![3, 2, 1]);
    /// ```
    #[inline]
    pub fn with_order(order: C) -> Self {
        SkipMap {
            core: Lattice::with_parts(order, Geometric::new()),
        }
    }

    /// Create an empty map with a custom key order and a fixed seed.
    #[inline]
    pub fn with_order_and_seed(order: C, seed: u64) -> Self {
        SkipMap {
            core: Lattice::with_parts(order, Geometric::with_seed(seed)),
        }
    }
}

// ///////////////////////////////////////////////
// Queries
// ///////////////////////////////////////////////

impl<K, V, C> SkipMap<K, V, C> {
    /// Number of entries in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.core.len
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.core.len == 0
    }

    /// Returns `false` if the map has been structurally changed since it
    /// was last balanced.  Constant time.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// map.insert(1, 1);
    /// assert!(!map.is_balanced());
    /// map.balance();
    /// assert!(map.is_balanced());
    /// ```
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.core.balanced
    }

    /// The comparator ordering this map's keys.
    #[inline]
    pub fn comparator(&self) -> &C {
        &self.core.order
    }

    /// First entry in key order, or `None` if the map is empty.
    #[inline]
    pub fn front(&self) -> Option<(&K, &V)> {
        self.core.begin.map(|node| self.core.entry_kv(node))
    }

    /// Last entry in key order, or `None` if the map is empty.
    #[inline]
    pub fn back(&self) -> Option<(&K, &V)> {
        self.core.tail.map(|node| self.core.entry_kv(node))
    }

    /// Iterate over the entries in key order.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let map: SkipMap<_, _> = (0..5).map(|x| (x, x * x)).collect();
    /// for (k, v) in map.iter() {
    ///     assert_eq!(*v, k * k);
    /// }
    /// assert_eq!(map.iter().rev().next(), Some((&4, &16)));
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::full(&self.core)
    }

    /// Iterate over the keys in order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Iterate over the values in key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }
}

impl<K, V, C> SkipMap<K, V, C>
where
    C: Comparator<K>,
{
    /// Returns `true` if an entry with an equivalent key exists.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let map: SkipMap<_, _> = (0..10).map(|x| (x, x)).collect();
    /// assert!(map.contains_key(&4));
    /// assert!(!map.contains_key(&15));
    /// ```
    pub fn contains_key(&self, key: &K) -> bool {
        self.core.find_node(key).is_some()
    }

    /// A reference to the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let node = self.core.find_node(key)?;
        Some(self.core.entry_kv(node).1)
    }

    /// A mutable reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map: SkipMap<_, _> = (0..10).map(|x| (x, x)).collect();
    /// if let Some(v) = map.get_mut(&3) {
    ///     *v = 100;
    /// }
    /// assert_eq!(map.get(&3), Some(&100));
    /// ```
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let node = self.core.find_node(key)?;
        Some(self.core.node_value_mut(node))
    }

    /// A reference to the value stored under `key`, or [`KeyNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`KeyNotFound`] when no entry has an equivalent key.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::{KeyNotFound, SkipMap};
    ///
    /// let map: SkipMap<_, _> = (0..3).map(|x| (x, x * 2)).collect();
    /// assert_eq!(map.at(&2), Ok(&4));
    /// assert_eq!(map.at(&7), Err(KeyNotFound));
    /// ```
    pub fn at(&self, key: &K) -> Result<&V, KeyNotFound> {
        self.get(key).ok_or(KeyNotFound)
    }

    /// A mutable reference to the value stored under `key`, or
    /// [`KeyNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`KeyNotFound`] when no entry has an equivalent key.
    pub fn at_mut(&mut self, key: &K) -> Result<&mut V, KeyNotFound> {
        self.get_mut(key).ok_or(KeyNotFound)
    }

    /// Number of entries with an equivalent key: 0 or 1.
    pub fn count(&self, key: &K) -> usize {
        self.core.count_key(key)
    }

    /// A cursor on the entry with an equivalent key, or the end cursor.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let map: SkipMap<_, _> = (0..5).map(|x| (x, x)).collect();
    /// let cursor = map.find(&3);
    /// assert_eq!(map.entry(cursor), Some((&3, &3)));
    /// assert!(map.find(&9).is_end());
    /// ```
    pub fn find(&self, key: &K) -> Cursor {
        self.cursor(self.core.find_bottom(key))
    }

    /// A cursor on the first entry whose key is not less than `key`.
    pub fn lower_bound(&self, key: &K) -> Cursor {
        self.cursor(self.core.find_bound(key, Bias::Lower))
    }

    /// A cursor on the first entry whose key is strictly greater than
    /// `key`.
    pub fn upper_bound(&self, key: &K) -> Cursor {
        self.cursor(self.core.find_bound(key, Bias::Upper))
    }

    /// The pair `(lower_bound(key), upper_bound(key))`, bracketing the run
    /// of entries equivalent to `key`.
    pub fn equal_range(&self, key: &K) -> (Cursor, Cursor) {
        (self.lower_bound(key), self.upper_bound(key))
    }
}

// ///////////////////////////////////////////////
// Cursor navigation
// ///////////////////////////////////////////////

impl<K, V, C> SkipMap<K, V, C> {
    fn cursor(&self, node: Option<crate::arena::Handle>) -> Cursor {
        Cursor {
            node,
            owner: self.core.id,
        }
    }

    /// Resolve a cursor to a live node; a stale or foreign cursor resolves
    /// to past-the-end.
    fn resolve(&self, cursor: Cursor) -> Option<crate::arena::Handle> {
        debug_assert_eq!(cursor.owner, self.core.id, "cursor from another container");
        cursor
            .node
            .filter(|&node| cursor.owner == self.core.id && self.core.nodes.contains(node))
    }

    /// A cursor on the first entry, or the end cursor if empty.
    pub fn cursor_front(&self) -> Cursor {
        self.cursor(self.core.begin)
    }

    /// The past-the-end cursor.
    pub fn cursor_end(&self) -> Cursor {
        self.cursor(None)
    }

    /// The entry under a cursor, or `None` for the end cursor (and for a
    /// cursor whose element has been removed).
    pub fn entry(&self, cursor: Cursor) -> Option<(&K, &V)> {
        let node = self.resolve(cursor)?;
        Some(self.core.entry_kv(node))
    }

    /// The value under a cursor, mutably.
    pub fn value_mut(&mut self, cursor: Cursor) -> Option<&mut V> {
        let node = self.resolve(cursor)?;
        Some(self.core.node_value_mut(node))
    }

    /// The cursor one position forward.  Advancing the end cursor is a
    /// programmer error and fires a debug assertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let map: SkipMap<_, _> = (0..3).map(|x| (x, x)).collect();
    /// let mut cursor = map.cursor_front();
    /// assert_eq!(map.entry(cursor), Some((&0, &0)));
    /// cursor = map.advance(cursor);
    /// assert_eq!(map.entry(cursor), Some((&1, &1)));
    /// ```
    pub fn advance(&self, cursor: Cursor) -> Cursor {
        match self.resolve(cursor) {
            Some(node) => self.cursor(self.core.nodes.get(node).next),
            None => {
                debug_assert!(false, "advancing the end cursor");
                self.cursor_end()
            }
        }
    }

    /// The cursor one position backward.  Retreating from the end cursor
    /// lands on the last entry; retreating the begin cursor is a
    /// programmer error and fires a debug assertion.
    pub fn retreat(&self, cursor: Cursor) -> Cursor {
        match self.resolve(cursor) {
            None => self.cursor(self.core.tail),
            Some(node) => {
                if self.core.is_first(node) {
                    debug_assert!(false, "retreating the begin cursor");
                    self.cursor(Some(node))
                } else {
                    self.cursor(self.core.nodes.get(node).prev)
                }
            }
        }
    }

    /// Iterate over the entries between two cursors, left-inclusive.
    ///
    /// Both cursors must come from this map, with `from` at or before
    /// `to`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let map: SkipMap<_, _> = (0..10).map(|x| (x, x)).collect();
    /// let keys: Vec<_> = map
    ///     .range(map.find(&3), map.find(&7))
    ///     .map(|(&k, _)| k)
    ///     .collect();
    /// assert_eq!(keys, vec![3, 4, 5, 6]);
    /// ```
    pub fn range(&self, from: Cursor, to: Cursor) -> Iter<'_, K, V> {
        let from = self.resolve(from);
        let to = self.resolve(to);
        Iter::between(&self.core, from, to)
    }
}

// ///////////////////////////////////////////////
// Mutation
// ///////////////////////////////////////////////

impl<K, V, C> SkipMap<K, V, C>
where
    C: Comparator<K>,
{
    /// Insert a key/value pair.
    ///
    /// Returns a cursor on the inserted entry and `true`, or — when an
    /// equivalent key is already present — a cursor on the blocking entry
    /// and `false`, leaving the map unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// let (_, inserted) = map.insert(1, "one");
    /// assert!(inserted);
    /// let (cursor, inserted) = map.insert(1, "uno");
    /// assert!(!inserted);
    /// assert_eq!(map.entry(cursor), Some((&1, &"one")));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (Cursor, bool) {
        let outcome = self
            .core
            .insert_top_down(PairProducer { key, value }, Bias::Upper);
        let inserted = outcome.inserted();
        (self.cursor(Some(outcome.node())), inserted)
    }

    /// Insert a key/value pair, handing both back on a duplicate key.
    ///
    /// # Errors
    ///
    /// When an equivalent key is already present the map is left unchanged
    /// and the key and value are returned to the caller unconsumed.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// map.insert(1, String::from("one"));
    /// let (key, value) = map.try_insert(1, String::from("uno")).unwrap_err();
    /// assert_eq!((key, value.as_str()), (1, "uno"));
    /// ```
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Cursor, (K, V)> {
        match self
            .core
            .insert_top_down(PairProducer { key, value }, Bias::Upper)
        {
            RawInsert::Inserted(node) => Ok(self.cursor(Some(node))),
            RawInsert::Blocked { producer, .. } => Err((producer.key, producer.value)),
        }
    }

    /// Insert a key/value pair near a cursor hint.
    ///
    /// With a correct hint — a cursor on the entry the new key should
    /// directly precede, or the end cursor for the largest key — the
    /// insertion is amortized `O(1)`; a wrong hint falls back to the
    /// ordinary `O(log n)` search.  Returns a cursor on the inserted entry,
    /// or on the entry that blocked the insertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// let end = map.cursor_end();
    /// for i in 0..100 {
    ///     map.insert_hint(end, i, i); // sorted input: every hint is right
    /// }
    /// assert_eq!(map.len(), 100);
    /// ```
    pub fn insert_hint(&mut self, hint: Cursor, key: K, value: V) -> Cursor {
        let hint = self.resolve_hint(hint);
        let node = self.core.insert_with_hint(hint, PairProducer { key, value });
        self.cursor(Some(node))
    }

    /// Insert a key with a lazily built value.
    ///
    /// Unlike [`insert`](SkipMap::insert), the value is only constructed
    /// when the insertion actually happens; on a duplicate key the closure
    /// is never called.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// map.insert(1, vec![0; 16]);
    /// let (_, inserted) = map.try_insert_with(1, || vec![0; 1_000_000]);
    /// assert!(!inserted); // the big vector was never allocated
    /// ```
    pub fn try_insert_with<F>(&mut self, key: K, make: F) -> (Cursor, bool)
    where
        F: FnOnce() -> V,
    {
        let outcome = self
            .core
            .insert_top_down(LazyProducer { key, make }, Bias::Upper);
        let inserted = outcome.inserted();
        (self.cursor(Some(outcome.node())), inserted)
    }

    /// Insert a key with a lazily built value, near a cursor hint.
    pub fn try_insert_with_hint<F>(&mut self, hint: Cursor, key: K, make: F) -> Cursor
    where
        F: FnOnce() -> V,
    {
        let hint = self.resolve_hint(hint);
        let node = self.core.insert_with_hint(hint, LazyProducer { key, make });
        self.cursor(Some(node))
    }

    /// A mutable reference to the value under `key`, inserting a
    /// default-constructed value first if the key is absent.  This is the
    /// subscript operator of this map.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut histogram: SkipMap<char, u32> = SkipMap::new();
    /// for c in "abracadabra".chars() {
    ///     *histogram.or_default(c) += 1;
    /// }
    /// assert_eq!(histogram.get(&'a'), Some(&5));
    /// ```
    pub fn or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let hint = self.lower_bound(&key);
        let hint = self.resolve_hint(hint);
        let node = self.core.insert_with_hint(
            hint,
            LazyProducer {
                key,
                make: V::default,
            },
        );
        self.core.node_value_mut(node)
    }

    fn resolve_hint(&self, hint: Cursor) -> Option<crate::arena::Handle> {
        let node = self.resolve(hint);
        if let Some(node) = node {
            let n = self.core.nodes.get(node);
            debug_assert!(
                n.down.is_none() && !n.is_dummy(),
                "hint cursor must sit on the bottom list"
            );
        }
        node
    }

    /// Remove the entry with an equivalent key, if any; returns how many
    /// entries were removed (0 or 1).
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map: SkipMap<_, _> = (0..10).map(|x| (x, x)).collect();
    /// assert_eq!(map.remove(&4), 1);
    /// assert_eq!(map.remove(&4), 0);
    /// assert_eq!(map.len(), 9);
    /// ```
    pub fn remove(&mut self, key: &K) -> usize {
        self.core.erase_key(key)
    }

    /// Remove the entry under a cursor; returns the cursor following it.
    ///
    /// The cursor must be valid and dereferenceable: removing through the
    /// end cursor, a stale cursor, or a cursor from another map is a
    /// programmer error and fires a debug assertion.
    pub fn remove_at(&mut self, at: Cursor) -> Cursor {
        match self.resolve(at) {
            Some(node) => {
                let (next, _) = self.core.erase_node(node);
                self.cursor(next)
            }
            None => {
                debug_assert!(false, "removing through an end or stale cursor");
                self.cursor_end()
            }
        }
    }

    /// Remove every entry in `[first, last)`; returns a cursor at `last`'s
    /// position.  Both cursors must belong to this map.
    pub fn remove_range(&mut self, first: Cursor, last: Cursor) -> Cursor {
        let stop = self.resolve(last);
        let mut cur = self.resolve(first);
        while cur != stop {
            match cur {
                Some(node) => cur = self.core.erase_node(node).0,
                None => break,
            }
        }
        self.cursor(stop)
    }

    /// Remove and return the first entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map: SkipMap<_, _> = (0..3).map(|x| (x, x)).collect();
    /// assert_eq!(map.pop_front(), Some((0, 0)));
    /// assert_eq!(map.pop_front(), Some((1, 1)));
    /// assert_eq!(map.pop_front(), Some((2, 2)));
    /// assert_eq!(map.pop_front(), None);
    /// ```
    pub fn pop_front(&mut self) -> Option<(K, V)> {
        let begin = self.core.begin?;
        Some(self.core.erase_node(begin).1.into_kv())
    }

    /// Remove and return the last entry.
    pub fn pop_back(&mut self) -> Option<(K, V)> {
        let tail = self.core.tail?;
        Some(self.core.erase_node(tail).1.into_kv())
    }

    /// Remove every entry.  The column-height source is kept.
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Rebuild the upper levels into the deterministic shape: every entry
    /// in level 1, every 2nd in level 2, every 4th in level 3, and so on.
    /// `O(n)`; a no-op when already balanced.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map: SkipMap<_, _> = (0..100).map(|x| (x, x)).collect();
    /// map.balance();
    /// assert!(map.is_balanced());
    /// ```
    pub fn balance(&mut self) {
        self.core.balance_with(|_, _| {});
    }

    /// Visit every entry in key order with mutable access to the values,
    /// balancing the map along the way if it is not already balanced.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map: SkipMap<_, _> = (0..10).map(|x| (x, 1)).collect();
    /// map.for_each_mut(|_, v| *v *= 2);
    /// assert!(map.is_balanced());
    /// assert!(map.values().all(|&v| v == 2));
    /// ```
    pub fn for_each_mut<F>(&mut self, visit: F)
    where
        F: FnMut(&K, &mut V),
    {
        self.core.for_each_mut(visit);
    }

    /// A balancing traversal starting before the first entry.  Sweeping it
    /// forward past the last entry balances the whole map at amortized
    /// `O(1)` per element.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplattice::SkipMap;
    ///
    /// let mut map: SkipMap<_, _> = (0..50).map(|x| (x, x)).collect();
    /// let mut sweep = map.balancing_iter();
    /// while let Some((_, v)) = sweep.next() {
    ///     *v += 1;
    /// }
    /// assert!(map.is_balanced());
    /// ```
    pub fn balancing_iter(&mut self) -> BalancingIter<'_, K, V, C, false> {
        BalancingIter::from_front(&mut self.core)
    }

    /// A balancing traversal starting past the last entry; sweep it with
    /// [`next_back`](BalancingIter::next_back) to balance back-to-front.
    pub fn balancing_iter_back(&mut self) -> BalancingIter<'_, K, V, C, false> {
        BalancingIter::from_back(&mut self.core)
    }

    /// A balancing traversal starting at a cursor.  Started from an
    /// interior position the traversal cannot know its index and degrades
    /// to a plain mutable traversal.
    pub fn balancing_iter_at(&mut self, at: Cursor) -> BalancingIter<'_, K, V, C, false> {
        let node = self.resolve(at);
        BalancingIter::from_node(&mut self.core, node)
    }
}

// ///////////////////////////////////////////////
// Trait implementations
// ///////////////////////////////////////////////

impl<K, V, C> Default for SkipMap<K, V, C>
where
    C: Comparator<K> + Default,
{
    fn default() -> Self {
        SkipMap {
            core: Lattice::with_parts(C::default(), Geometric::new()),
        }
    }
}

/// Cloning rebuilds the clone balanced, whatever shape the source is in,
/// and seeds it with a fresh column-height source.
impl<K, V, C> Clone for SkipMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone,
{
    fn clone(&self) -> Self {
        SkipMap {
            core: self.core.clone_balanced(),
        }
    }
}

/// Equality compares the entry sequences element-wise; the structural
/// shape and the comparators play no part.
impl<K, V, C> PartialEq for SkipMap<K, V, C>
where
    K: PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, V, C> Eq for SkipMap<K, V, C>
where
    K: Eq,
    V: Eq,
{
}

/// Lexicographic order over the entry sequences.
impl<K, V, C> PartialOrd for SkipMap<K, V, C>
where
    K: PartialOrd,
    V: PartialOrd,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K, V, C> Ord for SkipMap<K, V, C>
where
    K: Ord,
    V: Ord,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K, V, C> fmt::Debug for SkipMap<K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C> Extend<(K, V)> for SkipMap<K, V, C>
where
    C: Comparator<K>,
{
    /// Insert every pair, hinting at the end; sorted input inserts in
    /// amortized constant time per entry.  Pairs whose key is already
    /// present are skipped.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let end = self.cursor_end();
        for (key, value) in iter {
            self.insert_hint(end, key, value);
        }
    }
}

impl<K, V, C> FromIterator<(K, V)> for SkipMap<K, V, C>
where
    C: Comparator<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SkipMap::default();
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for SkipMap<K, V>
where
    K: Ord,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V, C> IntoIterator for SkipMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::from_lattice(self.core)
    }
}

impl<'a, K, V, C> IntoIterator for &'a SkipMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////
