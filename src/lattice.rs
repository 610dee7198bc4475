//! The shared core of [`SkipMap`](crate::SkipMap) and
//! [`SkipMultimap`](crate::SkipMultimap).
//!
//! A lattice is a stack of sorted doubly-linked lists.  The bottom list
//! holds every entry; each list above holds a subset of the one below, and
//! the nodes referring to one entry are linked vertically into a *column*:
//!
//! ```text
//! <head> ----------> [2] --------------------------------------------------> [9] ---------->
//! <head> ----------> [2] ------------------------------------[7] ----------> [9] ---------->
//! <head> ----------> [2] ----------> [4] ------------------> [7] ----------> [9] --> [10] ->
//! <head> --> [1] --> [2] --> [3] --> [4] --> [5] --> [6] --> [7] --> [8] --> [9] --> [10] ->
//! ```
//!
//! The number of lists tracks the element count so that
//! `2^(levels - 1) <= len <= 2^levels - 1`; an empty lattice has no lists
//! at all.  Columns get their height either from the geometric source
//! (probabilistic inserts) or deterministically from their position in the
//! bottom list (balancing), where the element at 1-based index `i` spans
//! `1 + v₂(i)` lists (`v₂` counting the trailing zeros of `i`).
//!
//! The duplicate-key policy is a const parameter: `MULTI = false` refuses
//! equivalent neighbors in the bottom list, `MULTI = true` keeps them in a
//! contiguous run.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::arena::{Arena, Handle};
use crate::compare::Comparator;
use crate::level_generator::Geometric;
use crate::node::{Entry, Node};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

// ////////////////////////////////////////////////////////////////////////////
// Insert plumbing
// ////////////////////////////////////////////////////////////////////////////

/// Which descent predicate an insertion uses.
///
/// `Upper` places a new entry after every equivalent one (the neighbor test
/// is `key < neighbor`); `Lower` places it before them (the test is
/// `!(neighbor < key)`).  Only multimap hinted fall-backs ever use `Lower`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Bias {
    Lower,
    Upper,
}

/// Deferred construction of an [`Entry`].
///
/// The key must be readable during the descent, but the entry itself is
/// built at most once, and only after the insertion position is confirmed.
/// A blocked insertion hands the intact producer back, so caller-provided
/// values are not consumed by a duplicate-key failure.
pub(crate) trait EntryProducer<K, V> {
    fn key(&self) -> &K;
    fn produce(self) -> Entry<K, V>;
}

/// Producer for a key/value pair that already exists.
pub(crate) struct PairProducer<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> EntryProducer<K, V> for PairProducer<K, V> {
    fn key(&self) -> &K {
        &self.key
    }

    fn produce(self) -> Entry<K, V> {
        Entry {
            key: self.key,
            value: self.value,
        }
    }
}

/// Producer that builds the value lazily; the closure runs only on a
/// confirmed insertion.
pub(crate) struct LazyProducer<K, F> {
    pub(crate) key: K,
    pub(crate) make: F,
}

impl<K, V, F> EntryProducer<K, V> for LazyProducer<K, F>
where
    F: FnOnce() -> V,
{
    fn key(&self) -> &K {
        &self.key
    }

    fn produce(self) -> Entry<K, V> {
        Entry {
            key: self.key,
            value: (self.make)(),
        }
    }
}

/// Outcome of a top-down insertion.
pub(crate) enum RawInsert<P> {
    /// The bottom node of the freshly spliced column.
    Inserted(Handle),
    /// Insertion was refused by an equivalent key; the producer comes back
    /// unused.
    Blocked { at: Handle, producer: P },
}

impl<P> RawInsert<P> {
    pub(crate) fn node(self) -> Handle {
        match self {
            RawInsert::Inserted(node) | RawInsert::Blocked { at: node, .. } => node,
        }
    }

    pub(crate) fn inserted(&self) -> bool {
        matches!(self, RawInsert::Inserted(_))
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Lattice
// ////////////////////////////////////////////////////////////////////////////

pub(crate) struct Lattice<K, V, C, const MULTI: bool> {
    pub(crate) nodes: Arena<Node>,
    pub(crate) entries: Arena<Entry<K, V>>,
    /// Topmost dummy; `None` exactly when the lattice is empty.
    pub(crate) head: Option<Handle>,
    /// First data node of the bottom list.
    pub(crate) begin: Option<Handle>,
    /// Last data node of the bottom list.
    pub(crate) tail: Option<Handle>,
    pub(crate) level_count: usize,
    pub(crate) len: usize,
    pub(crate) count_min: usize,
    pub(crate) count_max: usize,
    pub(crate) balanced: bool,
    pub(crate) order: C,
    pub(crate) levels: Geometric,
    /// Container identity; cursors carry it so that a cursor from another
    /// container is detectable.
    pub(crate) id: u64,
}

impl<K, V, C, const MULTI: bool> Lattice<K, V, C, MULTI> {
    pub(crate) fn with_parts(order: C, levels: Geometric) -> Self {
        Lattice {
            nodes: Arena::new(),
            entries: Arena::new(),
            head: None,
            begin: None,
            tail: None,
            level_count: 0,
            len: 0,
            count_min: 0,
            count_max: 0,
            balanced: true,
            order,
            levels,
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The key stored at a data node.
    ///
    /// # Panics
    ///
    /// Panics on a dummy node.
    pub(crate) fn node_key(&self, node: Handle) -> &K {
        let entry = self.nodes.get(node).entry.expect("dummy node has no key");
        &self.entries.get(entry).key
    }

    pub(crate) fn entry_kv(&self, node: Handle) -> (&K, &V) {
        let entry = self.nodes.get(node).entry.expect("dummy node has no entry");
        self.entries.get(entry).kv()
    }

    pub(crate) fn node_value_mut(&mut self, node: Handle) -> &mut V {
        let entry = self.nodes.get(node).entry.expect("dummy node has no entry");
        &mut self.entries.get_mut(entry).value
    }

    /// Whether a bottom-list node is the first data node.
    pub(crate) fn is_first(&self, node: Handle) -> bool {
        let prev = self.nodes.get(node).prev.expect("data node has a predecessor");
        self.nodes.get(prev).prev.is_none()
    }

    /// Height the column at 1-based bottom-list `index` has in a balanced
    /// lattice.  Index 0 is the head column, which spans every level.
    pub(crate) fn level_of(&self, index: usize) -> usize {
        if index == 0 {
            self.level_count
        } else {
            1 + index.trailing_zeros() as usize
        }
    }

    fn update_min_max(&mut self) {
        if self.level_count == 0 {
            self.count_min = 0;
            self.count_max = 0;
        } else {
            self.count_min = 1 << (self.level_count - 1);
            self.count_max = (1 << self.level_count) - 1;
        }
    }

    /// Grow a new top list.  Called when an insertion would push `len` past
    /// `count_max`; the element being inserted then spans every level.
    fn add_level(&mut self) {
        self.level_count += 1;
        self.update_min_max();
        let dummy = self.nodes.alloc(Node::dummy());
        if let Some(old) = self.head {
            self.nodes.get_mut(dummy).down = Some(old);
            self.nodes.get_mut(old).up = Some(dummy);
        }
        self.head = Some(dummy);
    }

    /// Drop the top list, dummy included.  Called while `len < count_min`;
    /// removing the last level empties the lattice entirely.
    fn remove_level(&mut self) {
        debug_assert!(self.len < self.count_min);
        self.level_count -= 1;
        self.update_min_max();
        let top = self.head.expect("remove_level on a lattice with no levels");
        self.head = self.nodes.get(top).down;
        let mut cur = Some(top);
        while let Some(node) = cur {
            let (next, down) = {
                let n = self.nodes.get(node);
                (n.next, n.down)
            };
            if let Some(down) = down {
                self.nodes.get_mut(down).up = None;
            }
            self.nodes.free(node);
            cur = next;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.nodes = Arena::new();
        self.entries = Arena::new();
        self.head = None;
        self.begin = None;
        self.tail = None;
        self.level_count = 0;
        self.len = 0;
        self.update_min_max();
        self.balanced = true;
    }
}

// ///////////////////////////////////////////////
// Queries
// ///////////////////////////////////////////////

impl<K, V, C, const MULTI: bool> Lattice<K, V, C, MULTI>
where
    C: Comparator<K>,
{
    fn goes_before(&self, key: &K, node: Handle, bias: Bias) -> bool {
        let node_key = self.node_key(node);
        match bias {
            Bias::Upper => self.order.less(key, node_key),
            Bias::Lower => !self.order.less(node_key, key),
        }
    }

    /// Point query: any node with an equivalent key, at the highest level
    /// where one appears.  `None` if the key is absent.
    pub(crate) fn find_node(&self, key: &K) -> Option<Handle> {
        let mut cur = self.head?;
        loop {
            if let Some(next) = self.nodes.get(cur).next {
                if !self.order.less(key, self.node_key(next)) {
                    if !self.order.less(self.node_key(next), key) {
                        return Some(next);
                    }
                    cur = next;
                    continue;
                }
            }
            // overshot on this level; drop a level or give up at the bottom
            cur = self.nodes.get(cur).down?;
        }
    }

    /// Like [`find_node`](Self::find_node), but lands on the bottom list.
    pub(crate) fn find_bottom(&self, key: &K) -> Option<Handle> {
        let mut node = self.find_node(key)?;
        while let Some(down) = self.nodes.get(node).down {
            node = down;
        }
        Some(node)
    }

    /// Bound query.  With `Bias::Upper` this is the first bottom-list node
    /// whose key is strictly greater than `key`; with `Bias::Lower`, the
    /// first whose key is not less.  `None` means past-the-end.
    pub(crate) fn find_bound(&self, key: &K, bias: Bias) -> Option<Handle> {
        let mut cur = self.head?;
        loop {
            match self.nodes.get(cur).next {
                Some(next) if !self.goes_before(key, next, bias) => cur = next,
                next => match self.nodes.get(cur).down {
                    Some(down) => cur = down,
                    None => return next,
                },
            }
        }
    }

    pub(crate) fn count_key(&self, key: &K) -> usize {
        let mut count = 0;
        let mut cur = self.find_bound(key, Bias::Lower);
        while let Some(node) = cur {
            if self.order.less(key, self.node_key(node)) {
                break;
            }
            count += 1;
            cur = self.nodes.get(node).next;
        }
        count
    }
}

// ///////////////////////////////////////////////
// Insertion
// ///////////////////////////////////////////////

impl<K, V, C, const MULTI: bool> Lattice<K, V, C, MULTI>
where
    C: Comparator<K>,
{
    /// Per-level insertion predecessors under the given bias, bottom level
    /// first.  The lattice must have at least one level.
    fn descent_path(&self, key: &K, bias: Bias) -> Vec<Handle> {
        let mut path = Vec::with_capacity(self.level_count);
        let mut cur = self.head.expect("descent on a lattice with no levels");
        loop {
            while let Some(next) = self.nodes.get(cur).next {
                if self.goes_before(key, next, bias) {
                    break;
                }
                cur = next;
            }
            path.push(cur);
            match self.nodes.get(cur).down {
                Some(down) => cur = down,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Splice a new column of the given height along the descent path and
    /// return its bottom node.
    fn splice_column(&mut self, path: &[Handle], height: usize, entry: Handle) -> Handle {
        debug_assert!(height >= 1 && height <= path.len());
        let mut below: Option<Handle> = None;
        let mut bottom = None;
        for (level, &pred) in path.iter().enumerate().take(height) {
            let next = self.nodes.get(pred).next;
            let node = self.nodes.alloc(Node {
                entry: Some(entry),
                next,
                prev: Some(pred),
                up: None,
                down: below,
            });
            self.nodes.get_mut(pred).next = Some(node);
            if let Some(next) = next {
                self.nodes.get_mut(next).prev = Some(node);
            }
            if let Some(below) = below {
                self.nodes.get_mut(below).up = Some(node);
            }
            if level == 0 {
                bottom = Some(node);
                if self.nodes.get(pred).prev.is_none() {
                    self.begin = Some(node);
                }
                if next.is_none() {
                    self.tail = Some(node);
                }
            }
            below = Some(node);
        }
        bottom.expect("column height is at least one")
    }

    /// Top-down insertion: pick a column height, grow a level if the count
    /// calls for it, walk the descent path, and splice.  For the unique-key
    /// flavor an equivalent left neighbor at the bottom blocks the insert
    /// before the entry is ever produced.
    pub(crate) fn insert_top_down<P>(&mut self, producer: P, bias: Bias) -> RawInsert<P>
    where
        P: EntryProducer<K, V>,
    {
        let mut height = self.levels.choose(self.level_count);
        if self.len + 1 > self.count_max {
            self.add_level();
            height = self.level_count;
        }
        let path = self.descent_path(producer.key(), bias);

        if !MULTI {
            let pred = path[0];
            if !self.nodes.get(pred).is_dummy()
                && !self.order.less(self.node_key(pred), producer.key())
            {
                // Undo the speculative level growth, if any.
                while self.len < self.count_min {
                    self.remove_level();
                }
                return RawInsert::Blocked { at: pred, producer };
            }
        }

        let entry = self.entries.alloc(producer.produce());
        let bottom = self.splice_column(&path, height, entry);
        self.len += 1;
        self.balanced = false;
        RawInsert::Inserted(bottom)
    }

    /// Bottom-up insertion used by the hinted fast path: splice after
    /// `previous` (a data node, a dummy, or `None` on an empty lattice) and
    /// extend the column upward through the insert-above walk.
    fn insert_bottom_up<P>(&mut self, previous: Option<Handle>, producer: P) -> Handle
    where
        P: EntryProducer<K, V>,
    {
        self.len += 1;
        self.balanced = false;
        let mut height = self.levels.choose(self.level_count);
        if self.len > self.count_max {
            self.add_level();
            height = self.level_count;
        }
        // On a previously empty lattice the freshly grown head is the
        // bottom dummy.
        let previous =
            previous.unwrap_or_else(|| self.head.expect("add_level ran for the first element"));

        let entry = self.entries.alloc(producer.produce());
        let next = self.nodes.get(previous).next;
        let node = self.nodes.alloc(Node {
            entry: Some(entry),
            next,
            prev: Some(previous),
            up: None,
            down: None,
        });
        self.nodes.get_mut(previous).next = Some(node);
        match next {
            Some(next) => self.nodes.get_mut(next).prev = Some(node),
            None => self.tail = Some(node),
        }
        if self.nodes.get(previous).prev.is_none() {
            self.begin = Some(node);
        }
        if height > 1 {
            self.insert_above(previous, height - 1, node);
        }
        node
    }

    /// Hinted insertion.  `hint` is the bottom-list node the new entry
    /// should precede (`None` for past-the-end).  A good hint splices in
    /// place; a bad one falls back to the top-down search, inserting at the
    /// lower bound when the hint lay before the key and at the upper bound
    /// when it lay after.  For the unique-key flavor an equivalent neighbor
    /// blocks the insert and its node is returned.
    pub(crate) fn insert_with_hint<P>(&mut self, hint: Option<Handle>, producer: P) -> Handle
    where
        P: EntryProducer<K, V>,
    {
        let b = hint;
        let a = match b {
            Some(b) => self.nodes.get(b).prev,
            None => self.tail,
        };
        debug_assert!(b.is_none() || a.is_some());

        if MULTI {
            if let Some(b) = b {
                if self.order.less(self.node_key(b), producer.key()) {
                    // hint lies before the key: insert at the lower bound
                    return self.insert_top_down(producer, Bias::Lower).node();
                }
            }
            if let Some(a) = a {
                if !self.nodes.get(a).is_dummy()
                    && self.order.less(producer.key(), self.node_key(a))
                {
                    // hint lies after the key: insert at the upper bound
                    return self.insert_top_down(producer, Bias::Upper).node();
                }
            }
            return self.insert_bottom_up(a, producer);
        }

        if b.map_or(true, |b| self.order.less(producer.key(), self.node_key(b))) {
            let a_fits = match a {
                None => true,
                Some(a) => {
                    self.nodes.get(a).is_dummy()
                        || self.order.less(self.node_key(a), producer.key())
                }
            };
            if a_fits {
                return self.insert_bottom_up(a, producer);
            }
            let a = a.expect("a_fits covered the empty case");
            if self.order.less(producer.key(), self.node_key(a)) {
                return self.insert_top_down(producer, Bias::Upper).node();
            }
            // equivalent to the left neighbor
            return a;
        }
        let b = b.expect("checked above");
        if self.order.less(self.node_key(b), producer.key()) {
            return self.insert_top_down(producer, Bias::Upper).node();
        }
        // equivalent to the hint itself
        b
    }

    /// Extend a column upward by `depth` nodes.  `start` is a node at the
    /// same level as `lower` (typically its left neighbor, or the top of
    /// the column itself); the walk follows `prev` until a node with an
    /// `up` link, rises, and splices right after it.
    pub(crate) fn insert_above(&mut self, start: Handle, depth: usize, lower: Handle) {
        let mut current = start;
        let mut lower = lower;
        for _ in 0..depth {
            loop {
                if let Some(up) = self.nodes.get(current).up {
                    current = up;
                    break;
                }
                match self.nodes.get(current).prev {
                    Some(prev) => current = prev,
                    // walked off the top-left corner: no list above
                    None => return,
                }
            }
            let entry = self.nodes.get(lower).entry;
            let next = self.nodes.get(current).next;
            let node = self.nodes.alloc(Node {
                entry,
                next,
                prev: Some(current),
                up: None,
                down: Some(lower),
            });
            self.nodes.get_mut(current).next = Some(node);
            if let Some(next) = next {
                self.nodes.get_mut(next).prev = Some(node);
            }
            self.nodes.get_mut(lower).up = Some(node);
            lower = node;
        }
    }
}

// ///////////////////////////////////////////////
// Erasure
// ///////////////////////////////////////////////

impl<K, V, C, const MULTI: bool> Lattice<K, V, C, MULTI>
where
    C: Comparator<K>,
{
    /// Remove every entry equivalent to `key`; returns how many were
    /// removed.
    pub(crate) fn erase_key(&mut self, key: &K) -> usize {
        let Some(found) = self.find_node(key) else {
            return 0;
        };

        let mut removed = 0;
        let mut pivot = Some(found);
        while let Some(node) = pivot {
            let down = self.nodes.get(node).down;
            let at_bottom = down.is_none();

            // sweep left over equivalent neighbors
            loop {
                let prev = self.nodes.get(node).prev.expect("data node has a predecessor");
                if self.nodes.get(prev).prev.is_none() || self.order.less(self.node_key(prev), key)
                {
                    break;
                }
                let before = self.nodes.get(prev).prev.expect("checked: prev is no dummy");
                self.nodes.get_mut(before).next = Some(node);
                self.nodes.get_mut(node).prev = Some(before);
                if at_bottom {
                    let entry = self.nodes.get(prev).entry.expect("data node has an entry");
                    self.entries.free(entry);
                    removed += 1;
                }
                self.nodes.free(prev);
            }

            // sweep right over equivalent neighbors
            while let Some(next) = self.nodes.get(node).next {
                if self.order.less(key, self.node_key(next)) {
                    break;
                }
                let after = self.nodes.get(next).next;
                self.nodes.get_mut(node).next = after;
                if let Some(after) = after {
                    self.nodes.get_mut(after).prev = Some(node);
                }
                if at_bottom {
                    let entry = self.nodes.get(next).entry.expect("data node has an entry");
                    self.entries.free(entry);
                    removed += 1;
                }
                self.nodes.free(next);
            }

            // unlink the pivot itself
            let prev = self.nodes.get(node).prev.expect("data node has a predecessor");
            let next = self.nodes.get(node).next;
            self.nodes.get_mut(prev).next = next;
            if let Some(next) = next {
                self.nodes.get_mut(next).prev = Some(prev);
            }
            if at_bottom {
                let prev_is_dummy = self.nodes.get(prev).prev.is_none() && self.nodes.get(prev).is_dummy();
                if prev_is_dummy {
                    self.begin = next;
                }
                if next.is_none() {
                    self.tail = if prev_is_dummy { None } else { Some(prev) };
                }
                let entry = self.nodes.get(node).entry.expect("data node has an entry");
                self.entries.free(entry);
                removed += 1;
            }
            self.nodes.free(node);

            pivot = down;
        }

        debug_assert!(removed > 0 && removed <= self.len);
        self.len -= removed;
        self.balanced = false;
        while self.len < self.count_min {
            self.remove_level();
        }
        removed
    }

    /// Remove the column of one bottom-list node.  Returns the successor
    /// node and the removed entry.
    pub(crate) fn erase_node(&mut self, node: Handle) -> (Option<Handle>, Entry<K, V>) {
        debug_assert!(self.nodes.get(node).down.is_none());
        self.erase_above(node);

        let (prev, next, entry) = {
            let n = self.nodes.get(node);
            (
                n.prev.expect("data node has a predecessor"),
                n.next,
                n.entry.expect("data node has an entry"),
            )
        };
        self.nodes.get_mut(prev).next = next;
        if let Some(next) = next {
            self.nodes.get_mut(next).prev = Some(prev);
        }
        if self.begin == Some(node) {
            self.begin = next;
        }
        if self.tail == Some(node) {
            self.tail = if self.nodes.get(prev).prev.is_none() && self.nodes.get(prev).is_dummy() {
                None
            } else {
                Some(prev)
            };
        }
        self.nodes.free(node);
        let entry = self.entries.take(entry);

        self.len -= 1;
        self.balanced = false;
        while self.len < self.count_min {
            self.remove_level();
        }
        (next, entry)
    }

    /// Unlink and free every node stacked above `base`, clearing its `up`
    /// link.
    pub(crate) fn erase_above(&mut self, base: Handle) {
        let mut cur = self.nodes.get(base).up;
        self.nodes.get_mut(base).up = None;
        while let Some(node) = cur {
            let (prev, next, up) = {
                let n = self.nodes.get(node);
                (
                    n.prev.expect("upper node has a left neighbor"),
                    n.next,
                    n.up,
                )
            };
            self.nodes.get_mut(prev).next = next;
            if let Some(next) = next {
                self.nodes.get_mut(next).prev = Some(prev);
            }
            self.nodes.free(node);
            cur = up;
        }
    }
}

// ///////////////////////////////////////////////
// Balancing
// ///////////////////////////////////////////////

impl<K, V, C, const MULTI: bool> Lattice<K, V, C, MULTI>
where
    C: Comparator<K>,
{
    /// Rebuild every non-bottom level into the deterministic 1-in-2ⁿ
    /// pattern, visiting each entry in order along the way.  O(n) time,
    /// O(level_count) extra space; a no-op on an already balanced lattice.
    pub(crate) fn balance_with<F>(&mut self, mut visit: F)
    where
        F: FnMut(&K, &mut V),
    {
        if self.balanced {
            return;
        }
        self.balanced = true;
        let Some(head) = self.head else {
            return;
        };

        // Tear down every non-bottom level, keeping the dummies as the
        // running tails of the rebuild.
        let mut tails: Vec<Handle> = Vec::with_capacity(self.level_count.saturating_sub(1));
        let mut level_head = head;
        while let Some(down) = self.nodes.get(level_head).down {
            let mut cur = self.nodes.get(level_head).next;
            while let Some(node) = cur {
                cur = self.nodes.get(node).next;
                self.nodes.free(node);
            }
            self.nodes.get_mut(level_head).next = None;
            tails.push(level_head);
            level_head = down;
        }
        // tails[0] becomes the second-from-bottom dummy
        tails.reverse();

        // Walk the bottom list, granting the i-th element (1-based) a
        // column of height 1 + v₂(i).
        let mut cur = self.nodes.get(level_head).next;
        let mut index = 1usize;
        while let Some(node) = cur {
            let target = self.level_of(index);
            index += 1;
            self.nodes.get_mut(node).up = None;
            let entry = self.nodes.get(node).entry;
            let mut lower = node;
            for tail in tails.iter_mut().take(target - 1) {
                let upper = self.nodes.alloc(Node {
                    entry,
                    next: None,
                    prev: Some(*tail),
                    up: None,
                    down: Some(lower),
                });
                self.nodes.get_mut(*tail).next = Some(upper);
                self.nodes.get_mut(lower).up = Some(upper);
                *tail = upper;
                lower = upper;
            }

            let entry = entry.expect("bottom-list node has an entry");
            let (key, value) = self.entries.get_mut(entry).kv_mut();
            visit(key, value);

            cur = self.nodes.get(node).next;
        }
    }

    /// In-order visit with automatic balancing: a plain walk when the
    /// lattice is already balanced, a balancing rebuild otherwise.
    pub(crate) fn for_each_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&K, &mut V),
    {
        if self.balanced {
            let mut cur = self.begin;
            while let Some(node) = cur {
                let entry = self.nodes.get(node).entry.expect("data node has an entry");
                cur = self.nodes.get(node).next;
                let (key, value) = self.entries.get_mut(entry).kv_mut();
                visit(key, value);
            }
        } else {
            self.balance_with(visit);
        }
    }

    /// Re-shape one column to the height its bottom-list index calls for:
    /// tear down the excess, or extend upward through the insert-above
    /// walk.
    pub(crate) fn balance_column(&mut self, bottom: Handle, index: usize) {
        let desired = self.level_of(index + 1);
        let mut cur = bottom;
        let mut height = 1;
        while let Some(up) = self.nodes.get(cur).up {
            if height == desired {
                self.erase_above(cur);
                return;
            }
            cur = up;
            height += 1;
        }
        if height < desired {
            self.insert_above(cur, desired - height, cur);
        }
    }

    /// Produce a balanced deep copy with a freshly seeded height source.
    pub(crate) fn clone_balanced(&self) -> Self
    where
        K: Clone,
        V: Clone,
        C: Clone,
    {
        let mut out = Lattice::with_parts(self.order.clone(), Geometric::new());
        if self.len == 0 {
            return out;
        }

        // floor(log2(len)) + 1 levels satisfies the count thresholds
        out.level_count = (usize::BITS - self.len.leading_zeros()) as usize;
        out.update_min_max();

        // the dummy column
        let mut below: Option<Handle> = None;
        let mut bottom_dummy = None;
        for _ in 0..out.level_count {
            let dummy = out.nodes.alloc(Node::dummy());
            if let Some(b) = below {
                out.nodes.get_mut(dummy).down = Some(b);
                out.nodes.get_mut(b).up = Some(dummy);
            } else {
                bottom_dummy = Some(dummy);
            }
            below = Some(dummy);
        }
        out.head = below;
        let bottom_dummy = bottom_dummy.expect("at least one level was built");

        // the bottom list, in order
        let mut prev = bottom_dummy;
        let mut cur = self.begin;
        while let Some(node) = cur {
            let entry = self.nodes.get(node).entry.expect("data node has an entry");
            let source = self.entries.get(entry);
            cur = self.nodes.get(node).next;
            let entry = out.entries.alloc(Entry {
                key: source.key.clone(),
                value: source.value.clone(),
            });
            let copy = out.nodes.alloc(Node {
                entry: Some(entry),
                next: None,
                prev: Some(prev),
                up: None,
                down: None,
            });
            out.nodes.get_mut(prev).next = Some(copy);
            prev = copy;
        }
        out.begin = out.nodes.get(bottom_dummy).next;
        out.tail = Some(prev);
        out.len = self.len;

        // grow the upper levels deterministically
        out.balanced = false;
        out.balance_with(|_, _| {});
        out
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////
