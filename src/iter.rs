//! Cursors and iterators.
//!
//! Three ways of looking at a container:
//!
//! - [`Cursor`] — a copyable position on the bottom list, navigated through
//!   the owning container.  Never mutates anything.
//! - [`Iter`] (with [`Keys`], [`Values`]) and [`IntoIter`] — ordered
//!   traversal in the standard iterator protocol.
//! - [`BalancingIter`] — a traversal that holds the container exclusively
//!   and re-shapes each column it passes over; a complete sweep leaves the
//!   container balanced.

use crate::arena::{Arena, Handle};
use crate::compare::Comparator;
use crate::lattice::Lattice;
use crate::node::{Entry, Node};

// ////////////////////////////////////////////////////////////////////////////
// Cursor
// ////////////////////////////////////////////////////////////////////////////

/// A position on the bottom list of a [`SkipMap`](crate::SkipMap) or
/// [`SkipMultimap`](crate::SkipMultimap): either a specific element or the
/// past-the-end position.
///
/// A cursor is a plain value; dereferencing and navigation go through the
/// owning container (`entry`, `advance`, `retreat`, ...), which checks that
/// the cursor actually belongs to it.  A cursor is invalidated when its
/// element is removed; a stale cursor is detected and treated as
/// past-the-end rather than resolving to an unrelated element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub(crate) node: Option<Handle>,
    pub(crate) owner: u64,
}

impl Cursor {
    /// Whether this is the past-the-end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Iter
// ////////////////////////////////////////////////////////////////////////////

/// A double-ended iterator over the entries of a container, in key order.
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<Node>,
    entries: &'a Arena<Entry<K, V>>,
    first: Option<Handle>,
    last: Option<Handle>,
    remaining: Option<usize>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn full<C, const MULTI: bool>(lattice: &'a Lattice<K, V, C, MULTI>) -> Self {
        Iter {
            nodes: &lattice.nodes,
            entries: &lattice.entries,
            first: lattice.begin,
            last: lattice.tail,
            remaining: Some(lattice.len),
        }
    }

    /// Iterator over `[from, to)` given bottom-list nodes; `None` stands
    /// for past-the-end.
    pub(crate) fn between<C, const MULTI: bool>(
        lattice: &'a Lattice<K, V, C, MULTI>,
        from: Option<Handle>,
        to: Option<Handle>,
    ) -> Self {
        let last = match to {
            Some(to) if from == Some(to) => None,
            Some(to) => {
                let prev = lattice
                    .nodes
                    .get(to)
                    .prev
                    .expect("data node has a predecessor");
                if lattice.nodes.get(prev).is_dummy() {
                    None
                } else {
                    Some(prev)
                }
            }
            None => lattice.tail,
        };
        let (first, last) = match (from, last) {
            (Some(first), Some(last)) => (Some(first), Some(last)),
            _ => (None, None),
        };
        Iter {
            nodes: &lattice.nodes,
            entries: &lattice.entries,
            first,
            last,
            remaining: None,
        }
    }

    fn kv(&self, node: Handle) -> (&'a K, &'a V) {
        let entry = self.nodes.get(node).entry.expect("data node has an entry");
        self.entries.get(entry).kv()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.first?;
        if Some(node) == self.last {
            self.first = None;
            self.last = None;
        } else {
            self.first = self.nodes.get(node).next;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(self.kv(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(remaining) => (remaining, Some(remaining)),
            None => (0, None),
        }
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.last?;
        if Some(node) == self.first {
            self.first = None;
            self.last = None;
        } else {
            self.last = self.nodes.get(node).prev;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(self.kv(node))
    }
}

/// Iterator over the keys of a container, in order.
pub struct Keys<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(key, _)| key)
    }
}

/// Iterator over the values of a container, in key order.
pub struct Values<'a, K, V>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, value)| value)
    }
}

// ////////////////////////////////////////////////////////////////////////////
// IntoIter
// ////////////////////////////////////////////////////////////////////////////

/// A consuming iterator over the entries of a container, in key order.
pub struct IntoIter<K, V> {
    nodes: Arena<Node>,
    entries: Arena<Entry<K, V>>,
    first: Option<Handle>,
    last: Option<Handle>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn from_lattice<C, const MULTI: bool>(lattice: Lattice<K, V, C, MULTI>) -> Self {
        IntoIter {
            first: lattice.begin,
            last: lattice.tail,
            remaining: lattice.len,
            nodes: lattice.nodes,
            entries: lattice.entries,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.first?;
        if Some(node) == self.last {
            self.first = None;
            self.last = None;
        } else {
            self.first = self.nodes.get(node).next;
        }
        self.remaining -= 1;
        let entry = self.nodes.get(node).entry.expect("data node has an entry");
        Some(self.entries.take(entry).into_kv())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.last?;
        if Some(node) == self.first {
            self.first = None;
            self.last = None;
        } else {
            self.last = self.nodes.get(node).prev;
        }
        self.remaining -= 1;
        let entry = self.nodes.get(node).entry.expect("data node has an entry");
        Some(self.entries.take(entry).into_kv())
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

// ////////////////////////////////////////////////////////////////////////////
// BalancingIter
// ////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StartTag {
    Beginning,
    End,
    Unknown,
}

/// A traversal that balances each column it passes over.
///
/// The iterator owns an exclusive borrow of the container, so no other
/// access (and in particular no structural mutation) can overlap with it;
/// this is the compile-time form of the rule that a balancing traversal is
/// invalidated by any mutation.  As it moves through an element it gives
/// the column the height a balanced lattice assigns to that position,
/// tearing down or extending as needed.  A sweep that started at the front
/// and runs past the last element (or started at the back and reaches the
/// first) has visited every column and marks the whole container balanced,
/// at amortized O(1) per element.
///
/// A traversal started from an interior position cannot know its bottom
/// list index, so it suppresses balancing and degrades to a plain mutable
/// traversal; the same happens when the container is already balanced.
///
/// The borrows returned by [`next`](BalancingIter::next) and
/// [`next_back`](BalancingIter::next_back) are tied to the iterator, so
/// this is not a [`std::iter::Iterator`]; drive it with a `while let` loop.
pub struct BalancingIter<'a, K, V, C, const MULTI: bool> {
    lattice: &'a mut Lattice<K, V, C, MULTI>,
    /// Before the first step: the starting element (`None` meaning the
    /// position implied by the start tag).  Afterwards: the element most
    /// recently yielded, `None` past either end.
    node: Option<Handle>,
    index: usize,
    started: bool,
    start: StartTag,
    suppress: bool,
}

impl<'a, K, V, C, const MULTI: bool> BalancingIter<'a, K, V, C, MULTI>
where
    C: Comparator<K>,
{
    pub(crate) fn from_front(lattice: &'a mut Lattice<K, V, C, MULTI>) -> Self {
        let suppress = lattice.balanced;
        BalancingIter {
            lattice,
            node: None,
            index: 0,
            started: false,
            start: StartTag::Beginning,
            suppress,
        }
    }

    pub(crate) fn from_back(lattice: &'a mut Lattice<K, V, C, MULTI>) -> Self {
        let suppress = lattice.balanced;
        BalancingIter {
            lattice,
            node: None,
            index: 0,
            started: false,
            start: StartTag::End,
            suppress,
        }
    }

    pub(crate) fn from_node(
        lattice: &'a mut Lattice<K, V, C, MULTI>,
        node: Option<Handle>,
    ) -> Self {
        match node {
            None => BalancingIter::from_back(lattice),
            Some(node) if lattice.is_first(node) => BalancingIter::from_front(lattice),
            Some(node) => BalancingIter {
                lattice,
                node: Some(node),
                index: 0,
                started: false,
                start: StartTag::Unknown,
                suppress: true,
            },
        }
    }

    /// Step forward; returns the next entry, or `None` past the last one.
    /// The column of the element being left behind is balanced on the way.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(&K, &mut V)> {
        if !self.started {
            self.started = true;
            if self.node.is_none() {
                self.node = self.lattice.begin;
                self.index = 0;
            }
            self.node?;
        } else {
            let node = self.node?;
            if !self.suppress {
                self.lattice.balance_column(node, self.index);
            }
            let next = self.lattice.nodes.get(node).next;
            self.node = next;
            self.index += 1;
            if next.is_none() {
                // swept the whole container front to back
                if !self.suppress && self.start == StartTag::Beginning {
                    self.lattice.balanced = true;
                    self.suppress = true;
                }
                return None;
            }
        }
        let node = self.node.expect("positioned on an element");
        let entry = self
            .lattice
            .nodes
            .get(node)
            .entry
            .expect("data node has an entry");
        let (key, value) = self.lattice.entries.get_mut(entry).kv_mut();
        Some((key, value))
    }

    /// Step backward; returns the previous entry, or `None` when already on
    /// the first one.  The column of the element stepped onto is balanced
    /// on arrival.
    pub fn next_back(&mut self) -> Option<(&K, &mut V)> {
        if !self.started {
            self.started = true;
            if self.node.is_none() {
                self.index = self.lattice.len;
            }
        }
        let target = match self.node {
            None => self.lattice.tail,
            Some(node) => {
                if self.lattice.is_first(node) {
                    return None;
                }
                self.lattice.nodes.get(node).prev
            }
        };
        let node = target?;
        self.node = Some(node);
        // the index is only meaningful while balancing is live; an
        // interior-started traversal never reads it
        self.index = self.index.saturating_sub(1);
        if !self.suppress {
            self.lattice.balance_column(node, self.index);
            // swept the whole container back to front
            if self.start == StartTag::End && self.lattice.is_first(node) {
                self.lattice.balanced = true;
                self.suppress = true;
            }
        }
        let entry = self
            .lattice
            .nodes
            .get(node)
            .entry
            .expect("data node has an entry");
        let (key, value) = self.lattice.entries.get_mut(entry).kv_mut();
        Some((key, value))
    }
}
