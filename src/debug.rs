//! Read-only structure inspection for tests and debugging.
//!
//! These functions walk the whole node graph and either re-check every
//! structural invariant ([`validate_map`], [`validate_multimap`]) or report
//! its shape ([`survey_map`], [`survey_multimap`]).  They never mutate the
//! container and are deliberately oblivious to how the graph was produced,
//! which makes them a useful oracle: every test mutation can be followed by
//! a validation pass.

use std::collections::HashSet;

use thiserror::Error;

use crate::compare::Comparator;
use crate::lattice::Lattice;
use crate::skipmap::SkipMap;
use crate::skipmultimap::SkipMultimap;

/// A structural invariant did not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("skiplist invariant violated: {reason}")]
pub struct Violation {
    reason: String,
}

/// The shape of a container's node graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Survey {
    /// Number of horizontal lists.
    pub level_count: usize,
    /// Total number of nodes, dummies included.
    pub node_count: usize,
    /// Column height of each element, in bottom-list order.
    pub column_heights: Vec<usize>,
}

/// Validate the full node graph of a [`SkipMap`].
pub fn validate_map<K, V, C>(map: &SkipMap<K, V, C>) -> Result<(), Violation>
where
    C: Comparator<K>,
{
    validate_lattice(&map.core)
}

/// Validate the full node graph of a [`SkipMultimap`].
pub fn validate_multimap<K, V, C>(map: &SkipMultimap<K, V, C>) -> Result<(), Violation>
where
    C: Comparator<K>,
{
    validate_lattice(&map.core)
}

/// Report the graph shape of a [`SkipMap`].
pub fn survey_map<K, V, C>(map: &SkipMap<K, V, C>) -> Survey {
    survey_lattice(&map.core)
}

/// Report the graph shape of a [`SkipMultimap`].
pub fn survey_multimap<K, V, C>(map: &SkipMultimap<K, V, C>) -> Survey {
    survey_lattice(&map.core)
}

fn survey_lattice<K, V, C, const MULTI: bool>(lattice: &Lattice<K, V, C, MULTI>) -> Survey {
    let mut column_heights = Vec::with_capacity(lattice.len);
    let mut cur = lattice.begin;
    while let Some(node) = cur {
        let mut height = 1;
        let mut top = node;
        while let Some(up) = lattice.nodes.get(top).up {
            top = up;
            height += 1;
        }
        column_heights.push(height);
        cur = lattice.nodes.get(node).next;
    }
    Survey {
        level_count: lattice.level_count,
        node_count: lattice.nodes.len(),
        column_heights,
    }
}

macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !($cond) {
            return Err(Violation {
                reason: format!($($msg)*),
            });
        }
    };
}

fn violation(reason: &str) -> Violation {
    Violation {
        reason: reason.to_owned(),
    }
}

fn validate_lattice<K, V, C, const MULTI: bool>(
    lattice: &Lattice<K, V, C, MULTI>,
) -> Result<(), Violation>
where
    C: Comparator<K>,
{
    let Some(head) = lattice.head else {
        ensure!(lattice.tail.is_none(), "empty lattice still has a tail");
        ensure!(lattice.begin.is_none(), "empty lattice still has a begin");
        ensure!(lattice.len == 0, "headless lattice reports len {}", lattice.len);
        ensure!(
            lattice.level_count == 0,
            "headless lattice reports {} levels",
            lattice.level_count
        );
        return Ok(());
    };

    ensure!(lattice.len > 0, "lattice with a head but len 0");
    ensure!(
        lattice.count_min <= lattice.len && lattice.len <= lattice.count_max,
        "len {} outside [{}, {}]",
        lattice.len,
        lattice.count_min,
        lattice.count_max
    );

    let mut visited = HashSet::new();

    // The leftmost column: dummies only, as tall as the level count.
    ensure!(
        lattice.nodes.get(head).up.is_none(),
        "head is not the topmost dummy"
    );
    let mut column_len = 0;
    let mut bottom_dummy = head;
    let mut cur = Some(head);
    while let Some(node) = cur {
        let n = lattice.nodes.get(node);
        ensure!(
            n.is_dummy() && n.prev.is_none(),
            "leftmost column holds a non-dummy node"
        );
        if let Some(up) = n.up {
            ensure!(
                lattice.nodes.get(up).down == Some(node),
                "dummy up/down links disagree"
            );
        }
        if let Some(down) = n.down {
            ensure!(
                lattice.nodes.get(down).up == Some(node),
                "dummy down/up links disagree"
            );
        }
        ensure!(visited.insert(node), "dummy column revisits a node");
        bottom_dummy = node;
        cur = n.down;
        column_len += 1;
    }
    ensure!(
        column_len == lattice.level_count,
        "dummy column height {} != level count {}",
        column_len,
        lattice.level_count
    );

    // The bottom list: sorted, fully linked, and of the advertised length.
    ensure!(
        lattice.nodes.get(bottom_dummy).next == lattice.begin,
        "begin does not follow the bottom dummy"
    );
    let mut count = 0;
    let mut last = None;
    let mut cur = lattice.begin;
    while let Some(node) = cur {
        let n = lattice.nodes.get(node);
        ensure!(!n.is_dummy(), "entry-less node in the bottom list");
        ensure!(n.down.is_none(), "bottom-list node has a down link");
        let Some(prev) = n.prev else {
            return Err(violation("bottom-list node without a predecessor"));
        };
        ensure!(
            lattice.nodes.get(prev).next == Some(node),
            "bottom next/prev links disagree"
        );
        if !lattice.nodes.get(prev).is_dummy() {
            ensure!(
                !lattice.order.less(lattice.node_key(node), lattice.node_key(prev)),
                "bottom list out of order at position {}",
                count
            );
            if !MULTI {
                ensure!(
                    lattice.order.less(lattice.node_key(prev), lattice.node_key(node)),
                    "adjacent equivalent keys in a unique-key container"
                );
            }
        }
        if let Some(up) = n.up {
            ensure!(
                lattice.nodes.get(up).down == Some(node),
                "column up/down links disagree"
            );
        }
        count += 1;
        if lattice.balanced {
            let mut height = 1;
            let mut top = node;
            while let Some(up) = lattice.nodes.get(top).up {
                top = up;
                height += 1;
            }
            ensure!(
                height == lattice.level_of(count),
                "balanced column {} has height {} instead of {}",
                count,
                height,
                lattice.level_of(count)
            );
        }
        ensure!(visited.insert(node), "bottom list revisits a node");
        last = Some(node);
        cur = n.next;
    }
    ensure!(
        count == lattice.len,
        "bottom list holds {} entries, len says {}",
        count,
        lattice.len
    );
    ensure!(last == lattice.tail, "tail is not the last bottom-list node");

    // Every upper level: sorted, linked both ways, one entry per column.
    let mut level_head = Some(head);
    while let Some(dummy) = level_head {
        let down_head = lattice.nodes.get(dummy).down;
        if down_head.is_some() {
            let mut cur = lattice.nodes.get(dummy).next;
            while let Some(node) = cur {
                let n = lattice.nodes.get(node);
                ensure!(!n.is_dummy(), "upper-level node without an entry");
                let Some(down) = n.down else {
                    return Err(violation("upper-level node without a down link"));
                };
                ensure!(
                    lattice.nodes.get(down).up == Some(node),
                    "column down/up links disagree"
                );
                ensure!(
                    lattice.nodes.get(down).entry == n.entry,
                    "column nodes do not share one entry"
                );
                let Some(prev) = n.prev else {
                    return Err(violation("upper-level node without a predecessor"));
                };
                ensure!(
                    lattice.nodes.get(prev).next == Some(node),
                    "upper next/prev links disagree"
                );
                if !lattice.nodes.get(prev).is_dummy() {
                    ensure!(
                        !lattice.order.less(lattice.node_key(node), lattice.node_key(prev)),
                        "upper list out of order"
                    );
                    if !MULTI {
                        ensure!(
                            lattice.order.less(lattice.node_key(prev), lattice.node_key(node)),
                            "adjacent equivalent keys in an upper list"
                        );
                    }
                }
                ensure!(visited.insert(node), "upper level revisits a node");
                cur = n.next;
            }
        }
        level_head = down_head;
    }

    ensure!(
        visited.len() == lattice.nodes.len(),
        "arena holds {} nodes but only {} are reachable",
        lattice.nodes.len(),
        visited.len()
    );
    Ok(())
}
