//! Ordered maps on a *self-balancing* skiplist.
//!
//! A skiplist stores sorted elements in a stack of linked lists so that
//! they can be found, inserted and removed in `O(log n)` on average:
//!
//! ```text
//! <head> ----------> [2] --------------------------------------------------> [9] ---------->
//! <head> ----------> [2] ------------------------------------[7] ----------> [9] ---------->
//! <head> ----------> [2] ----------> [4] ------------------> [7] ----------> [9] --> [10] ->
//! <head> --> [1] --> [2] --> [3] --> [4] --> [5] --> [6] --> [7] --> [8] --> [9] --> [10] ->
//! ```
//!
//! The bottom list holds every entry; each level above holds a subset of
//! the one below, normally a random half.  This crate adds two things on
//! top of the classic structure:
//!
//! - **Deterministic balancing.**  [`SkipMap::balance`] (and a full sweep
//!   of a [`BalancingIter`]) rebuilds the levels into the perfectly
//!   regular shape — every element in level 1, every 2nd in level 2,
//!   every 4th in level 3, ... — so searches meet the `log2(n)` bound
//!   exactly rather than in expectation.  The level count itself tracks
//!   the element count, growing and shrinking so that
//!   `2^(levels - 1) <= len < 2^levels`.
//! - **Hinted insertion.**  Inserting through a correct [`Cursor`] hint
//!   splices bottom-up in amortized `O(1)`.
//!
//! Two containers share the machinery: [`SkipMap`] keeps keys unique,
//! [`SkipMultimap`] keeps duplicates in a stable, contiguous run.
//!
//! # Safety
//!
//! The node graph lives in a generational arena and is addressed by
//! handles, not pointers; the crate contains no unsafe code.  Correctness
//! still relies on a well-behaved comparator: see [`compare::Comparator`]
//! for the strict-weak-order contract.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod arena;
mod iter;
mod lattice;
mod node;

pub mod compare;
pub mod debug;
pub mod level_generator;
pub mod skipmap;
pub mod skipmultimap;

pub use crate::compare::{Comparator, LessThan, OrderBy};
pub use crate::iter::{BalancingIter, Cursor, IntoIter, Iter, Keys, Values};
pub use crate::skipmap::{KeyNotFound, SkipMap};
pub use crate::skipmultimap::SkipMultimap;
