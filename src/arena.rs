//! Generational slot arena backing the node and entry storage.
//!
//! The skiplist graph is a web of `next`/`prev`/`up`/`down` cycles which
//! defies tree-shaped ownership.  Instead of raw pointers, every node and
//! every entry lives in an arena and is addressed by a [`Handle`]: a slot
//! index paired with a generation counter.  Freeing a slot bumps its
//! generation, so a handle kept across a removal can be recognized as stale
//! instead of silently aliasing whatever the slot was reused for.

use std::num::NonZeroU32;

// ////////////////////////////////////////////////////////////////////////////
// Handle
// ////////////////////////////////////////////////////////////////////////////

/// An index into an [`Arena`] together with the generation of the slot at
/// the time the element was allocated.
///
/// The generation is non-zero, so `Option<Handle>` costs no extra space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Handle {
    index: u32,
    generation: NonZeroU32,
}

// ////////////////////////////////////////////////////////////////////////////
// Arena
// ////////////////////////////////////////////////////////////////////////////

struct Slot<T> {
    generation: u32,
    payload: Option<T>,
}

/// A vector of slots with a free list.  Freed slots are reused in LIFO
/// order; each reuse advances the slot generation.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live elements.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Store an element, reusing a free slot if one is available.
    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.payload.is_none());
            slot.payload = Some(element);
            Handle {
                index,
                generation: NonZeroU32::new(slot.generation).expect("slot generation is never zero"),
            }
        } else {
            assert!(
                self.slots.len() < u32::MAX as usize,
                "arena is at maximum capacity"
            );
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                payload: Some(element),
            });
            Handle {
                index,
                generation: NonZeroU32::new(1).expect("1 is non-zero"),
            }
        }
    }

    /// Whether the handle still refers to a live element.
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index as usize)
            .map_or(false, |slot| {
                slot.generation == handle.generation.get() && slot.payload.is_some()
            })
    }

    /// # Panics
    ///
    /// Panics if the handle is stale or from another arena.
    pub(crate) fn get(&self, handle: Handle) -> &T {
        let slot = &self.slots[handle.index as usize];
        assert!(slot.generation == handle.generation.get(), "stale handle");
        slot.payload.as_ref().expect("stale handle")
    }

    /// # Panics
    ///
    /// Panics if the handle is stale or from another arena.
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        let slot = &mut self.slots[handle.index as usize];
        assert!(slot.generation == handle.generation.get(), "stale handle");
        slot.payload.as_mut().expect("stale handle")
    }

    /// Remove an element, returning it and retiring the handle.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let slot = &mut self.slots[handle.index as usize];
        assert!(slot.generation == handle.generation.get(), "stale handle");
        let element = slot.payload.take().expect("stale handle");
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation == 0 {
            slot.generation = 1;
        }
        self.free.push(handle.index);
        element
    }

    /// Remove and drop an element.
    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena::new()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::Arena;

    #[test]
    fn alloc_get_take() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        assert_eq!(arena.len(), 2);
        assert_eq!(*arena.get(a), 1);
        assert_eq!(*arena.get(b), 2);
        *arena.get_mut(a) = 10;
        assert_eq!(arena.take(a), 10);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn stale_handles_are_detected() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc(1);
        arena.free(a);
        assert!(!arena.contains(a));

        // The slot is reused, but with a new generation.
        let b = arena.alloc(2);
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(*arena.get(b), 2);
    }

    #[test]
    #[should_panic(expected = "stale handle")]
    fn get_stale_panics() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc(1);
        arena.free(a);
        let _ = arena.get(a);
    }

    proptest! {
        /// Random alloc/free/update sequences keep the arena consistent
        /// with a plain vector model.
        #[test]
        fn behaves_like_model(ops in proptest::collection::vec(0u8..4, 0..512)) {
            let mut arena: Arena<u64> = Arena::new();
            let mut model: Vec<(super::Handle, u64)> = Vec::new();
            let mut counter = 0u64;

            for op in ops {
                match op {
                    0 | 1 => {
                        counter += 1;
                        let handle = arena.alloc(counter);
                        model.push((handle, counter));
                    }
                    2 if !model.is_empty() => {
                        let (handle, value) = model.swap_remove(counter as usize % model.len());
                        prop_assert_eq!(arena.take(handle), value);
                    }
                    3 if !model.is_empty() => {
                        let index = counter as usize % model.len();
                        counter += 1;
                        *arena.get_mut(model[index].0) = counter;
                        model[index].1 = counter;
                    }
                    _ => {}
                }
                prop_assert_eq!(arena.len(), model.len());
                for &(handle, value) in &model {
                    prop_assert!(arena.contains(handle));
                    prop_assert_eq!(*arena.get(handle), value);
                }
            }
        }
    }
}
