//! Frame-scoped pool of reusable temporaries.

use std::collections::VecDeque;

/// A value that can be emptied for reuse while keeping its allocation.
pub trait Recycle {
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl<T> Recycle for VecDeque<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl Recycle for String {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// Hands out reusable values for the duration of one frame.
///
/// [`next`](Self::next) returns the next slot emptied with
/// [`Recycle::recycle`], which keeps its capacity; slots are only created when
/// the pool runs dry, so after warm-up a frame does no allocation. [`reset`](Self::reset) rewinds the cursor without freeing
/// and is meant to run from [`FrameContext::reset_scratch`](crate::FrameContext::reset_scratch).
#[derive(Debug)]
pub struct ScratchPool<T> {
    items: Vec<T>,
    cursor: usize,
    high_water: usize,
}

impl<T: Default + Recycle> ScratchPool<T> {
    /// Create a pool with `capacity` preallocated slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, T::default);
        Self {
            items,
            cursor: 0,
            high_water: 0,
        }
    }

    /// Take the next slot for this frame.
    pub fn next(&mut self) -> &mut T {
        if self.cursor == self.items.len() {
            log::debug!("scratch pool grew to {}", self.items.len() + 1);
            self.items.push(T::default());
        }
        let slot = &mut self.items[self.cursor];
        slot.recycle();
        self.cursor += 1;
        self.high_water = self.high_water.max(self.cursor);
        slot
    }

    /// Return every slot to the pool.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Slots handed out since the last reset.
    pub fn in_use(&self) -> usize {
        self.cursor
    }

    /// Most slots ever in use within one frame.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Allocated slots.
    pub fn capacity(&self) -> usize {
        self.items.len()
    }
}

impl<T: Default + Recycle> Default for ScratchPool<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_reuses_slots() {
        let mut pool: ScratchPool<Vec<u32>> = ScratchPool::with_capacity(2);
        pool.next().push(1);
        pool.next().push(2);
        assert_eq!(pool.in_use(), 2);
        pool.reset();
        assert_eq!(pool.in_use(), 0);
        assert!(pool.next().is_empty(), "slot must come back clean");
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn test_reset_keeps_slot_allocation() {
        let mut pool: ScratchPool<Vec<u32>> = ScratchPool::with_capacity(1);
        pool.next().extend(0..1000);
        pool.reset();
        let slot = pool.next();
        assert!(slot.is_empty());
        assert!(slot.capacity() >= 1000);
    }

    #[test]
    fn test_grows_when_exhausted() {
        let mut pool: ScratchPool<String> = ScratchPool::default();
        for i in 0..5 {
            pool.next().push_str(&i.to_string());
        }
        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.high_water(), 5);
        pool.reset();
        pool.next();
        assert_eq!(pool.high_water(), 5);
        assert_eq!(pool.capacity(), 5);
    }
}
