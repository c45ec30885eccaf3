//! FIFO ID pools.
//!
//! Every per-owner entity family (bullets, buildings, units, players) draws
//! its 8-bit wire ID from a fixed pool. An ID is either inside exactly one
//! live entity or in the free list, never both.

use std::collections::VecDeque;
use std::sync::Mutex;

/// 8-bit identifier unique within one pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u8);

impl EntityId {
    /// Raw wire byte.
    #[inline]
    pub fn raw(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe FIFO pool of recyclable IDs.
pub struct IdPool {
    free: Mutex<VecDeque<EntityId>>,
}

impl IdPool {
    /// Create a pool holding IDs `0..count`.
    pub fn new(count: usize) -> Self {
        assert!(count <= 256, "IDs are 8-bit");
        let free = (0..count).map(|i| EntityId(i as u8)).collect();
        Self {
            free: Mutex::new(free),
        }
    }

    /// Pop the oldest free ID, or `None` when the pool is exhausted.
    pub fn acquire(&self) -> Option<EntityId> {
        self.free.lock().unwrap().pop_front()
    }

    /// Return an ID to the back of the free list.
    pub fn release(&self, id: EntityId) {
        self.free.lock().unwrap().push_back(id);
    }

    /// Number of IDs currently free.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_in_fifo_order() {
        let pool = IdPool::new(4);
        assert_eq!(pool.acquire(), Some(EntityId(0)));
        assert_eq!(pool.acquire(), Some(EntityId(1)));
        pool.release(EntityId(0));
        assert_eq!(pool.acquire(), Some(EntityId(2)));
        assert_eq!(pool.acquire(), Some(EntityId(3)));
        // Recycled ID comes back last.
        assert_eq!(pool.acquire(), Some(EntityId(0)));
        assert_eq!(pool.acquire(), None);
    }

    #[test]
    fn exhausted_pool_fails_instead_of_wrapping() {
        let pool = IdPool::new(1);
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn release_restores_capacity() {
        let pool = IdPool::new(2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(b);
        pool.release(a);
        assert_eq!(pool.available(), 2);
    }
}
