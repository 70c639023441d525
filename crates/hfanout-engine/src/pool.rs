//! Connection slot pool.
//!
//! A fixed arena of reusable [`Connection`] objects plus a LIFO free stack
//! of indices. The most recently released slot is the next one acquired,
//! which keeps a small working set of slots hot (and favors OS-level reuse
//! of frequently exercised transfer handles).
//!
//! All operations are O(1). `acquire` never blocks: callers check
//! `available()` before dequeuing that many requests.

use crate::connection::Connection;

/// Fixed-capacity pool of connection slots addressed by index.
pub struct ConnectionPool {
    slots: Vec<Connection>,
    /// LIFO stack of free slot indices.
    free: Vec<usize>,
    /// Per-slot free flag, kept in lockstep with `free` so release guards
    /// stay O(1).
    is_free: Vec<bool>,
}

impl ConnectionPool {
    /// All slots are allocated up front; capacity equals the configured
    /// parallelism and never changes.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Connection::new()).collect();
        // Reverse so the first acquire hands out slot 0.
        let free = (0..capacity).rev().collect();
        Self {
            slots,
            free,
            is_free: vec![true; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Capacity minus in-use count.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Hand out a free slot index, or `None` when all slots are busy.
    pub fn acquire(&mut self) -> Option<usize> {
        let idx = self.free.pop()?;
        self.is_free[idx] = false;
        Some(idx)
    }

    /// Return a slot to the free stack.
    ///
    /// Guarded: releasing an out-of-range or already-free index is a
    /// logged no-op, so the free stack can never outgrow the arena.
    pub fn release(&mut self, idx: usize) {
        if idx >= self.slots.len() || self.is_free[idx] {
            log::error!("bogus release of slot {}", idx);
            return;
        }
        self.is_free[idx] = true;
        self.free.push(idx);
    }

    pub fn get(&self, idx: usize) -> Option<&Connection> {
        self.slots.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Connection> {
        self.slots.get_mut(idx)
    }
}
