//! Bounded free lists for objects that churn with stream traffic.
//!
//! Streams, inbound data chunks and header lists are created and dropped far
//! more often than connections. A pool keeps up to `capacity` released
//! instances around for reuse and drops the rest, so memory stays bounded
//! while the hot path avoids reallocating.

/// Default number of instances each pool retains.
pub const FREELIST_MAX: usize = 1024;

/// Clears an instance before it is parked in a pool.
pub trait Recycle {
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl<T: Recycle + ?Sized> Recycle for Box<T> {
    fn recycle(&mut self) {
        (**self).recycle();
    }
}

#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    capacity: usize,
}

impl<T: Default + Recycle> Pool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    /// Take a recycled instance, or allocate a fresh one if none is parked.
    pub fn acquire(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    /// Return an instance. It is recycled and kept if there is room,
    /// dropped otherwise.
    pub fn release(&mut self, mut item: T) {
        if self.free.len() < self.capacity {
            item.recycle();
            self.free.push(item);
        }
    }

    /// Number of parked instances
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Default + Recycle> Default for Pool<T> {
    fn default() -> Self {
        Self::new(FREELIST_MAX)
    }
}
