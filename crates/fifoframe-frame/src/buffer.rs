//! Growable byte buffer with the reassembler's grow and shrink policy.
//!
//! Bytes are consumed from the front by advancing a read cursor. The consumed
//! prefix is reclaimed lazily, either when an append would otherwise need to
//! grow the allocation or when the buffer is shrunk.
//!
//! Growth doubles capacity, with a floor that always fits the pending append.
//! Shrinking halves capacity once the live bytes drop below a quarter of it, and
//! never goes below the configured minimum. The gap between the two thresholds
//! keeps a buffer from bouncing between grow and shrink on small fluctuations.

use crate::error::{FrameError, Result};

/// Owned byte buffer with a front read cursor.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
    head: usize,
}

impl GrowableBuffer {
    /// An empty buffer with no allocation.
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            head: 0,
        }
    }

    /// Number of live (unconsumed) bytes.
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently allocated.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// The live bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.head..]
    }

    /// Append `bytes`, growing the allocation if needed.
    ///
    /// New capacity is `max(len + bytes.len(), capacity * 2)`. Allocation
    /// failure leaves the buffer unchanged and returns
    /// [`FrameError::Allocation`].
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Make room for `additional` more live bytes using the growth policy.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        if self.data.len().saturating_add(additional) <= self.data.capacity() {
            return Ok(());
        }

        self.compact();
        let needed = self
            .data
            .len()
            .checked_add(additional)
            .ok_or(FrameError::Allocation {
                requested: usize::MAX,
            })?;
        if needed > self.data.capacity() {
            let target = needed.max(self.data.capacity().saturating_mul(2));
            self.data
                .try_reserve_exact(target - self.data.len())
                .map_err(|_| FrameError::Allocation { requested: target })?;
        }
        Ok(())
    }

    /// Drop `n` bytes from the front.
    ///
    /// Panics if `n` exceeds [`len`](Self::len).
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "consume past end of buffer");
        self.head += n;
        if self.head == self.data.len() {
            self.data.clear();
            self.head = 0;
        }
    }

    /// Move the live bytes to the start of the allocation.
    pub fn compact(&mut self) {
        if self.head > 0 {
            self.data.drain(..self.head);
            self.head = 0;
        }
    }

    /// Apply the shrink policy. Returns true if capacity was reduced.
    ///
    /// When capacity exceeds `min_capacity` and fewer than a quarter of it is
    /// live, capacity drops to `max(len, capacity / 2)`, clamped so it never
    /// falls below `min_capacity`.
    pub fn shrink(&mut self, min_capacity: usize) -> bool {
        self.compact();
        let capacity = self.data.capacity();
        let len = self.data.len();
        if capacity > min_capacity && len < capacity / 4 {
            self.data
                .shrink_to(len.max(capacity / 2).max(min_capacity));
            return self.data.capacity() < capacity;
        }
        false
    }

    /// Discard all bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Discard all bytes and free the allocation.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.head = 0;
    }
}
