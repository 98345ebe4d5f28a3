//! Fixed-capacity circular history
//!
//! A backing slice plus head/len cursors. Capacity is fixed at
//! construction; `push` overwrites the oldest slot once full and never
//! reallocates. Index 0 is always the oldest retained item.

use crate::{MotusError, MotusResult};

/// Fixed-capacity FIFO-overwrite buffer
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Backing storage, allocated once
    slots: Box<[Option<T>]>,
    /// Next slot to write
    head: usize,
    /// Number of occupied slots
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` items
    pub fn new(capacity: usize) -> MotusResult<Self> {
        if capacity < 1 {
            return Err(MotusError::InvalidCapacity { capacity });
        }
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            len: 0,
        })
    }

    /// Append an item, overwriting the oldest one when full. O(1).
    pub fn push(&mut self, item: T) {
        let capacity = self.slots.len();
        self.slots[self.head] = Some(item);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
    }

    /// Item at logical index `index` (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let capacity = self.slots.len();
        let oldest = (self.head + capacity - self.len) % capacity;
        self.slots[(oldest + index) % capacity].as_ref()
    }

    /// Newest item
    pub fn peek(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Second-newest item
    pub fn peek_previous(&self) -> Option<&T> {
        self.len.checked_sub(2).and_then(|i| self.get(i))
    }

    /// Drop all items; capacity is unchanged
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            front: 0,
            back: self.len,
        }
    }
}

impl<T: Clone> RingBuffer<T> {
    /// The newest `n` items (all when `None`), oldest first, as owned copies
    pub fn latest(&self, n: Option<usize>) -> Vec<T> {
        let take = n.map_or(self.len, |n| n.min(self.len));
        self.iter().skip(self.len - take).cloned().collect()
    }
}

/// Oldest-to-newest iterator over a [`RingBuffer`]
pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.buffer.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.buffer.get(self.back)
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
