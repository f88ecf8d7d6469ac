// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! FIFO queue with set semantics.
//!
//! [`UniqueQueue`] is what lets the measurement passes visit every dirty node
//! of a level exactly once, even when two children push the same parent.
//!
//! Removal is lazy: membership maps each item to the sequence number of its
//! live entry in the order buffer, and entries whose sequence number no
//! longer matches are skipped on dequeue. An item removed and enqueued again
//! is therefore ordered by its new position.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::error::{Error, Result};

/// A first-in first-out queue that holds each item at most once.
#[derive(Clone, Debug)]
pub struct UniqueQueue<T> {
    order: VecDeque<(T, u64)>,
    members: HashMap<T, u64>,
    next_seq: u64,
}

impl<T> Default for UniqueQueue<T> {
    fn default() -> Self {
        Self {
            order: VecDeque::new(),
            members: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Clone + Eq + Hash> UniqueQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `item` unless it is already queued.
    ///
    /// Returns `true` if the item was added.
    pub fn enqueue(&mut self, item: T) -> bool {
        match self.members.entry(item.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                slot.insert(seq);
                self.order.push_back((item, seq));
                true
            }
        }
    }

    /// Removes and returns the oldest item still present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] if nothing is queued. Check
    /// [`is_empty`](Self::is_empty) first.
    pub fn dequeue(&mut self) -> Result<T> {
        self.pop().ok_or(Error::EmptyQueue)
    }

    /// Like [`dequeue`](Self::dequeue), but returns `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        while let Some((item, seq)) = self.order.pop_front() {
            if self.members.get(&item) == Some(&seq) {
                self.members.remove(&item);
                return Some(item);
            }
        }
        None
    }

    /// Returns the item [`dequeue`](Self::dequeue) would return.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] if nothing is queued.
    pub fn peek(&self) -> Result<&T> {
        self.order
            .iter()
            .find(|(item, seq)| self.members.get(item) == Some(seq))
            .map(|(item, _)| item)
            .ok_or(Error::EmptyQueue)
    }

    /// Returns whether `item` is queued.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.members.contains_key(item)
    }

    /// Drops `item` from the queue. Returns `true` if it was queued.
    pub fn remove(&mut self, item: &T) -> bool {
        let removed = self.members.remove(item).is_some();
        if self.members.is_empty() {
            self.order.clear();
        }
        removed
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Empties both the order and the membership structures.
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

impl<T: Clone + Eq + Hash> Extend<T> for UniqueQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.enqueue(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_is_idempotent() {
        let mut q = UniqueQueue::new();
        assert!(q.enqueue(1));
        assert!(q.enqueue(2));
        assert!(!q.enqueue(1));
        assert_eq!(q.len(), 2);
        assert_eq!(q.dequeue(), Ok(1));
        assert_eq!(q.dequeue(), Ok(2));
        assert!(q.is_empty());
    }

    #[test]
    fn dequeue_releases_membership() {
        let mut q = UniqueQueue::new();
        q.enqueue("a");
        assert_eq!(q.dequeue(), Ok("a"));
        assert!(!q.contains(&"a"));
        assert!(q.enqueue("a"), "a dequeued item can be queued again");
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn empty_queue_errors() {
        let mut q: UniqueQueue<u32> = UniqueQueue::new();
        assert_eq!(q.dequeue(), Err(Error::EmptyQueue));
        assert_eq!(q.peek(), Err(Error::EmptyQueue));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn peek_does_not_remove() {
        let mut q = UniqueQueue::new();
        q.enqueue(7);
        q.enqueue(8);
        assert_eq!(q.peek(), Ok(&7));
        assert_eq!(q.len(), 2);
        assert_eq!(q.dequeue(), Ok(7));
    }

    #[test]
    fn removed_items_are_skipped() {
        let mut q = UniqueQueue::new();
        q.extend([1, 2, 3]);
        assert!(q.remove(&1));
        assert!(!q.remove(&1));
        assert_eq!(q.peek(), Ok(&2));
        assert_eq!(q.dequeue(), Ok(2));
        assert_eq!(q.dequeue(), Ok(3));
        assert!(q.is_empty());
    }

    #[test]
    fn reenqueue_after_remove_uses_new_position() {
        let mut q = UniqueQueue::new();
        q.extend([1, 2]);
        q.remove(&1);
        q.enqueue(1);
        assert_eq!(q.dequeue(), Ok(2));
        assert_eq!(q.dequeue(), Ok(1));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn clear_empties_everything() {
        let mut q = UniqueQueue::new();
        q.extend([1, 2, 3]);
        q.clear();
        assert!(q.is_empty());
        assert!(!q.contains(&2));
        assert_eq!(q.pop(), None);
    }
}
