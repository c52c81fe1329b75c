//! Deadline-ordered queue of deferred actions.
//!
//! This module provides `DeadlineQueue`, a binary min-heap keyed by `(deadline, sequence)`.
//! The sequence number is minted per queue at insertion, so actions sharing a deadline
//! elapse in the order they were scheduled.
use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    iter::FusedIterator,
};

use super::Timestamp;

/// A pending action together with its ordering key.
#[derive(Debug)]
struct Scheduled<T, A> {
    deadline: T,
    sequence: u64,
    action: A,
}

impl<T: Ord, A> PartialEq for Scheduled<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord, A> Eq for Scheduled<T, A> {}

impl<T: Ord, A> PartialOrd for Scheduled<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord, A> Ord for Scheduled<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Clock-agnostic queue deferring actions until their deadline elapses.
#[derive(Debug)]
pub struct DeadlineQueue<T: Timestamp, A> {
    heap: BinaryHeap<Reverse<Scheduled<T, A>>>,
    sequence: u64,
}

impl<T: Timestamp, A> Default for DeadlineQueue<T, A> {
    fn default() -> Self {
        DeadlineQueue::new()
    }
}

impl<T: Timestamp, A> DeadlineQueue<T, A> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            sequence: 0,
        }
    }

    /// Defer `action` until `deadline`. Deadlines may be scheduled in any order.
    pub fn schedule(&mut self, deadline: T, action: A) {
        self.sequence += 1;
        self.heap.push(Reverse(Scheduled {
            deadline,
            sequence: self.sequence,
            action,
        }));
    }

    /// Earliest pending deadline, or `None` when nothing is scheduled.
    ///
    /// Hosts use this to work out how long they may block before the next action is due.
    pub fn next_deadline(&self) -> Option<T> {
        self.heap.peek().map(|entry| entry.0.deadline)
    }

    /// Remove and return the earliest action if its deadline is at or before `now`.
    pub fn pop_elapsed(&mut self, now: T) -> Option<A> {
        if self.next_deadline()? > now {
            return None;
        }
        self.heap.pop().map(|entry| entry.0.action)
    }

    /// Drain every action whose deadline is at or before `now`, earliest first and in
    /// insertion order among equal deadlines.
    ///
    /// Each yielded action is removed from the queue. Dropping the iterator early leaves
    /// the remaining actions in place.
    pub fn elapsed(&mut self, now: T) -> Elapsed<'_, T, A> {
        Elapsed { queue: self, now }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Draining iterator returned by [`DeadlineQueue::elapsed`].
#[derive(Debug)]
pub struct Elapsed<'a, T: Timestamp, A> {
    queue: &'a mut DeadlineQueue<T, A>,
    now: T,
}

impl<T: Timestamp, A> Iterator for Elapsed<'_, T, A> {
    type Item = A;

    fn next(&mut self) -> Option<A> {
        self.queue.pop_elapsed(self.now)
    }
}

// nothing can be scheduled through the exclusive borrow, so an exhausted drain stays exhausted
impl<T: Timestamp, A> FusedIterator for Elapsed<'_, T, A> {}
