//! Time-ordered event queue.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tokio::time::Instant;

/// A pending task with its absolute fire time.
#[derive(Debug)]
pub struct Event<T> {
    pub at: Instant,
    pub priority: u8,
    seq: u64,
    pub task: T,
}

impl<T> Event<T> {
    fn key(&self) -> (Instant, u8, u64) {
        (self.at, self.priority, self.seq)
    }
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for Event<T> {}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// The only thing a handler may do to the scheduler: add an event.
pub trait Schedule<T> {
    fn enqueue(&mut self, at: Instant, priority: u8, task: T);
}

/// Min-queue of events ordered by fire time, then priority, then
/// insertion order.
#[derive(Debug)]
pub struct EventQueue<T> {
    heap: BinaryHeap<Reverse<Event<T>>>,
    next_seq: u64,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Fire time of the earliest event.
    pub fn peek_at(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(e)| e.at)
    }

    pub fn pop(&mut self) -> Option<Event<T>> {
        self.heap.pop().map(|Reverse(e)| e)
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schedule<T> for EventQueue<T> {
    fn enqueue(&mut self, at: Instant, priority: u8, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Event { at, priority, seq, task }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_orders_by_time_then_priority_then_insertion() {
        let base = Instant::now();
        let mut queue = EventQueue::new();
        queue.enqueue(base + Duration::from_secs(5), 1, "late");
        queue.enqueue(base + Duration::from_secs(1), 1, "first-a");
        queue.enqueue(base + Duration::from_secs(1), 0, "urgent");
        queue.enqueue(base + Duration::from_secs(1), 1, "first-b");
        queue.enqueue(base + Duration::from_secs(1), 1, "first-c");

        assert_eq!(queue.len(), 5);
        assert_eq!(queue.peek_at(), Some(base + Duration::from_secs(1)));

        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|e| e.task).collect();
        assert_eq!(order, vec!["urgent", "first-a", "first-b", "first-c", "late"]);
        assert!(queue.is_empty());
        assert_eq!(queue.peek_at(), None);
    }
}
