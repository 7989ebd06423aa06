//! Thread-safe blocking intake queue for work items.
//!
//! Provides a FIFO queue that any number of producers push into and the single
//! worker thread pops from, blocking while empty. Closing the queue is
//! irreversible: pushes fail afterwards, already queued items are still handed
//! out, and a blocked consumer wakes up once the queue is closed and empty.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A thread-safe, FIFO queue with blocking pop and explicit close.
///
/// Uses a Mutex-wrapped VecDeque paired with a Condvar so the consumer can sleep
/// until an item arrives or the queue is closed.
pub(crate) struct WorkQueue<T> {
    state: Mutex<Intake<T>>,
    available: Condvar,
    terminated: AtomicBool,
}

struct Intake<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> WorkQueue<T> {
    /// Creates a new empty, open queue.
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(Intake {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
            terminated: AtomicBool::new(false),
        }
    }

    /// Enqueues an item at the back of the queue.
    ///
    /// # Returns
    /// `Err(item)` if the queue has been closed. The item is handed back so the
    /// caller drops it outside the queue lock.
    pub(crate) fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.closed {
            return Err(item);
        }

        state.items.push_back(item);
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Dequeues the next item, blocking while the queue is open and empty.
    ///
    /// # Returns
    /// `Some(item)` in FIFO order, or `None` once the queue is closed and drained.
    pub(crate) fn pop(&self) -> Option<T> {
        let mut state = self.lock();

        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }

            if state.closed {
                return None;
            }

            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Closes the queue to further pushes and wakes any blocked consumer.
    ///
    /// # Returns
    /// `true` if this call closed the queue, `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.lock();
        let newly_closed = !state.closed;
        state.closed = true;
        drop(state);

        self.available.notify_all();
        newly_closed
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting to be dispatched.
    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Records that the consumer has left its loop for good.
    pub(crate) fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    // Callbacks never run under this lock, so a poisoned guard still holds a
    // consistent queue.
    fn lock(&self) -> MutexGuard<'_, Intake<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::WorkQueue;

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn pops_in_push_order() {
        let queue = WorkQueue::new();
        for i in 0..5 {
            queue.push(i).unwrap();
        }

        let popped: Vec<_> = (0..5).map(|_| queue.pop().unwrap()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn push_after_close_hands_item_back() {
        let queue = WorkQueue::new();
        assert!(queue.close());
        assert!(!queue.close(), "second close should report already closed");
        assert_eq!(queue.push("late"), Err("late"));
    }

    #[test]
    fn close_still_drains_queued_items() {
        let queue = WorkQueue::new();
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.close();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let queue = Arc::new(WorkQueue::<u32>::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.close();

        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn blocked_consumer_receives_later_push() {
        let queue = Arc::new(WorkQueue::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.push(7).unwrap();

        assert_eq!(consumer.join().unwrap(), Some(7));
    }
}
