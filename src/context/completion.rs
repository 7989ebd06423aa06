//! One-shot completion signal used by blocking submissions.

use std::sync::{Condvar, Mutex, PoisonError};

/// Manual-reset event: once set it stays set and releases every waiter.
pub(crate) struct Completion {
    done: Mutex<bool>,
    signal: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            done: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    pub(crate) fn set(&self) {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.signal.notify_all();
    }

    /// Blocks the calling thread until [`set`](Self::set) has been called.
    pub(crate) fn wait(&self) {
        let done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        let _done = self
            .signal
            .wait_while(done, |done| !*done)
            .unwrap_or_else(PoisonError::into_inner);
    }

    #[cfg(test)]
    pub(crate) fn is_set(&self) -> bool {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
