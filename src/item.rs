//! Work item carried through an execution context's queue.
//!
//! A work item bundles the callback (with its state already bound), the context
//! that owns it, and for blocking submissions the completion signal the
//! submitting thread is waiting on.
//!
//! # Lifecycle
//!
//! 1. Created on the producer thread by `post` or `send`
//! 2. Pushed onto the context's [`WorkQueue`](crate::context::queue::WorkQueue)
//! 3. Popped exactly once by the worker thread and run
//! 4. Dropped right after the callback finishes, which sets the completion signal

use crate::context::ExecutionContext;
use crate::context::completion::Completion;
use crate::context::worker;

use std::sync::Arc;

/// A callback with its state already bound.
pub(crate) type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Unit of scheduled work.
///
/// The completion signal is set when the item is dropped, whether it ran, its
/// callback panicked, or it was rejected by a closed queue. A blocked `send`
/// caller is therefore never left waiting on an item that no longer exists.
pub(crate) struct WorkItem {
    callback: Option<Callback>,
    context: ExecutionContext,
    completion: Option<Arc<Completion>>,
}

impl WorkItem {
    /// Creates a fire-and-forget item with no completion signal.
    pub(crate) fn new<F, S>(context: ExecutionContext, callback: F, state: S) -> Self
    where
        F: FnOnce(S) + Send + 'static,
        S: Send + 'static,
    {
        Self {
            callback: Some(Box::new(move || callback(state))),
            context,
            completion: None,
        }
    }

    /// Creates a blocking item and returns the completion signal to wait on.
    pub(crate) fn blocking<F, S>(
        context: ExecutionContext,
        callback: F,
        state: S,
    ) -> (Self, Arc<Completion>)
    where
        F: FnOnce(S) + Send + 'static,
        S: Send + 'static,
    {
        let completion = Arc::new(Completion::new());
        let mut item = Self::new(context, callback, state);
        item.completion = Some(completion.clone());

        (item, completion)
    }

    /// Runs the callback under the owning context, consuming the item.
    pub(crate) fn run(mut self) {
        if let Some(callback) = self.callback.take() {
            worker::invoke(&self.context, callback);
        }
    }
}

impl Drop for WorkItem {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion.set();
        }
    }
}
