//! Dedicated worker thread and its dispatch loop.
//!
//! Every execution context owns exactly one worker thread. The loop blocks on
//! the intake queue, runs each item under the item's context, and exits once
//! the queue is closed and empty:
//!
//! ```text
//! Waiting ──pop──▶ Dispatching ──▶ Completing ──▶ Waiting
//!    │
//!    └── closed and empty ──▶ Terminated
//! ```
//!
//! A panic escaping a callback is caught at the dispatch boundary and published
//! on the unhandled failure channel. The worker itself never unwinds.

use crate::context::queue::WorkQueue;
use crate::context::{ContextId, ExecutionContext, ambient};
use crate::item::WorkItem;
use crate::unhandled::{self, CallbackFailure};

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

/// Spawns the worker thread that drains `queue`.
///
/// # Errors
/// Propagates the OS error if the thread cannot be created.
pub(crate) fn spawn(
    id: ContextId,
    name: String,
    stack_size: Option<usize>,
    queue: Arc<WorkQueue<WorkItem>>,
) -> io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(name);
    if let Some(bytes) = stack_size {
        builder = builder.stack_size(bytes);
    }

    builder.spawn(move || run(id, &queue))
}

fn run(id: ContextId, queue: &WorkQueue<WorkItem>) {
    debug!(context_id = %id, "worker started");

    while let Some(item) = queue.pop() {
        item.run();
    }

    queue.mark_terminated();
    debug!(context_id = %id, "worker exited, queue closed and drained");
}

/// Invokes `callback` with `context` installed as ambient.
///
/// Used both by the dispatch loop and by inline `send` on the worker thread. A
/// panic is converted to a [`CallbackFailure`] and published while the context
/// is still ambient; it never propagates to the caller.
pub(crate) fn invoke<F>(context: &ExecutionContext, callback: F)
where
    F: FnOnce(),
{
    ambient::enter(context.clone(), || {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
            unhandled::publish(CallbackFailure::from_panic(context, &*payload));
        }
    });
}
