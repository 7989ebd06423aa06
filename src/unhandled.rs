//! Process-wide channel for callback failures.
//!
//! A panic escaping a dispatched callback cannot be returned to anyone: `post`
//! callers are long gone and `send` callers are released without an error. The
//! worker instead catches the panic and publishes a [`CallbackFailure`] to every
//! handler registered with [`subscribe`].
//!
//! Handlers can be attached and detached from any thread at any time, including
//! from inside a handler. Each publication goes to the handlers registered when
//! it started. A handler that panics is logged and skipped; it cannot take the
//! worker thread down.
//!
//! # Example
//!
//! ```ignore
//! let subscription = affinity::subscribe(|failure| {
//!     eprintln!("callback failed on {}: {}", failure.thread(), failure.message());
//! });
//! // ...
//! subscription.unsubscribe();
//! ```

use crate::context::{ContextId, ExecutionContext};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use thiserror::Error;
use tracing::{error, warn};

type Handler = Arc<dyn Fn(&CallbackFailure) + Send + Sync>;

// Registered handlers, keyed by subscription id.
static SUBSCRIBERS: OnceLock<Mutex<Vec<(u64, Handler)>>> = OnceLock::new();
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// A panic raised by a callback dispatched on an execution context.
#[derive(Debug, Clone, Error)]
#[error("callback panicked on `{thread}` (context {context_id}): {message}")]
pub struct CallbackFailure {
    context_id: ContextId,
    thread: String,
    message: String,
}

impl CallbackFailure {
    pub(crate) fn from_panic(context: &ExecutionContext, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            context_id: context.id(),
            thread: context.thread_name().to_string(),
            message,
        }
    }

    /// Context whose callback panicked.
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Name of the worker thread the callback ran on.
    pub fn thread(&self) -> &str {
        &self.thread
    }

    /// The panic message, when the payload was a string.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Registration of a failure handler.
///
/// The handler stays attached until this value is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called.
#[must_use = "dropping a Subscription detaches its handler immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    /// Detaches the handler.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let removed = {
            let mut subscribers = lock_subscribers();
            subscribers
                .iter()
                .position(|(id, _)| *id == self.id)
                .map(|index| subscribers.remove(index))
        };

        // Dropped outside the lock: the handler may own a Subscription itself.
        drop(removed);
    }
}

/// Registers `handler` to receive every callback failure in the process.
///
/// # Returns
/// A [`Subscription`] that detaches the handler when dropped.
pub fn subscribe<F>(handler: F) -> Subscription
where
    F: Fn(&CallbackFailure) + Send + Sync + 'static,
{
    let id = NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed);
    lock_subscribers().push((id, Arc::new(handler)));

    Subscription { id }
}

/// Delivers `failure` to every registered handler, exactly once each.
pub(crate) fn publish(failure: CallbackFailure) {
    warn!(
        context_id = %failure.context_id,
        thread = %failure.thread,
        message = %failure.message,
        "callback panicked, notifying unhandled failure subscribers"
    );

    // Snapshot so handlers run without the lock held.
    let handlers: Vec<Handler> = lock_subscribers()
        .iter()
        .map(|(_, handler)| handler.clone())
        .collect();

    for handler in handlers {
        if panic::catch_unwind(AssertUnwindSafe(|| handler(&failure))).is_err() {
            error!(context_id = %failure.context_id, "unhandled failure subscriber panicked");
        }
    }
}

fn lock_subscribers() -> MutexGuard<'static, Vec<(u64, Handler)>> {
    SUBSCRIBERS
        .get_or_init(|| Mutex::new(Vec::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
