//! Execution context handle used by producers to reach the worker thread.
//!
//! The context owns one intake queue and one worker thread for its entire
//! lifetime. Handles are cheap to clone; every clone refers to the same context
//! and compares equal to the others.

use crate::builder::ContextBuilder;
use crate::context::queue::WorkQueue;
use crate::context::{ambient, worker};
use crate::error::{Error, Result};
use crate::item::WorkItem;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::debug;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Accepting work.
    Active,
    /// `stop` was called; queued work is still being dispatched.
    Draining,
    /// The worker thread has left its dispatch loop.
    Stopped,
}

/// Handle to a thread-affinity execution context.
///
/// Callbacks submitted through [`post`](Self::post) and [`send`](Self::send) run
/// one at a time, in submission order, on the context's dedicated worker thread.
/// While a callback runs, its context is the ambient context of the worker
/// thread (see [`current`](Self::current)).
///
/// # Example
/// ```ignore
/// let ui = ExecutionContext::new()?;
///
/// ui.post(|count| println!("{count} items"), 3)?;
/// ui.send(|_| assert!(ExecutionContext::check_access().is_ok()), ())?;
///
/// ui.stop();
/// ui.join()?;
/// ```
#[derive(Clone)]
pub struct ExecutionContext {
    shared: Arc<Shared>,
}

struct Shared {
    id: ContextId,
    queue: Arc<WorkQueue<WorkItem>>,
    worker: ThreadId,
    thread_name: String,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ExecutionContext {
    /// Creates a context with the default worker configuration.
    ///
    /// Equivalent to `ContextBuilder::new().build()`.
    ///
    /// # Errors
    /// Returns [`Error::Spawn`] if the worker thread cannot be started.
    pub fn new() -> Result<Self> {
        ContextBuilder::new().build()
    }

    pub(crate) fn with_builder(builder: ContextBuilder) -> Result<Self> {
        let id = ContextId::next();
        let thread_name = builder
            .name
            .unwrap_or_else(|| format!("affinity-worker-{id}"));
        let queue = Arc::new(WorkQueue::new());

        let handle = worker::spawn(id, thread_name.clone(), builder.stack_size, queue.clone())?;
        let worker = handle.thread().id();

        debug!(context_id = %id, thread = %thread_name, "execution context created");

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                queue,
                worker,
                thread_name,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Returns the ambient context of the calling thread, if one is installed.
    pub fn current() -> Option<Self> {
        ambient::current()
    }

    /// Schedules `callback(state)` on the worker thread and returns immediately.
    ///
    /// # Arguments
    /// * `callback` - Procedure invoked exactly once on the worker thread
    /// * `state` - Value moved into the callback
    ///
    /// # Errors
    /// Returns [`Error::ContextClosed`] if [`stop`](Self::stop) has been called.
    /// Work is never dropped silently.
    pub fn post<F, S>(&self, callback: F, state: S) -> Result<()>
    where
        F: FnOnce(S) + Send + 'static,
        S: Send + 'static,
    {
        let item = WorkItem::new(self.clone(), callback, state);
        self.shared.queue.push(item).map_err(|_| Error::ContextClosed)
    }

    /// Runs `callback(state)` on the worker thread and waits for it to finish.
    ///
    /// When called from the worker thread itself, the callback runs inline right
    /// away instead of being queued, because waiting on the queue would deadlock.
    /// Otherwise the call blocks until every item queued before it and then the
    /// callback itself have been dispatched.
    ///
    /// A panic inside the callback is not returned here. It is published on the
    /// unhandled failure channel (see [`subscribe`](crate::subscribe)) and this
    /// call still returns `Ok(())`.
    ///
    /// # Errors
    /// Returns [`Error::ContextClosed`] if [`stop`](Self::stop) has been called.
    pub fn send<F, S>(&self, callback: F, state: S) -> Result<()>
    where
        F: FnOnce(S) + Send + 'static,
        S: Send + 'static,
    {
        if self.shared.queue.is_closed() {
            return Err(Error::ContextClosed);
        }

        if self.has_access() {
            debug!(context_id = %self.shared.id, "dispatching send inline on worker thread");
            worker::invoke(self, move || callback(state));
            return Ok(());
        }

        let (item, completion) = WorkItem::blocking(self.clone(), callback, state);
        self.shared
            .queue
            .push(item)
            .map_err(|_| Error::ContextClosed)?;

        completion.wait();
        Ok(())
    }

    /// Checks that the caller runs on the worker thread of the ambient context.
    ///
    /// # Errors
    /// Returns [`Error::WrongContext`] if no context is ambient on this thread, or
    /// if the ambient context's worker is a different thread.
    pub fn check_access() -> Result<()> {
        let allowed = ambient::with_current(|current| current.is_some_and(Self::has_access));

        if allowed {
            Ok(())
        } else {
            Err(Error::WrongContext)
        }
    }

    /// Returns `true` if the calling thread is this context's worker thread.
    pub fn has_access(&self) -> bool {
        thread::current().id() == self.shared.worker
    }

    /// Closes the intake queue. Already queued work still runs.
    ///
    /// The worker thread exits once the queue is drained. This call does not
    /// wait for that; use [`join`](Self::join). Calling `stop` again has no effect.
    pub fn stop(&self) {
        if self.shared.queue.close() {
            debug!(
                context_id = %self.shared.id,
                pending = self.shared.queue.len(),
                "execution context stopping, intake closed"
            );
        }
    }

    /// Blocks until the worker thread has exited.
    ///
    /// The worker only exits after [`stop`](Self::stop), so joining an active
    /// context blocks until some other thread stops it. Returns immediately if
    /// the worker was already joined through any handle.
    ///
    /// # Errors
    /// - [`Error::JoinFromWorker`] when called on the worker thread itself
    /// - [`Error::WorkerPanicked`] if the worker thread terminated abnormally
    pub fn join(&self) -> Result<()> {
        if self.has_access() {
            return Err(Error::JoinFromWorker);
        }

        let handle = self
            .shared
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle {
            Some(handle) => handle.join().map_err(|_| Error::WorkerPanicked),
            None => Ok(()),
        }
    }

    /// Installs this context as the calling thread's ambient context while
    /// `function` runs, then restores whatever was ambient before.
    ///
    /// Hosts use this at outer boundaries such as a request or a render pass.
    pub fn enter<F, R>(&self, function: F) -> R
    where
        F: FnOnce() -> R,
    {
        ambient::enter(self.clone(), function)
    }

    pub fn id(&self) -> ContextId {
        self.shared.id
    }

    /// Name of the dedicated worker thread.
    pub fn thread_name(&self) -> &str {
        &self.shared.thread_name
    }

    pub fn state(&self) -> ContextState {
        if self.shared.queue.is_terminated() {
            ContextState::Stopped
        } else if self.shared.queue.is_closed() {
            ContextState::Draining
        } else {
            ContextState::Active
        }
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for ExecutionContext {}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.shared.id)
            .field("thread", &self.shared.thread_name)
            .field("state", &self.state())
            .finish()
    }
}

// The worker holds only the queue, so once the last handle is gone nobody can
// submit work anymore: let the worker drain and exit.
impl Drop for Shared {
    fn drop(&mut self) {
        if self.queue.close() {
            debug!(context_id = %self.id, "last handle dropped, intake closed");
        }
    }
}
