//! Error types returned by execution contexts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Work was submitted after the context's intake queue was closed by `stop`.
    #[error("execution context is closed and no longer accepts work")]
    ContextClosed,

    /// `check_access` ran outside the worker thread of the ambient context.
    #[error("not in the right execution context")]
    WrongContext,

    /// The worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// `join` was called on the context's own worker thread.
    #[error("cannot join an execution context from its own worker thread")]
    JoinFromWorker,

    /// The worker thread unwound instead of leaving its dispatch loop.
    #[error("worker thread terminated abnormally")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, Error>;
