//! Thread-local ambient execution context.
//!
//! Each thread carries its own notion of the "current" execution context. The
//! worker installs the owning context around every callback it runs, and hosts
//! can install one around an outer scope with [`ExecutionContext::enter`]. The
//! previous value is always restored on exit, including when the scope panics,
//! so nested and inlined dispatch never leaks a context to the surrounding code.
//!
//! # Example
//!
//! ```ignore
//! let ui = ExecutionContext::new()?;
//! assert!(ExecutionContext::current().is_none());
//! ui.enter(|| {
//!     assert_eq!(ExecutionContext::current(), Some(ui.clone()));
//! });
//! assert!(ExecutionContext::current().is_none());
//! ```
//!
//! [`ExecutionContext::enter`]: crate::ExecutionContext::enter

use crate::context::ExecutionContext;

use std::cell::RefCell;

thread_local! {
    /// The execution context considered current on this thread.
    static CURRENT_CONTEXT: RefCell<Option<ExecutionContext>> = const { RefCell::new(None) };
}

/// Returns a handle to the ambient context of the calling thread, if any.
pub(crate) fn current() -> Option<ExecutionContext> {
    CURRENT_CONTEXT
        .try_with(|current| current.borrow().clone())
        .ok()
        .flatten()
}

/// Runs `function` against the ambient context without cloning the handle.
pub(crate) fn with_current<F, R>(function: F) -> R
where
    F: FnOnce(Option<&ExecutionContext>) -> R,
{
    CURRENT_CONTEXT.with(|current| function(current.borrow().as_ref()))
}

/// Installs `context` as ambient for the duration of `function`.
///
/// The previously ambient context is restored when `function` returns or unwinds.
///
/// # Arguments
/// - `context`: The context to make current.
/// - `function`: Closure to execute within this context.
pub(crate) fn enter<F, R>(context: ExecutionContext, function: F) -> R
where
    F: FnOnce() -> R,
{
    let _restore = AmbientGuard::install(context);
    function()
}

// Restores the previously ambient context on drop.
struct AmbientGuard {
    previous: Option<ExecutionContext>,
}

impl AmbientGuard {
    fn install(context: ExecutionContext) -> Self {
        let previous = CURRENT_CONTEXT.with(|current| current.replace(Some(context)));
        Self { previous }
    }
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();

        // The replaced handle is dropped after the borrow ends: it may be the
        // last reference to its context.
        let _installed = CURRENT_CONTEXT
            .try_with(|current| current.replace(previous))
            .ok()
            .flatten();
    }
}
