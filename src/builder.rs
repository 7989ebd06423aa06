//! Fluent builder for ExecutionContext construction.
//!
//! Configures the dedicated worker thread before it is spawned.

use crate::context::ExecutionContext;
use crate::error::Result;

/// Builder for constructing ExecutionContext instances with fluent API.
///
/// # Example
/// ```ignore
/// let ui = ContextBuilder::new().name("ui").stack_size(512 * 1024).build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    pub(crate) name: Option<String>,
    pub(crate) stack_size: Option<usize>,
}

impl ContextBuilder {
    /// Creates a new context builder with the default worker configuration.
    ///
    /// The worker thread is named `affinity-worker-<id>` and uses the platform
    /// default stack size unless configured otherwise.
    pub fn new() -> Self {
        Self {
            name: None,
            stack_size: None,
        }
    }

    /// Sets the name of the worker thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the stack size, in bytes, of the worker thread.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Spawns the worker thread and returns a handle to the new context.
    ///
    /// # Errors
    /// Returns [`Error::Spawn`](crate::Error::Spawn) if the operating system refuses
    /// to create the worker thread. No partially started context is left behind.
    pub fn build(self) -> Result<ExecutionContext> {
        ExecutionContext::with_builder(self)
    }
}
