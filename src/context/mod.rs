//! Execution context subsystem modules.

pub(crate) mod ambient;
pub(crate) mod completion;
mod core;
pub(crate) mod queue;
pub(crate) mod worker;

pub use self::core::{ContextId, ContextState, ExecutionContext};
