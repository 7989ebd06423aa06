//! Thread-affinity execution contexts.
//!
//! This crate lets any number of producer threads hand callbacks to exactly one
//! dedicated worker thread, so code that assumes serialized, single-threaded
//! execution (a UI thread, a renderer, a component tree) never runs concurrently
//! with itself no matter which thread triggered it.
//!
//! # Architecture
//!
//! - **ExecutionContext**: Cloneable handle used to `post`, `send`, `check_access` and `stop`
//! - **WorkQueue**: Unbounded FIFO intake with an irreversible close
//! - **Worker**: Dedicated thread running the dispatch loop
//! - **WorkItem**: Callback, owning context and optional completion signal
//! - **Unhandled failures**: Process-wide channel receiving panics raised by callbacks
//! - **ContextBuilder**: Fluent builder for the worker thread configuration
//!
//! # Example
//!
//! ```ignore
//! use affinity::ExecutionContext;
//!
//! let ui = ExecutionContext::new()?;
//! ui.post(|name| println!("hello from {name}"), "ui")?;
//! ui.send(|_| ExecutionContext::check_access().unwrap(), ())?;
//! ui.stop();
//! ui.join()?;
//! ```

mod builder;
mod context;
mod error;
mod item;
mod unhandled;

pub use builder::ContextBuilder;
pub use context::{ContextId, ContextState, ExecutionContext};
pub use error::{Error, Result};
pub use unhandled::{CallbackFailure, Subscription, subscribe};
