//! Task execution and dispatch.
//!
//! A terminal transaction owes side effects; this crate converts it into
//! the right task set (`Dispatcher`) and works the queue (`TaskExecutor`).
//! Dispatch is a closed registry: the task payload enum is matched
//! exhaustively, so an unhandled kind cannot compile, and a payload that
//! contradicts its transaction is a fatal `NotImplemented`, never a
//! silent success.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod handlers;

pub use context::TaskContext;
pub use dispatcher::Dispatcher;
pub use error::{ExecutorError, Result};
pub use executor::TaskExecutor;

/// Try budget given to every exported or fanned-out task.
pub const DEFAULT_REMAINING_TRIES: i32 = 10;
