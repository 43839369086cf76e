//! Retry orchestrator
//!
//! Wraps a command so that one `invoke` call gets a bounded retry budget with
//! linear backoff and, after exhaustion, at most one pass through the
//! recovery engine followed by one final re-invocation.

pub mod command;
pub mod orchestrator;

pub use command::*;
pub use orchestrator::*;
