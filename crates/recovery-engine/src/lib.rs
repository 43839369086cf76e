//! Strategy-based error recovery
//!
//! When a command has exhausted its retries, the recovery engine walks an
//! ordered strategy list (caller-supplied customs first, then built-ins) and
//! lets the first applicable strategy try to repair the page state. Strategies
//! dispatch on the structured [`ErrorKind`](steadyweb_core_types::ErrorKind)
//! tag, never on message text. The engine reports success as a bool and never
//! rethrows.

pub mod engine;
pub mod stats;
pub mod strategies;
pub mod types;

pub use engine::*;
pub use stats::*;
pub use strategies::*;
pub use types::*;
