//! Condition-polling wait engine
//!
//! Polls a named condition (presence, visibility, hidden, clickable,
//! navigation, custom, quiescence) until satisfied or timed out. One
//! [`WaitSpec`] governs exactly one polling loop; no state survives across
//! calls.

pub mod engine;
pub mod types;

pub use engine::*;
pub use types::*;
