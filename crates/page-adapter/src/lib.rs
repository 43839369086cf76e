//! Execution boundary for the SteadyWeb resilience core
//!
//! Everything the core knows about a live page goes through the two ports in
//! this crate: [`PagePort`] for in-page observation and interaction, and
//! [`TargetDirectory`] for tab/page lifecycle. Only data crosses the boundary
//! (queries, points, urls) -- never serialized code.
//!
//! [`MemoryPage`] is an in-memory implementation of both ports with scripted
//! time-based mutations, playing the role a stub adapter plays against a real
//! browser.

pub mod memory;
pub mod model;
pub mod ports;

pub use memory::{MemoryNode, MemoryPage, Mutation};
pub use model::*;
pub use ports::*;
