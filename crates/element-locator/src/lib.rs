//! Multi-strategy element resolution
//!
//! This crate implements the selector resolution layer of the resilience
//! core:
//! - Five selector strategies (css, xpath, text, attribute, index)
//! - A time-boxed result cache keyed by `(strategy, value, root)`
//! - Candidate generation for re-finding elements after page changes
//! - Visibility and interactivity filters

pub mod cache;
pub mod candidates;
pub mod filters;
pub mod resolver;
pub mod types;

pub use cache::{CacheStats, QueryCache};
pub use candidates::*;
pub use filters::*;
pub use resolver::*;
pub use types::*;
