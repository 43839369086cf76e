//! SteadyWeb: resilience core for web automation
//!
//! Dynamic, third-party-controlled pages break naive automation constantly:
//! selectors rot, elements render late, overlays swallow clicks. SteadyWeb
//! layers four cooperating services over an execution boundary to absorb
//! that instability:
//!
//! - element resolution with five selector strategies and a TTL result cache
//! - a condition-polling wait engine (presence, visibility, clickability,
//!   navigation, custom predicates, network quiescence)
//! - an error-recovery engine running ordered per-error-kind strategies
//! - a retry orchestrator composing the three around command execution
//!
//! Everything reaches the live page through the [`page_adapter`] ports, so
//! the whole pipeline runs unchanged against the in-memory test page or a
//! real browser adapter.
//!
//! ```no_run
//! use std::sync::Arc;
//! use steadyweb::{Pipeline, PipelineConfig};
//! use steadyweb::page_adapter::MemoryPage;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let page = Arc::new(MemoryPage::new("https://example.test"));
//! let pipeline = Pipeline::new(page.clone(), page.clone(), PipelineConfig::default());
//! let target = pipeline.active_target().await?;
//! let found = pipeline.find_element(&target, "css", "#submit").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod pipeline;

pub use config::PipelineConfig;
pub use logging::init_tracing;
pub use pipeline::Pipeline;

pub use command_retry;
pub use element_locator;
pub use page_adapter;
pub use recovery_engine;
pub use steadyweb_core_types as core_types;
pub use wait_engine;

pub use steadyweb_core_types::{AutomationError, ElementHandle, ErrorKind, TargetId, WorkflowId};
