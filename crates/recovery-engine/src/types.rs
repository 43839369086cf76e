//! Recovery context and options

use element_locator::SelectorDescriptor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use steadyweb_core_types::{AutomationError, TargetId, WorkflowId};

use crate::strategies::RecoveryStrategy;

/// The command that was executing when the failure happened, as far as the
/// orchestrator could reconstruct it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,

    /// Selector extracted from the command's arguments, best-effort.
    pub selector: Option<SelectorDescriptor>,

    /// Value argument, for fill-style commands.
    pub value: Option<String>,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: None,
            value: None,
        }
    }

    pub fn with_selector(mut self, selector: SelectorDescriptor) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Everything a strategy may consult about one failure.
///
/// Built fresh per failure; nothing here survives the recovery attempt.
#[derive(Clone, Debug)]
pub struct RecoveryContext {
    pub workflow_id: WorkflowId,
    pub step_number: u32,
    pub command: Option<CommandDescriptor>,
    pub target: TargetId,

    /// The selector the failing operation was using, when known.
    pub selector: Option<SelectorDescriptor>,

    pub error: AutomationError,

    /// Retries already consumed by the orchestrator when recovery started.
    pub retry_count: u32,
    pub max_retries: u32,

    /// Alternates to try before anything cleverer.
    pub fallback_selectors: Vec<SelectorDescriptor>,
}

impl RecoveryContext {
    pub fn new(target: TargetId, error: AutomationError) -> Self {
        Self {
            workflow_id: WorkflowId::new(),
            step_number: 0,
            command: None,
            target,
            selector: None,
            error,
            retry_count: 0,
            max_retries: 0,
            fallback_selectors: Vec::new(),
        }
    }

    pub fn with_workflow(mut self, workflow_id: WorkflowId, step_number: u32) -> Self {
        self.workflow_id = workflow_id;
        self.step_number = step_number;
        self
    }

    pub fn with_command(mut self, command: CommandDescriptor) -> Self {
        self.selector = command.selector.clone();
        self.command = Some(command);
        self
    }

    pub fn with_selector(mut self, selector: SelectorDescriptor) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_retries(mut self, retry_count: u32, max_retries: u32) -> Self {
        self.retry_count = retry_count;
        self.max_retries = max_retries;
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<SelectorDescriptor>) -> Self {
        self.fallback_selectors = fallbacks;
        self
    }

    /// Statistics key for the failing operation.
    pub fn operation(&self) -> &str {
        self.command
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("unknown")
    }
}

/// Per-call recovery knobs.
#[derive(Clone, Default)]
pub struct RecoveryOptions {
    /// Tried before any engine-registered or built-in strategy, in order.
    pub custom_strategies: Vec<Arc<dyn RecoveryStrategy>>,
}

impl RecoveryOptions {
    pub fn with_strategy(mut self, strategy: Arc<dyn RecoveryStrategy>) -> Self {
        self.custom_strategies.push(strategy);
        self
    }
}
