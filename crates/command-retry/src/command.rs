//! Command trait and call/output shapes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use element_locator::SelectorDescriptor;
use steadyweb_core_types::{AutomationError, TargetId, WorkflowId};

/// One invocation of a command, with its untyped arguments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandCall {
    pub workflow_id: WorkflowId,
    pub step_number: u32,
    pub target: TargetId,
    pub args: Value,
}

impl CommandCall {
    pub fn new(target: TargetId, args: Value) -> Self {
        Self {
            workflow_id: WorkflowId::new(),
            step_number: 0,
            target,
            args,
        }
    }

    pub fn with_workflow(mut self, workflow_id: WorkflowId, step_number: u32) -> Self {
        self.workflow_id = workflow_id;
        self.step_number = step_number;
        self
    }

    /// Best-effort selector extraction from the arguments: a `selector`
    /// field, the first array element, or a bare string. Leading slashes
    /// read as xpath, everything else as css.
    pub fn selector_hint(&self) -> Option<SelectorDescriptor> {
        let raw = match &self.args {
            Value::Object(map) => map.get("selector").and_then(|v| v.as_str()),
            Value::Array(items) => items.first().and_then(|v| v.as_str()),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }?;
        if raw.is_empty() {
            return None;
        }
        Some(if raw.starts_with('/') {
            SelectorDescriptor::xpath(raw)
        } else {
            SelectorDescriptor::css(raw)
        })
    }

    /// The `value` argument, for fill-style commands.
    pub fn value_hint(&self) -> Option<String> {
        match &self.args {
            Value::Object(map) => map
                .get("value")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            _ => None,
        }
    }
}

/// What a command resolved to.
///
/// `success: false` is a failed attempt to the orchestrator even though
/// nothing was thrown.
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub value: Option<Value>,
    pub message: Option<String>,

    /// Structured error behind a soft failure, when the command has one.
    pub error: Option<AutomationError>,
}

impl CommandOutput {
    pub fn ok(value: Value) -> Self {
        Self {
            success: true,
            value: Some(value),
            message: None,
            error: None,
        }
    }

    pub fn failed(error: AutomationError) -> Self {
        Self {
            success: false,
            value: None,
            message: Some(error.to_string()),
            error: Some(error),
        }
    }
}

/// A retryable unit of work against a page.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, call: &CommandCall) -> Result<CommandOutput, AutomationError>;
}
