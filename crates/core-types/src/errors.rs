//! Error types for the resilience core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed classification of automation failures.
///
/// Recovery strategies dispatch on this tag, never on message text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnsupportedSelectorStrategy,
    InvalidSelectorSyntax,
    ElementNotFound,
    ElementNotVisible,
    ElementNotClickable,
    WaitTimeout,
    NavigationTimeout,
    FormValidationFailed,
    PermissionDenied,
    RecoveryExhausted,
    CommandFailedAfterRetries,
    Boundary,
}

impl ErrorKind {
    /// Component the kind originates from, used as a statistics key.
    pub fn component(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedSelectorStrategy
            | ErrorKind::InvalidSelectorSyntax
            | ErrorKind::ElementNotFound => "locator",
            ErrorKind::ElementNotVisible | ErrorKind::ElementNotClickable => "element-state",
            ErrorKind::WaitTimeout | ErrorKind::NavigationTimeout => "waiter",
            ErrorKind::FormValidationFailed => "form",
            ErrorKind::PermissionDenied => "permissions",
            ErrorKind::RecoveryExhausted => "recovery",
            ErrorKind::CommandFailedAfterRetries => "orchestrator",
            ErrorKind::Boundary => "boundary",
        }
    }
}

/// Automation error enumeration
#[derive(Debug, Error, Clone)]
pub enum AutomationError {
    /// Selector strategy string not in the supported set
    #[error("Unsupported selector strategy: {0}")]
    UnsupportedSelectorStrategy(String),

    /// Selector is syntactically malformed
    #[error("Invalid selector syntax: {0}")]
    InvalidSelectorSyntax(String),

    /// No element matched where one was required
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element matched but is not rendered visible
    #[error("Element not visible: {0}")]
    ElementNotVisible(String),

    /// Element matched but cannot receive a click
    #[error("Element not clickable: {0}")]
    ElementNotClickable(String),

    /// A polled condition never became true
    #[error("Wait timed out after {timeout_ms}ms: {message}")]
    WaitTimeout { timeout_ms: u64, message: String },

    /// A navigation never completed
    #[error("Navigation timed out after {timeout_ms}ms: {message}")]
    NavigationTimeout { timeout_ms: u64, message: String },

    /// Form rejected the supplied value
    #[error("Form validation failed: {0}")]
    FormValidationFailed(String),

    /// Host denied the operation; not auto-recoverable
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// All applicable recovery strategies failed
    #[error("Recovery exhausted: {0}")]
    RecoveryExhausted(String),

    /// Final normalized failure surfaced by the retry orchestrator
    #[error("Command '{command}' failed after {attempts} attempts: {source}")]
    CommandFailedAfterRetries {
        command: String,
        attempts: u32,
        #[source]
        source: Box<AutomationError>,
    },

    /// Transport or host failure at the execution boundary
    #[error("Boundary error: {0}")]
    Boundary(String),
}

impl AutomationError {
    /// Structured tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AutomationError::UnsupportedSelectorStrategy(_) => ErrorKind::UnsupportedSelectorStrategy,
            AutomationError::InvalidSelectorSyntax(_) => ErrorKind::InvalidSelectorSyntax,
            AutomationError::ElementNotFound(_) => ErrorKind::ElementNotFound,
            AutomationError::ElementNotVisible(_) => ErrorKind::ElementNotVisible,
            AutomationError::ElementNotClickable(_) => ErrorKind::ElementNotClickable,
            AutomationError::WaitTimeout { .. } => ErrorKind::WaitTimeout,
            AutomationError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            AutomationError::FormValidationFailed(_) => ErrorKind::FormValidationFailed,
            AutomationError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AutomationError::RecoveryExhausted(_) => ErrorKind::RecoveryExhausted,
            AutomationError::CommandFailedAfterRetries { .. } => ErrorKind::CommandFailedAfterRetries,
            AutomationError::Boundary(_) => ErrorKind::Boundary,
        }
    }

    /// Check if error is worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::WaitTimeout | ErrorKind::NavigationTimeout | ErrorKind::Boundary
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self.kind() {
            ErrorKind::CommandFailedAfterRetries | ErrorKind::RecoveryExhausted => 3,
            ErrorKind::Boundary | ErrorKind::PermissionDenied => 2,
            ErrorKind::ElementNotFound
            | ErrorKind::ElementNotVisible
            | ErrorKind::ElementNotClickable
            | ErrorKind::WaitTimeout
            | ErrorKind::NavigationTimeout
            | ErrorKind::FormValidationFailed => 1,
            _ => 0,
        }
    }

    /// Innermost error, unwrapping the orchestrator's normalized wrapper.
    pub fn root_cause(&self) -> &AutomationError {
        match self {
            AutomationError::CommandFailedAfterRetries { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
