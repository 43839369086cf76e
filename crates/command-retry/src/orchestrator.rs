//! The retry orchestrator

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use element_locator::SelectorDescriptor;
use recovery_engine::{
    CommandDescriptor, RecoveryContext, RecoveryEngine, RecoveryOptions, RecoveryStrategy,
};
use steadyweb_core_types::AutomationError;

use crate::command::{Command, CommandCall, CommandOutput};

/// Default total attempts per wrapped invocation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for the linear backoff between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Retry policy for one wrapped command.
#[derive(Clone)]
pub struct RetryOptions {
    /// Total attempts before recovery is consulted.
    pub max_retries: u32,

    /// Base delay; the wait after attempt n is `retry_delay * n`.
    pub retry_delay: Duration,

    pub enable_recovery: bool,

    /// Handed to the recovery context as alternates for the failing selector.
    pub fallback_selectors: Vec<SelectorDescriptor>,

    /// Tried before any engine-level strategy during recovery.
    pub custom_strategies: Vec<Arc<dyn RecoveryStrategy>>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            enable_recovery: true,
            fallback_selectors: Vec::new(),
            custom_strategies: Vec::new(),
        }
    }
}

impl RetryOptions {
    pub fn without_recovery(mut self) -> Self {
        self.enable_recovery = false;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<SelectorDescriptor>) -> Self {
        self.fallback_selectors = fallbacks;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn RecoveryStrategy>) -> Self {
        self.custom_strategies.push(strategy);
        self
    }
}

/// Wraps commands with a shared recovery engine.
pub struct RetryOrchestrator {
    recovery: Arc<dyn RecoveryEngine>,
}

impl RetryOrchestrator {
    pub fn new(recovery: Arc<dyn RecoveryEngine>) -> Self {
        Self { recovery }
    }

    pub fn wrap(&self, command: Arc<dyn Command>, options: RetryOptions) -> WrappedCommand {
        WrappedCommand {
            command,
            options,
            recovery: self.recovery.clone(),
        }
    }
}

/// A command plus its retry policy.
pub struct WrappedCommand {
    command: Arc<dyn Command>,
    options: RetryOptions,
    recovery: Arc<dyn RecoveryEngine>,
}

impl WrappedCommand {
    /// Run the command under the retry policy.
    ///
    /// A thrown error and a resolved `success: false` both count as failed
    /// attempts. After the budget is spent, recovery runs at most once; on
    /// recovery success the command is invoked exactly once more and that
    /// outcome is returned verbatim.
    pub async fn invoke(&self, call: &CommandCall) -> Result<CommandOutput, AutomationError> {
        let attempts = self.options.max_retries.max(1);
        let mut last_error: Option<AutomationError> = None;

        for attempt in 1..=attempts {
            debug!(
                "command '{}' attempt {attempt}/{attempts}",
                self.command.name()
            );
            match self.command.invoke(call).await {
                Ok(output) if output.success => return Ok(output),
                Ok(output) => {
                    warn!(
                        "command '{}' resolved unsuccessfully: {}",
                        self.command.name(),
                        output.message.as_deref().unwrap_or("no message")
                    );
                    last_error = Some(output.error.unwrap_or_else(|| {
                        AutomationError::Boundary(
                            output
                                .message
                                .unwrap_or_else(|| "command reported failure".to_string()),
                        )
                    }));
                }
                Err(err) => {
                    warn!("command '{}' failed: {err}", self.command.name());
                    last_error = Some(err);
                }
            }
            if attempt < attempts {
                sleep(self.options.retry_delay * attempt).await;
            }
        }

        // The 1..=attempts loop ran at least once.
        let last_error = match last_error {
            Some(err) => err,
            None => AutomationError::Boundary("command was never invoked".to_string()),
        };

        if self.options.enable_recovery {
            let descriptor = self.describe(call);
            let ctx = RecoveryContext::new(call.target.clone(), last_error.clone())
                .with_workflow(call.workflow_id.clone(), call.step_number)
                .with_command(descriptor)
                .with_retries(attempts, attempts)
                .with_fallbacks(self.options.fallback_selectors.clone());
            let recovery_options = RecoveryOptions {
                custom_strategies: self.options.custom_strategies.clone(),
            };

            if self.recovery.attempt_recovery(&ctx, &recovery_options).await {
                info!(
                    "recovered from {:?}, re-invoking '{}' once",
                    last_error.kind(),
                    self.command.name()
                );
                return self.command.invoke(call).await;
            }
        }

        Err(AutomationError::CommandFailedAfterRetries {
            command: self.command.name().to_string(),
            attempts,
            source: Box::new(last_error),
        })
    }

    fn describe(&self, call: &CommandCall) -> CommandDescriptor {
        let mut descriptor = CommandDescriptor::new(self.command.name());
        if let Some(selector) = call.selector_hint() {
            descriptor = descriptor.with_selector(selector);
        }
        if let Some(value) = call.value_hint() {
            descriptor = descriptor.with_value(value);
        }
        descriptor
    }
}
