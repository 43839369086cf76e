//! Recovery strategy trait and the built-in playbooks
//!
//! Each built-in handles one [`ErrorKind`] with a short action sequence,
//! escalating from the cheapest repair to the most disruptive. Strategies
//! report whether the page is believed fixed; the caller re-runs the failed
//! command to find out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use element_locator::{ElementResolver, SelectorDescriptor, SelectorStrategy};
use page_adapter::{ClickMethod, PagePort, TargetDirectory};
use steadyweb_core_types::{AutomationError, ErrorKind};
use wait_engine::{WaitCondition, WaitEngine, WaitSpec};

use crate::types::RecoveryContext;

/// Recovery strategy trait
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this strategy applies to the failure, judged on the error tag
    /// and the context.
    fn can_recover(&self, error: &AutomationError, ctx: &RecoveryContext) -> bool;

    /// Try to repair the page. `Ok(true)` means the failed command is worth
    /// re-running.
    async fn recover(
        &self,
        error: &AutomationError,
        ctx: &RecoveryContext,
    ) -> Result<bool, AutomationError>;

    /// Attempts the engine grants this strategy before moving on.
    fn max_attempts(&self) -> u32 {
        3
    }

    /// Base delay for the linear backoff between attempts.
    fn delay(&self) -> Duration {
        Duration::from_millis(500)
    }
}

/// Timeout for the short waits the built-ins perform while repairing.
const REPAIR_WAIT: Duration = Duration::from_secs(3);

fn repair_spec() -> WaitSpec {
    WaitSpec::new(REPAIR_WAIT).soft()
}

/// Best-effort xpath equivalent of a descriptor, for re-resolution when the
/// original selector stopped matching.
pub(crate) fn derive_xpath(descriptor: &SelectorDescriptor) -> Option<SelectorDescriptor> {
    match descriptor.strategy {
        SelectorStrategy::Css => {
            let value = descriptor.value.trim();
            if let Some(id) = value.strip_prefix('#') {
                Some(SelectorDescriptor::xpath(format!("//*[@id='{id}']")))
            } else if let Some(class) = value.strip_prefix('.') {
                Some(SelectorDescriptor::xpath(format!(
                    "//*[contains(@class,'{class}')]"
                )))
            } else if value.chars().all(|c| c.is_ascii_alphanumeric()) && !value.is_empty() {
                Some(SelectorDescriptor::xpath(format!("//{value}")))
            } else {
                None
            }
        }
        SelectorStrategy::Attribute => descriptor.attribute.as_ref().map(|name| {
            SelectorDescriptor::xpath(format!("//*[@{name}='{}']", descriptor.value))
        }),
        _ => None,
    }
}

/// Fallback selectors, then wait-for-presence, then a derived xpath.
pub struct ElementNotFoundStrategy {
    resolver: Arc<dyn ElementResolver>,
    waiter: Arc<dyn WaitEngine>,
}

impl ElementNotFoundStrategy {
    pub fn new(resolver: Arc<dyn ElementResolver>, waiter: Arc<dyn WaitEngine>) -> Self {
        Self { resolver, waiter }
    }
}

#[async_trait]
impl RecoveryStrategy for ElementNotFoundStrategy {
    fn name(&self) -> &str {
        "element-not-found"
    }

    fn can_recover(&self, error: &AutomationError, ctx: &RecoveryContext) -> bool {
        error.kind() == ErrorKind::ElementNotFound && ctx.selector.is_some()
    }

    async fn recover(
        &self,
        _error: &AutomationError,
        ctx: &RecoveryContext,
    ) -> Result<bool, AutomationError> {
        let selector = ctx.selector.as_ref().ok_or_else(|| {
            AutomationError::Boundary("recovery context lost its selector".to_string())
        })?;

        for fallback in &ctx.fallback_selectors {
            let matches = self
                .resolver
                .resolve_fresh(&ctx.target, fallback, None)
                .await?;
            if !matches.is_empty() {
                debug!("fallback selector {fallback} matches");
                return Ok(true);
            }
        }

        let outcome = self
            .waiter
            .wait_for(
                &ctx.target,
                &WaitCondition::Presence(selector.clone()),
                &repair_spec(),
            )
            .await?;
        if outcome.is_satisfied() {
            debug!("original selector {selector} reappeared");
            return Ok(true);
        }

        if let Some(xpath) = derive_xpath(selector) {
            let matches = self
                .resolver
                .resolve_fresh(&ctx.target, &xpath, None)
                .await?;
            if !matches.is_empty() {
                debug!("derived xpath {xpath} matches");
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Wait for visibility; failing that, scroll to top and wait again.
pub struct ElementNotVisibleStrategy {
    port: Arc<dyn PagePort>,
    waiter: Arc<dyn WaitEngine>,
}

impl ElementNotVisibleStrategy {
    pub fn new(port: Arc<dyn PagePort>, waiter: Arc<dyn WaitEngine>) -> Self {
        Self { port, waiter }
    }

    async fn wait_visible(
        &self,
        ctx: &RecoveryContext,
        selector: &SelectorDescriptor,
    ) -> Result<bool, AutomationError> {
        let outcome = self
            .waiter
            .wait_for(
                &ctx.target,
                &WaitCondition::Visible(selector.clone()),
                &repair_spec(),
            )
            .await?;
        Ok(outcome.is_satisfied())
    }
}

#[async_trait]
impl RecoveryStrategy for ElementNotVisibleStrategy {
    fn name(&self) -> &str {
        "element-not-visible"
    }

    fn can_recover(&self, error: &AutomationError, ctx: &RecoveryContext) -> bool {
        error.kind() == ErrorKind::ElementNotVisible && ctx.selector.is_some()
    }

    async fn recover(
        &self,
        _error: &AutomationError,
        ctx: &RecoveryContext,
    ) -> Result<bool, AutomationError> {
        let selector = ctx.selector.as_ref().ok_or_else(|| {
            AutomationError::Boundary("recovery context lost its selector".to_string())
        })?;

        if self.wait_visible(ctx, selector).await? {
            return Ok(true);
        }

        debug!("scrolling to top before re-checking visibility");
        self.port.scroll_to_top(&ctx.target).await?;
        sleep(Duration::from_millis(500)).await;
        self.wait_visible(ctx, selector).await
    }
}

/// Native click; failing that, a synthesized pointer click at the centre.
pub struct ElementNotClickableStrategy {
    port: Arc<dyn PagePort>,
    resolver: Arc<dyn ElementResolver>,
}

impl ElementNotClickableStrategy {
    pub fn new(port: Arc<dyn PagePort>, resolver: Arc<dyn ElementResolver>) -> Self {
        Self { port, resolver }
    }
}

#[async_trait]
impl RecoveryStrategy for ElementNotClickableStrategy {
    fn name(&self) -> &str {
        "element-not-clickable"
    }

    fn can_recover(&self, error: &AutomationError, ctx: &RecoveryContext) -> bool {
        error.kind() == ErrorKind::ElementNotClickable && ctx.selector.is_some()
    }

    async fn recover(
        &self,
        _error: &AutomationError,
        ctx: &RecoveryContext,
    ) -> Result<bool, AutomationError> {
        let selector = ctx.selector.as_ref().ok_or_else(|| {
            AutomationError::Boundary("recovery context lost its selector".to_string())
        })?;

        let handle = match self
            .resolver
            .resolve_fresh(&ctx.target, selector, None)
            .await?
            .into_iter()
            .next()
        {
            Some(handle) => handle,
            None => return Ok(false),
        };

        self.port
            .scroll_into_view(&ctx.target, &handle)
            .await?;

        match self.port.click(&ctx.target, &handle, ClickMethod::Native).await {
            Ok(()) => return Ok(true),
            Err(err) => debug!("native click failed ({err}), trying pointer click"),
        }

        let snapshot = self.port.snapshot(&ctx.target, &handle).await?;
        let center = snapshot.rect.center();
        match self
            .port
            .click(&ctx.target, &handle, ClickMethod::Pointer(center))
            .await
        {
            Ok(()) => Ok(true),
            Err(err) => {
                debug!("pointer click failed: {err}");
                Ok(false)
            }
        }
    }
}

/// Give the load longer; failing that, force a reload.
pub struct NavigationTimeoutStrategy {
    directory: Arc<dyn TargetDirectory>,
}

impl NavigationTimeoutStrategy {
    pub fn new(directory: Arc<dyn TargetDirectory>) -> Self {
        Self { directory }
    }
}

const EXTENDED_LOAD_WAIT: Duration = Duration::from_secs(10);

#[async_trait]
impl RecoveryStrategy for NavigationTimeoutStrategy {
    fn name(&self) -> &str {
        "navigation-timeout"
    }

    fn can_recover(&self, error: &AutomationError, _ctx: &RecoveryContext) -> bool {
        error.kind() == ErrorKind::NavigationTimeout
    }

    async fn recover(
        &self,
        _error: &AutomationError,
        ctx: &RecoveryContext,
    ) -> Result<bool, AutomationError> {
        if self
            .directory
            .wait_for_load(&ctx.target, EXTENDED_LOAD_WAIT)
            .await
            .is_ok()
        {
            return Ok(true);
        }

        warn!("load never completed, forcing reload of {}", ctx.target);
        self.directory.reload(&ctx.target).await?;
        Ok(self
            .directory
            .wait_for_load(&ctx.target, EXTENDED_LOAD_WAIT)
            .await
            .is_ok())
    }

    fn max_attempts(&self) -> u32 {
        2
    }
}

/// Clear the field, refill it, and re-fire the edit events.
pub struct FormValidationStrategy {
    port: Arc<dyn PagePort>,
    resolver: Arc<dyn ElementResolver>,
}

impl FormValidationStrategy {
    pub fn new(port: Arc<dyn PagePort>, resolver: Arc<dyn ElementResolver>) -> Self {
        Self { port, resolver }
    }
}

#[async_trait]
impl RecoveryStrategy for FormValidationStrategy {
    fn name(&self) -> &str {
        "form-validation"
    }

    fn can_recover(&self, error: &AutomationError, ctx: &RecoveryContext) -> bool {
        error.kind() == ErrorKind::FormValidationFailed
            && ctx
                .command
                .as_ref()
                .map(|c| c.selector.is_some() && c.value.is_some())
                .unwrap_or(false)
    }

    async fn recover(
        &self,
        _error: &AutomationError,
        ctx: &RecoveryContext,
    ) -> Result<bool, AutomationError> {
        let command = ctx.command.as_ref().ok_or_else(|| {
            AutomationError::Boundary("recovery context lost its command".to_string())
        })?;
        let (selector, value) = match (&command.selector, &command.value) {
            (Some(selector), Some(value)) => (selector, value),
            _ => return Ok(false),
        };

        let handle = match self
            .resolver
            .resolve_fresh(&ctx.target, selector, None)
            .await?
            .into_iter()
            .next()
        {
            Some(handle) => handle,
            None => return Ok(false),
        };

        self.port.set_value(&ctx.target, &handle, "").await?;
        self.port.dispatch_edit_events(&ctx.target, &handle).await?;
        sleep(Duration::from_millis(200)).await;
        self.port.set_value(&ctx.target, &handle, value).await?;
        self.port.dispatch_edit_events(&ctx.target, &handle).await?;
        Ok(true)
    }

    fn max_attempts(&self) -> u32 {
        1
    }
}

/// Permission failures are terminal; report and decline.
pub struct PermissionDeniedStrategy;

#[async_trait]
impl RecoveryStrategy for PermissionDeniedStrategy {
    fn name(&self) -> &str {
        "permission-denied"
    }

    fn can_recover(&self, error: &AutomationError, _ctx: &RecoveryContext) -> bool {
        error.kind() == ErrorKind::PermissionDenied
    }

    async fn recover(
        &self,
        error: &AutomationError,
        ctx: &RecoveryContext,
    ) -> Result<bool, AutomationError> {
        warn!(
            "permission denied during {} (workflow {}): {error}",
            ctx.operation(),
            ctx.workflow_id
        );
        Ok(false)
    }

    fn max_attempts(&self) -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_xpath_forms() {
        let id = derive_xpath(&SelectorDescriptor::css("#submit")).unwrap();
        assert_eq!(id.value, "//*[@id='submit']");

        let class = derive_xpath(&SelectorDescriptor::css(".primary")).unwrap();
        assert_eq!(class.value, "//*[contains(@class,'primary')]");

        let tag = derive_xpath(&SelectorDescriptor::css("button")).unwrap();
        assert_eq!(tag.value, "//button");

        let attr = derive_xpath(&SelectorDescriptor::attribute("name", "email")).unwrap();
        assert_eq!(attr.value, "//*[@name='email']");

        assert!(derive_xpath(&SelectorDescriptor::css("div > button")).is_none());
        assert!(derive_xpath(&SelectorDescriptor::text("Sign in")).is_none());
    }
}
