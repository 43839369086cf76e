//! The polling loop

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use element_locator::ElementResolver;
use page_adapter::{PagePort, TargetDirectory};
use steadyweb_core_types::{AutomationError, ElementHandle, TargetId};

use crate::types::{WaitCondition, WaitOutcome, WaitSpec};

/// Bound on the load-complete wait that follows a matched navigation.
const LOAD_GRACE: Duration = Duration::from_secs(5);

/// Caller-supplied condition evaluated inside the polling loop.
#[async_trait]
pub trait CustomCondition: Send + Sync {
    async fn evaluate(&self, target: &TargetId) -> Result<bool, AutomationError>;
}

/// Adapter for plain synchronous predicates.
pub struct FnCondition<F>(pub F)
where
    F: Fn(&TargetId) -> Result<bool, AutomationError> + Send + Sync;

#[async_trait]
impl<F> CustomCondition for FnCondition<F>
where
    F: Fn(&TargetId) -> Result<bool, AutomationError> + Send + Sync,
{
    async fn evaluate(&self, target: &TargetId) -> Result<bool, AutomationError> {
        (self.0)(target)
    }
}

/// Wait engine trait
#[async_trait]
pub trait WaitEngine: Send + Sync {
    /// Poll `condition` per `spec` until satisfied or timed out.
    async fn wait_for(
        &self,
        target: &TargetId,
        condition: &WaitCondition,
        spec: &WaitSpec,
    ) -> Result<WaitOutcome, AutomationError>;

    /// Register a custom condition under a name.
    fn register_condition(&self, name: &str, condition: Arc<dyn CustomCondition>);
}

enum Tick {
    Satisfied(Option<ElementHandle>),
    Pending,
}

/// Default wait engine implementation
pub struct DefaultWaitEngine {
    port: Arc<dyn PagePort>,
    directory: Arc<dyn TargetDirectory>,
    resolver: Arc<dyn ElementResolver>,
    custom: Mutex<HashMap<String, Arc<dyn CustomCondition>>>,
}

impl DefaultWaitEngine {
    pub fn new(
        port: Arc<dyn PagePort>,
        directory: Arc<dyn TargetDirectory>,
        resolver: Arc<dyn ElementResolver>,
    ) -> Self {
        Self {
            port,
            directory,
            resolver,
            custom: Mutex::new(HashMap::new()),
        }
    }

    async fn check(
        &self,
        target: &TargetId,
        condition: &WaitCondition,
        start_url: Option<&str>,
    ) -> Result<Tick, AutomationError> {
        match condition {
            WaitCondition::Presence(descriptor) => {
                let handles = self.resolver.resolve_fresh(target, descriptor, None).await?;
                Ok(match handles.into_iter().next() {
                    Some(handle) => Tick::Satisfied(Some(handle)),
                    None => Tick::Pending,
                })
            }

            WaitCondition::Visible(descriptor) => {
                let handles = self.resolver.resolve_fresh(target, descriptor, None).await?;
                for handle in handles {
                    if self.port.snapshot(target, &handle).await?.is_visible() {
                        return Ok(Tick::Satisfied(Some(handle)));
                    }
                }
                Ok(Tick::Pending)
            }

            WaitCondition::Hidden(descriptor) => {
                let handles = self.resolver.resolve_fresh(target, descriptor, None).await?;
                for handle in &handles {
                    if self.port.snapshot(target, handle).await?.is_visible() {
                        return Ok(Tick::Pending);
                    }
                }
                Ok(Tick::Satisfied(None))
            }

            WaitCondition::Clickable(descriptor) => {
                let handles = self.resolver.resolve_fresh(target, descriptor, None).await?;
                for handle in handles {
                    if self.is_clickable(target, &handle).await? {
                        return Ok(Tick::Satisfied(Some(handle)));
                    }
                }
                Ok(Tick::Pending)
            }

            WaitCondition::Navigation { matcher } => {
                let url = self.port.current_url(target).await?;
                let changed = start_url.map(|start| url != start).unwrap_or(true);
                if !changed {
                    return Ok(Tick::Pending);
                }
                if let Some(matcher) = matcher {
                    if !matcher.matches(&url)? {
                        return Ok(Tick::Pending);
                    }
                }
                // Address is right; give the load-complete signal a bounded
                // grace window.
                self.directory.wait_for_load(target, LOAD_GRACE).await?;
                Ok(Tick::Satisfied(None))
            }

            WaitCondition::Custom(name) => {
                let condition = {
                    let custom = self.custom.lock().unwrap();
                    custom.get(name).cloned()
                };
                let condition = condition.ok_or_else(|| {
                    AutomationError::Boundary(format!("unknown custom wait condition '{name}'"))
                })?;
                Ok(if condition.evaluate(target).await? {
                    Tick::Satisfied(None)
                } else {
                    Tick::Pending
                })
            }

            WaitCondition::NetworkQuiescent => {
                Ok(if self.port.pending_requests(target).await? == 0 {
                    Tick::Satisfied(None)
                } else {
                    Tick::Pending
                })
            }

            // Handled before the polling loop.
            WaitCondition::Delay(_) => Ok(Tick::Satisfied(None)),
        }
    }

    /// Visible, enabled, and winning the hit-test at its own center
    /// (or losing it only to a descendant).
    async fn is_clickable(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<bool, AutomationError> {
        let snapshot = self.port.snapshot(target, handle).await?;
        if !snapshot.is_visible() || !snapshot.enabled {
            return Ok(false);
        }

        let center = snapshot.rect.center();
        match self.port.element_at(target, center).await? {
            Some(hit) if &hit == handle => Ok(true),
            Some(hit) => self.port.is_descendant(target, &hit, handle).await,
            None => Ok(false),
        }
    }

    fn timed_out(
        &self,
        condition: &WaitCondition,
        spec: &WaitSpec,
    ) -> Result<WaitOutcome, AutomationError> {
        let message = spec
            .message
            .clone()
            .unwrap_or_else(|| condition.describe());
        if spec.fail_on_timeout {
            let timeout_ms = spec.timeout.as_millis() as u64;
            if condition.is_navigation() {
                Err(AutomationError::NavigationTimeout {
                    timeout_ms,
                    message,
                })
            } else {
                Err(AutomationError::WaitTimeout {
                    timeout_ms,
                    message,
                })
            }
        } else {
            debug!("wait for {message} timed out softly");
            Ok(WaitOutcome::TimedOut)
        }
    }
}

#[async_trait]
impl WaitEngine for DefaultWaitEngine {
    async fn wait_for(
        &self,
        target: &TargetId,
        condition: &WaitCondition,
        spec: &WaitSpec,
    ) -> Result<WaitOutcome, AutomationError> {
        if let WaitCondition::Delay(delay) = condition {
            sleep(*delay).await;
            return Ok(WaitOutcome::Satisfied(None));
        }

        let start_url = if condition.is_navigation() {
            Some(self.port.current_url(target).await?)
        } else {
            None
        };

        debug!("waiting for {}", condition.describe());
        let deadline = Instant::now() + spec.timeout;

        loop {
            match self.check(target, condition, start_url.as_deref()).await {
                Ok(Tick::Satisfied(handle)) => {
                    debug!("wait for {} satisfied", condition.describe());
                    return Ok(WaitOutcome::Satisfied(handle));
                }
                Ok(Tick::Pending) => {}
                Err(err) if condition.is_navigation() && err.kind().component() == "waiter" => {
                    // Load-complete grace expired; the address may still
                    // settle on a later tick.
                    warn!("navigation load wait lapsed: {err}");
                }
                Err(err) => return Err(err),
            }

            let now = Instant::now();
            if now >= deadline {
                return self.timed_out(condition, spec);
            }
            sleep(spec.interval.min(deadline - now)).await;
        }
    }

    fn register_condition(&self, name: &str, condition: Arc<dyn CustomCondition>) {
        self.custom
            .lock()
            .unwrap()
            .insert(name.to_string(), condition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UrlMatch;
    use element_locator::{DefaultElementResolver, SelectorDescriptor};
    use page_adapter::{MemoryNode, MemoryPage, Mutation};
    use std::sync::atomic::{AtomicU32, Ordering};
    use steadyweb_core_types::ErrorKind;

    fn engine_for(page: &Arc<MemoryPage>) -> DefaultWaitEngine {
        let resolver = Arc::new(DefaultElementResolver::new(page.clone()));
        DefaultWaitEngine::new(page.clone(), page.clone(), resolver)
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_resolves_when_element_appears() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let target = page.target_id();
        page.schedule(
            Duration::from_millis(300),
            Mutation::Insert(MemoryNode::new("late", "div").with_id("late")),
        );
        let engine = engine_for(&page);

        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Presence(SelectorDescriptor::css("#late")),
                &WaitSpec::new(Duration::from_secs(2)),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.element(),
            Some(&ElementHandle("late".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_timeout_never_raises() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let target = page.target_id();
        let engine = engine_for(&page);

        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Presence(SelectorDescriptor::css("#never")),
                &WaitSpec::new(Duration::from_millis(500)).soft(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_timeout_raises_wait_timeout() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let target = page.target_id();
        let engine = engine_for(&page);

        let err = engine
            .wait_for(
                &target,
                &WaitCondition::Visible(SelectorDescriptor::css("#never")),
                &WaitSpec::new(Duration::from_millis(500)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WaitTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clickable_blocked_by_overlay() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(
            MemoryNode::new("submit", "button")
                .with_id("submit")
                .with_rect(0.0, 100.0, 120.0, 32.0),
        );
        page.insert(
            MemoryNode::new("overlay", "div")
                .with_class("spinner")
                .with_rect(0.0, 0.0, 500.0, 500.0)
                .with_z(10),
        );
        page.schedule(
            Duration::from_millis(400),
            Mutation::Remove(ElementHandle("overlay".to_string())),
        );
        let target = page.target_id();
        let engine = engine_for(&page);

        let started = Instant::now();
        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Clickable(SelectorDescriptor::css("#submit")),
                &WaitSpec::new(Duration::from_secs(2)),
            )
            .await
            .unwrap();
        assert!(outcome.is_satisfied());
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clickable_accepts_descendant_hit() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(
            MemoryNode::new("submit", "button")
                .with_id("submit")
                .with_rect(0.0, 100.0, 120.0, 32.0),
        );
        page.insert(
            MemoryNode::new("icon", "span")
                .with_parent("submit")
                .with_rect(50.0, 110.0, 20.0, 12.0)
                .with_z(1),
        );
        let target = page.target_id();
        let engine = engine_for(&page);

        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Clickable(SelectorDescriptor::css("#submit")),
                &WaitSpec::new(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.element(),
            Some(&ElementHandle("submit".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_element_is_not_clickable() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(
            MemoryNode::new("submit", "button")
                .with_id("submit")
                .disabled()
                .with_rect(0.0, 100.0, 120.0, 32.0),
        );
        let target = page.target_id();
        let engine = engine_for(&page);

        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Clickable(SelectorDescriptor::css("#submit")),
                &WaitSpec::new(Duration::from_millis(300)).soft(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_satisfied_when_element_disappears() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(MemoryNode::new("toast", "div").with_id("toast"));
        page.schedule(
            Duration::from_millis(200),
            Mutation::Hide(ElementHandle("toast".to_string())),
        );
        let target = page.target_id();
        let engine = engine_for(&page);

        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Hidden(SelectorDescriptor::css("#toast")),
                &WaitSpec::new(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        assert!(outcome.is_satisfied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_matches_contains() {
        let page = Arc::new(MemoryPage::new("https://example.test/cart"));
        page.schedule(
            Duration::from_millis(250),
            Mutation::SetUrl("https://example.test/checkout/done".to_string()),
        );
        let target = page.target_id();
        let engine = engine_for(&page);

        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Navigation {
                    matcher: Some(UrlMatch::Contains("/checkout".to_string())),
                },
                &WaitSpec::navigation(),
            )
            .await
            .unwrap();
        assert!(outcome.is_satisfied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_timeout_kind() {
        let page = Arc::new(MemoryPage::new("https://example.test/cart"));
        let target = page.target_id();
        let engine = engine_for(&page);

        let err = engine
            .wait_for(
                &target,
                &WaitCondition::Navigation { matcher: None },
                &WaitSpec::new(Duration::from_millis(400)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NavigationTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_condition_by_name() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let target = page.target_id();
        let engine = engine_for(&page);

        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        engine.register_condition(
            "third-tick",
            Arc::new(FnCondition(move |_: &TargetId| {
                Ok(counted.fetch_add(1, Ordering::SeqCst) + 1 >= 3)
            })),
        );

        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::Custom("third-tick".to_string()),
                &WaitSpec::new(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        assert!(outcome.is_satisfied());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_custom_condition_is_an_error() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let target = page.target_id();
        let engine = engine_for(&page);

        let err = engine
            .wait_for(
                &target,
                &WaitCondition::Custom("unregistered".to_string()),
                &WaitSpec::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Boundary);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_quiescent() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.set_pending_requests(2);
        page.schedule(Duration::from_millis(350), Mutation::SetPendingRequests(0));
        let target = page.target_id();
        let engine = engine_for(&page);

        let started = Instant::now();
        let outcome = engine
            .wait_for(
                &target,
                &WaitCondition::NetworkQuiescent,
                &WaitSpec::new(Duration::from_secs(2)),
            )
            .await
            .unwrap();
        assert!(outcome.is_satisfied());
        assert!(started.elapsed() >= Duration::from_millis(350));
    }
}
