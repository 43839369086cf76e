//! The recovery engine

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use element_locator::ElementResolver;
use page_adapter::{PagePort, TargetDirectory};
use wait_engine::WaitEngine;

use crate::stats::{ErrorStats, StatKey};
use crate::strategies::{
    ElementNotClickableStrategy, ElementNotFoundStrategy, ElementNotVisibleStrategy,
    FormValidationStrategy, NavigationTimeoutStrategy, PermissionDeniedStrategy,
    RecoveryStrategy,
};
use crate::types::{RecoveryContext, RecoveryOptions};

/// Recovery engine trait
#[async_trait]
pub trait RecoveryEngine: Send + Sync {
    /// Walk the strategy list and report whether any strategy repaired the
    /// page. Never returns an error: strategy failures are logged and count
    /// as "did not recover".
    async fn attempt_recovery(&self, ctx: &RecoveryContext, options: &RecoveryOptions) -> bool;

    /// Add a strategy tried after per-call customs but before built-ins.
    fn register_strategy(&self, strategy: Arc<dyn RecoveryStrategy>);

    fn statistics(&self) -> HashMap<StatKey, u64>;

    fn clear_statistics(&self);
}

/// Default recovery engine implementation
pub struct DefaultRecoveryEngine {
    builtins: Vec<Arc<dyn RecoveryStrategy>>,
    registered: Mutex<Vec<Arc<dyn RecoveryStrategy>>>,
    stats: ErrorStats,
}

impl DefaultRecoveryEngine {
    pub fn new(
        port: Arc<dyn PagePort>,
        directory: Arc<dyn TargetDirectory>,
        resolver: Arc<dyn ElementResolver>,
        waiter: Arc<dyn WaitEngine>,
    ) -> Self {
        let builtins: Vec<Arc<dyn RecoveryStrategy>> = vec![
            Arc::new(ElementNotFoundStrategy::new(
                resolver.clone(),
                waiter.clone(),
            )),
            Arc::new(ElementNotVisibleStrategy::new(port.clone(), waiter)),
            Arc::new(ElementNotClickableStrategy::new(
                port.clone(),
                resolver.clone(),
            )),
            Arc::new(NavigationTimeoutStrategy::new(directory)),
            Arc::new(FormValidationStrategy::new(port, resolver)),
            Arc::new(PermissionDeniedStrategy),
        ];
        Self {
            builtins,
            registered: Mutex::new(Vec::new()),
            stats: ErrorStats::new(),
        }
    }

    /// Run one strategy with its own attempt budget and linear backoff.
    async fn run_strategy(
        &self,
        strategy: &Arc<dyn RecoveryStrategy>,
        ctx: &RecoveryContext,
    ) -> bool {
        let max_attempts = strategy.max_attempts().max(1);
        for attempt in 1..=max_attempts {
            debug!(
                "strategy '{}' attempt {attempt}/{max_attempts}",
                strategy.name()
            );
            match strategy.recover(&ctx.error, ctx).await {
                Ok(true) => {
                    info!("strategy '{}' recovered the failure", strategy.name());
                    return true;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!("strategy '{}' errored: {err}", strategy.name());
                }
            }
            if attempt < max_attempts {
                sleep(strategy.delay() * attempt).await;
            }
        }
        false
    }
}

#[async_trait]
impl RecoveryEngine for DefaultRecoveryEngine {
    async fn attempt_recovery(&self, ctx: &RecoveryContext, options: &RecoveryOptions) -> bool {
        self.stats.record(ctx.error.kind(), ctx.operation());

        let registered = self.registered.lock().unwrap().clone();
        let ordered = options
            .custom_strategies
            .iter()
            .chain(registered.iter())
            .chain(self.builtins.iter());

        for strategy in ordered {
            if !strategy.can_recover(&ctx.error, ctx) {
                continue;
            }
            debug!(
                "trying strategy '{}' for {:?} during {}",
                strategy.name(),
                ctx.error.kind(),
                ctx.operation()
            );
            if self.run_strategy(strategy, ctx).await {
                return true;
            }
        }

        warn!(
            "no strategy recovered {:?} during {}",
            ctx.error.kind(),
            ctx.operation()
        );
        false
    }

    fn register_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        self.registered.lock().unwrap().push(strategy);
    }

    fn statistics(&self) -> HashMap<StatKey, u64> {
        self.stats.snapshot()
    }

    fn clear_statistics(&self) {
        self.stats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommandDescriptor;
    use element_locator::{DefaultElementResolver, SelectorDescriptor};
    use page_adapter::{ClickMethod, MemoryNode, MemoryPage, Mutation};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use steadyweb_core_types::{AutomationError, ElementHandle, ErrorKind};
    use wait_engine::DefaultWaitEngine;

    fn engine_for(page: &Arc<MemoryPage>) -> DefaultRecoveryEngine {
        let resolver = Arc::new(DefaultElementResolver::new(page.clone()));
        let waiter = Arc::new(DefaultWaitEngine::new(
            page.clone(),
            page.clone(),
            resolver.clone(),
        ));
        DefaultRecoveryEngine::new(page.clone(), page.clone(), resolver, waiter)
    }

    fn not_found_ctx(page: &Arc<MemoryPage>) -> RecoveryContext {
        RecoveryContext::new(
            page.target_id(),
            AutomationError::ElementNotFound("#submit".to_string()),
        )
        .with_selector(SelectorDescriptor::css("#submit"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_selector_recovers_not_found() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(MemoryNode::new("alt", "button").with_class("submit-btn"));
        let engine = engine_for(&page);

        let ctx = not_found_ctx(&page)
            .with_fallbacks(vec![SelectorDescriptor::css(".submit-btn")]);
        assert!(engine.attempt_recovery(&ctx, &RecoveryOptions::default()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reappearing_element_recovers_not_found() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.schedule(
            Duration::from_millis(400),
            Mutation::Insert(MemoryNode::new("submit", "button").with_id("submit")),
        );
        let engine = engine_for(&page);

        assert!(
            engine
                .attempt_recovery(&not_found_ctx(&page), &RecoveryOptions::default())
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_gives_up_without_matches() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let engine = engine_for(&page);

        assert!(
            !engine
                .attempt_recovery(&not_found_ctx(&page), &RecoveryOptions::default())
                .await
        );
        assert_eq!(
            engine.statistics().values().copied().sum::<u64>(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_visible_recovers_after_scroll() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(MemoryNode::new("banner", "div").with_id("banner").hidden());
        // Becomes visible only after the first 3s wait has lapsed, so the
        // scroll-then-rewait leg is what observes it.
        page.schedule(
            Duration::from_millis(3_200),
            Mutation::Show(ElementHandle("banner".to_string())),
        );
        let engine = engine_for(&page);

        let ctx = RecoveryContext::new(
            page.target_id(),
            AutomationError::ElementNotVisible("#banner".to_string()),
        )
        .with_selector(SelectorDescriptor::css("#banner"));

        assert!(engine.attempt_recovery(&ctx, &RecoveryOptions::default()).await);
        assert!(page.scroll_to_top_count() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_clickable_falls_back_to_pointer_click() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let submit = page.insert(
            MemoryNode::new("submit", "button")
                .with_id("submit")
                .with_rect(0.0, 100.0, 120.0, 32.0),
        );
        page.block_native_click(&submit);
        let engine = engine_for(&page);

        let ctx = RecoveryContext::new(
            page.target_id(),
            AutomationError::ElementNotClickable("#submit".to_string()),
        )
        .with_selector(SelectorDescriptor::css("#submit"));

        assert!(engine.attempt_recovery(&ctx, &RecoveryOptions::default()).await);
        let clicks = page.clicks();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].0, submit);
        assert!(matches!(clicks[0].1, ClickMethod::Pointer(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_validation_refills_field() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(
            MemoryNode::new("email", "input")
                .with_id("email")
                .with_attr("name", "email"),
        );
        let engine = engine_for(&page);

        let ctx = RecoveryContext::new(
            page.target_id(),
            AutomationError::FormValidationFailed("email rejected".to_string()),
        )
        .with_command(
            CommandDescriptor::new("fill")
                .with_selector(SelectorDescriptor::css("#email"))
                .with_value("user@example.test"),
        );

        assert!(engine.attempt_recovery(&ctx, &RecoveryOptions::default()).await);
        assert_eq!(
            page.value_of(&ElementHandle("email".to_string())),
            Some("user@example.test".to_string())
        );
        // Clear and refill each dispatch input+change.
        assert_eq!(
            page.events()
                .iter()
                .filter(|e| e.starts_with("input@"))
                .count(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_is_terminal() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let engine = engine_for(&page);

        let ctx = RecoveryContext::new(
            page.target_id(),
            AutomationError::PermissionDenied("clipboard".to_string()),
        );
        assert!(!engine.attempt_recovery(&ctx, &RecoveryOptions::default()).await);
        assert_eq!(engine.statistics().len(), 1);
    }

    struct CountingStrategy {
        calls: Arc<AtomicU32>,
        outcome: bool,
    }

    #[async_trait]
    impl RecoveryStrategy for CountingStrategy {
        fn name(&self) -> &str {
            "counting"
        }

        fn can_recover(&self, _error: &AutomationError, _ctx: &RecoveryContext) -> bool {
            true
        }

        async fn recover(
            &self,
            _error: &AutomationError,
            _ctx: &RecoveryContext,
        ) -> Result<bool, AutomationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome)
        }

        fn max_attempts(&self) -> u32 {
            1
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_strategy_runs_before_builtins() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(MemoryNode::new("submit", "button").with_id("submit"));
        let engine = engine_for(&page);

        let calls = Arc::new(AtomicU32::new(0));
        let options = RecoveryOptions::default().with_strategy(Arc::new(CountingStrategy {
            calls: calls.clone(),
            outcome: true,
        }));

        // The built-in would also succeed here; the custom one must win.
        assert!(engine.attempt_recovery(&not_found_ctx(&page), &options).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.query_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registered_strategy_is_consulted() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let engine = engine_for(&page);

        let calls = Arc::new(AtomicU32::new(0));
        engine.register_strategy(Arc::new(CountingStrategy {
            calls: calls.clone(),
            outcome: false,
        }));

        let ctx = RecoveryContext::new(
            page.target_id(),
            AutomationError::PermissionDenied("clipboard".to_string()),
        );
        assert!(!engine.attempt_recovery(&ctx, &RecoveryOptions::default()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_kind_without_selector_is_not_handled() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let engine = engine_for(&page);

        // ElementNotFound but no selector in context: the built-in declines.
        let ctx = RecoveryContext::new(
            page.target_id(),
            AutomationError::ElementNotFound("#submit".to_string()),
        );
        assert!(!engine.attempt_recovery(&ctx, &RecoveryOptions::default()).await);
    }
}
