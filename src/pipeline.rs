//! Pipeline assembly and facade
//!
//! Wires the resolver, wait engine, recovery engine, and retry orchestrator
//! over a pair of injected ports. No globals: every service is owned by the
//! pipeline instance, and two pipelines never share state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use command_retry::{Command, RetryOptions, RetryOrchestrator, WrappedCommand};
use element_locator::{
    Candidate, CacheStats, DefaultElementResolver, ElementResolver, SelectorDescriptor,
};
use page_adapter::{PagePort, TargetDirectory};
use recovery_engine::{
    DefaultRecoveryEngine, RecoveryContext, RecoveryEngine, RecoveryOptions, RecoveryStrategy,
    StatKey,
};
use steadyweb_core_types::{AutomationError, ElementHandle, TargetId};
use wait_engine::{
    CustomCondition, DefaultWaitEngine, UrlMatch, WaitCondition, WaitEngine, WaitOutcome, WaitSpec,
};

use crate::config::PipelineConfig;

/// The assembled resilience pipeline.
pub struct Pipeline {
    directory: Arc<dyn TargetDirectory>,
    resolver: Arc<DefaultElementResolver>,
    waiter: Arc<DefaultWaitEngine>,
    recovery: Arc<DefaultRecoveryEngine>,
    orchestrator: RetryOrchestrator,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        port: Arc<dyn PagePort>,
        directory: Arc<dyn TargetDirectory>,
        config: PipelineConfig,
    ) -> Self {
        let resolver = Arc::new(DefaultElementResolver::with_cache_ttl(
            port.clone(),
            config.cache_ttl,
        ));
        let waiter = Arc::new(DefaultWaitEngine::new(
            port.clone(),
            directory.clone(),
            resolver.clone() as Arc<dyn ElementResolver>,
        ));
        let recovery = Arc::new(DefaultRecoveryEngine::new(
            port,
            directory.clone(),
            resolver.clone() as Arc<dyn ElementResolver>,
            waiter.clone() as Arc<dyn WaitEngine>,
        ));
        let orchestrator = RetryOrchestrator::new(recovery.clone() as Arc<dyn RecoveryEngine>);

        info!("pipeline assembled (cache ttl {:?})", config.cache_ttl);
        Self {
            directory,
            resolver,
            waiter,
            recovery,
            orchestrator,
            config,
        }
    }

    fn wait_spec(&self) -> WaitSpec {
        WaitSpec::new(self.config.wait_timeout).with_interval(self.config.wait_interval)
    }

    pub async fn active_target(&self) -> Result<TargetId, AutomationError> {
        self.directory.active_target().await
    }

    pub async fn navigate(&self, target: &TargetId, url: &str) -> Result<(), AutomationError> {
        self.directory.navigate(target, url).await
    }

    // --- resolution ---

    /// All matches for an untyped strategy/value pair, in document order.
    pub async fn find_elements(
        &self,
        target: &TargetId,
        strategy: &str,
        value: &str,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        let descriptor = SelectorDescriptor::parse(strategy, value)?;
        self.resolver.resolve(target, &descriptor, None).await
    }

    /// First match, or `None`.
    pub async fn find_element(
        &self,
        target: &TargetId,
        strategy: &str,
        value: &str,
    ) -> Result<Option<ElementHandle>, AutomationError> {
        let descriptor = SelectorDescriptor::parse(strategy, value)?;
        self.resolver.find_element(target, &descriptor, None).await
    }

    pub async fn resolve(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        self.resolver.resolve(target, descriptor, root).await
    }

    pub async fn generate_candidates(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<Vec<Candidate>, AutomationError> {
        self.resolver.generate_candidates(target, handle).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache_stats()
    }

    pub fn clear_cache(&self) {
        self.resolver.clear_cache()
    }

    // --- waiting ---

    pub async fn wait_for(
        &self,
        target: &TargetId,
        condition: &WaitCondition,
        spec: &WaitSpec,
    ) -> Result<WaitOutcome, AutomationError> {
        self.waiter.wait_for(target, condition, spec).await
    }

    pub async fn wait_for_presence(
        &self,
        target: &TargetId,
        descriptor: SelectorDescriptor,
    ) -> Result<WaitOutcome, AutomationError> {
        self.waiter
            .wait_for(
                target,
                &WaitCondition::Presence(descriptor),
                &self.wait_spec(),
            )
            .await
    }

    pub async fn wait_for_visible(
        &self,
        target: &TargetId,
        descriptor: SelectorDescriptor,
    ) -> Result<WaitOutcome, AutomationError> {
        self.waiter
            .wait_for(
                target,
                &WaitCondition::Visible(descriptor),
                &self.wait_spec(),
            )
            .await
    }

    pub async fn wait_for_clickable(
        &self,
        target: &TargetId,
        descriptor: SelectorDescriptor,
    ) -> Result<WaitOutcome, AutomationError> {
        self.waiter
            .wait_for(
                target,
                &WaitCondition::Clickable(descriptor),
                &self.wait_spec(),
            )
            .await
    }

    pub async fn wait_for_navigation(
        &self,
        target: &TargetId,
        matcher: Option<UrlMatch>,
    ) -> Result<WaitOutcome, AutomationError> {
        self.waiter
            .wait_for(
                target,
                &WaitCondition::Navigation { matcher },
                &WaitSpec::navigation().with_interval(self.config.wait_interval),
            )
            .await
    }

    pub fn register_condition(&self, name: &str, condition: Arc<dyn CustomCondition>) {
        self.waiter.register_condition(name, condition)
    }

    // --- recovery ---

    pub async fn attempt_recovery(
        &self,
        ctx: &RecoveryContext,
        options: &RecoveryOptions,
    ) -> bool {
        self.recovery.attempt_recovery(ctx, options).await
    }

    pub fn register_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        self.recovery.register_strategy(strategy)
    }

    pub fn statistics(&self) -> HashMap<StatKey, u64> {
        self.recovery.statistics()
    }

    pub fn clear_statistics(&self) {
        self.recovery.clear_statistics()
    }

    // --- retry ---

    /// Wrap a command with the pipeline's configured retry policy.
    pub fn wrap(&self, command: Arc<dyn Command>) -> WrappedCommand {
        let options = RetryOptions {
            max_retries: self.config.max_retries,
            retry_delay: self.config.retry_delay,
            enable_recovery: self.config.enable_recovery,
            ..Default::default()
        };
        self.orchestrator.wrap(command, options)
    }

    pub fn wrap_with(&self, command: Arc<dyn Command>, options: RetryOptions) -> WrappedCommand {
        self.orchestrator.wrap(command, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::{MemoryNode, MemoryPage};
    use steadyweb_core_types::ErrorKind;

    #[tokio::test]
    async fn test_find_element_through_facade() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        page.insert(MemoryNode::new("submit", "button").with_id("submit"));
        let pipeline = Pipeline::new(page.clone(), page.clone(), PipelineConfig::default());
        let target = pipeline.active_target().await.unwrap();

        let found = pipeline
            .find_element(&target, "css", "#submit")
            .await
            .unwrap();
        assert_eq!(found, Some(ElementHandle("submit".to_string())));
    }

    #[tokio::test]
    async fn test_unknown_strategy_rejected_at_facade() {
        let page = Arc::new(MemoryPage::new("https://example.test"));
        let pipeline = Pipeline::new(page.clone(), page.clone(), PipelineConfig::default());
        let target = pipeline.active_target().await.unwrap();

        let err = pipeline
            .find_elements(&target, "querySelector", "#submit")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSelectorStrategy);
    }

    #[tokio::test]
    async fn test_two_pipelines_do_not_share_state() {
        let page_a = Arc::new(MemoryPage::new("https://a.test"));
        let page_b = Arc::new(MemoryPage::new("https://b.test"));
        let a = Pipeline::new(page_a.clone(), page_a.clone(), PipelineConfig::default());
        let b = Pipeline::new(page_b.clone(), page_b.clone(), PipelineConfig::default());

        let ctx = RecoveryContext::new(
            page_a.target_id(),
            AutomationError::PermissionDenied("clipboard".to_string()),
        );
        a.attempt_recovery(&ctx, &RecoveryOptions::default()).await;

        assert_eq!(a.statistics().len(), 1);
        assert!(b.statistics().is_empty());
    }
}
