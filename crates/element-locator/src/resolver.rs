//! Element resolver with strategy dispatch and result caching

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use page_adapter::{PagePort, SelectorQuery};
use steadyweb_core_types::{AutomationError, ElementHandle, TargetId};

use crate::cache::{CacheKey, CacheStats, QueryCache, DEFAULT_CACHE_TTL};
use crate::candidates;
use crate::types::{Candidate, SelectorDescriptor, SelectorStrategy};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve a descriptor to all matching elements, in document order.
    ///
    /// An empty result is not an error; callers decide whether absence is.
    async fn resolve(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError>;

    /// Resolve without consulting or populating the cache.
    ///
    /// Polling loops re-query on every tick; serving them a cached set would
    /// hide page changes for a whole TTL window.
    async fn resolve_fresh(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError>;

    /// First match, or `None` when nothing matched.
    async fn find_element(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Result<Option<ElementHandle>, AutomationError> {
        Ok(self
            .resolve(target, descriptor, root)
            .await?
            .into_iter()
            .next())
    }

    /// Ranked descriptors usable to re-find `handle` later.
    async fn generate_candidates(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<Vec<Candidate>, AutomationError>;
}

/// Default element resolver implementation
pub struct DefaultElementResolver {
    port: Arc<dyn PagePort>,
    cache: QueryCache,
}

impl DefaultElementResolver {
    /// Create a resolver with the default 5s cache TTL.
    pub fn new(port: Arc<dyn PagePort>) -> Self {
        Self::with_cache_ttl(port, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache_ttl(port: Arc<dyn PagePort>, ttl: Duration) -> Self {
        Self {
            port,
            cache: QueryCache::new(ttl),
        }
    }

    pub fn port(&self) -> &Arc<dyn PagePort> {
        &self.port
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear()
    }

    async fn resolve_uncached(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        match descriptor.strategy {
            SelectorStrategy::Css => {
                self.port
                    .query(target, &SelectorQuery::Css(descriptor.value.clone()), root)
                    .await
            }
            SelectorStrategy::XPath => {
                self.port
                    .query(
                        target,
                        &SelectorQuery::XPath(descriptor.value.clone()),
                        root,
                    )
                    .await
            }
            SelectorStrategy::Text => {
                let matches = self
                    .port
                    .query(
                        target,
                        &SelectorQuery::TextContains(descriptor.value.clone()),
                        root,
                    )
                    .await?;
                Ok(dedup_by_identity(matches))
            }
            SelectorStrategy::Attribute => {
                let name = descriptor.attribute.clone().ok_or_else(|| {
                    AutomationError::InvalidSelectorSyntax(
                        "attribute strategy requires an attribute name".to_string(),
                    )
                })?;
                self.port
                    .query(
                        target,
                        &SelectorQuery::Attribute {
                            name,
                            value: descriptor.value.clone(),
                        },
                        root,
                    )
                    .await
            }
            SelectorStrategy::Index => {
                let matches = self
                    .port
                    .query(target, &SelectorQuery::Css(descriptor.value.clone()), root)
                    .await?;
                // Out-of-range yields empty, not an error.
                let index = descriptor.index.unwrap_or(0);
                Ok(matches.into_iter().nth(index).into_iter().collect())
            }
        }
    }
}

#[async_trait]
impl ElementResolver for DefaultElementResolver {
    async fn resolve(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        let key = CacheKey::new(target, descriptor, root);
        if let Some(handles) = self.cache.get(&key) {
            debug!(%descriptor, "resolved from cache ({} handles)", handles.len());
            return Ok(handles);
        }

        let handles = self.resolve_uncached(target, descriptor, root).await?;
        debug!(%descriptor, "resolved {} handles", handles.len());
        self.cache.insert(key, handles.clone());
        Ok(handles)
    }

    async fn resolve_fresh(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        self.resolve_uncached(target, descriptor, root).await
    }

    async fn generate_candidates(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<Vec<Candidate>, AutomationError> {
        candidates::generate(self.port.as_ref(), target, handle).await
    }
}

/// Deduplicate by element identity, preserving first-seen order.
fn dedup_by_identity(handles: Vec<ElementHandle>) -> Vec<ElementHandle> {
    let mut seen = HashSet::new();
    handles
        .into_iter()
        .filter(|handle| seen.insert(handle.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::{MemoryNode, MemoryPage};
    use steadyweb_core_types::ErrorKind;

    fn demo_page() -> Arc<MemoryPage> {
        let page = MemoryPage::new("https://example.test");
        page.insert(MemoryNode::new("list", "ul"));
        page.insert(
            MemoryNode::new("item-1", "li")
                .with_parent("list")
                .with_class("item")
                .with_text("First item"),
        );
        page.insert(
            MemoryNode::new("item-2", "li")
                .with_parent("list")
                .with_class("item")
                .with_text("Second item"),
        );
        page.insert(
            MemoryNode::new("save", "button")
                .with_id("save")
                .with_attr("name", "save")
                .with_text("Save item"),
        );
        Arc::new(page)
    }

    #[tokio::test]
    async fn test_css_resolution() {
        let page = demo_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let matches = resolver
            .resolve(&target, &SelectorDescriptor::css(".item"), None)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0], ElementHandle("item-1".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_css_propagates_syntax_error() {
        let page = demo_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let err = resolver
            .resolve(&target, &SelectorDescriptor::css("##"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSelectorSyntax);
    }

    #[tokio::test]
    async fn test_text_resolution_dedups_in_order() {
        let page = demo_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let matches = resolver
            .resolve(&target, &SelectorDescriptor::text("item"), None)
            .await
            .unwrap();
        assert_eq!(
            matches,
            vec![
                ElementHandle("item-1".to_string()),
                ElementHandle("item-2".to_string()),
                ElementHandle("save".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_attribute_resolution_requires_name() {
        let page = demo_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let matches = resolver
            .resolve(&target, &SelectorDescriptor::attribute("name", "save"), None)
            .await
            .unwrap();
        assert_eq!(matches, vec![ElementHandle("save".to_string())]);

        let mut bad = SelectorDescriptor::attribute("name", "save");
        bad.attribute = None;
        let err = resolver.resolve(&target, &bad, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSelectorSyntax);
    }

    #[tokio::test]
    async fn test_index_resolution() {
        let page = demo_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let second = resolver
            .resolve(&target, &SelectorDescriptor::index("li", 1), None)
            .await
            .unwrap();
        assert_eq!(second, vec![ElementHandle("item-2".to_string())]);

        let out_of_range = resolver
            .resolve(&target, &SelectorDescriptor::index("li", 9), None)
            .await
            .unwrap();
        assert!(out_of_range.is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let page = demo_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let matches = resolver
            .resolve(&target, &SelectorDescriptor::css("#missing"), None)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_within_ttl_fresh_after() {
        let page = demo_page();
        let target = page.target_id();
        let resolver =
            DefaultElementResolver::with_cache_ttl(page.clone(), Duration::from_secs(5));
        let descriptor = SelectorDescriptor::css(".item");

        resolver.resolve(&target, &descriptor, None).await.unwrap();
        resolver.resolve(&target, &descriptor, None).await.unwrap();
        assert_eq!(page.query_count(), 1);
        assert_eq!(resolver.cache_stats().hits, 1);

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        resolver.resolve(&target, &descriptor, None).await.unwrap();
        assert_eq!(page.query_count(), 2);
    }
}
