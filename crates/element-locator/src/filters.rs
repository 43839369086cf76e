//! Visibility and interactivity filters over resolved sets

use page_adapter::PagePort;
use steadyweb_core_types::{AutomationError, ElementHandle, ElementSnapshot, TargetId};

use crate::resolver::{DefaultElementResolver, ElementResolver};
use crate::types::SelectorDescriptor;

/// Tags that accept direct user interaction.
const INTERACTIVE_TAGS: [&str; 5] = ["a", "button", "input", "select", "textarea"];

/// Tags participating in form entry.
const FORM_TAGS: [&str; 4] = ["input", "select", "textarea", "button"];

/// Non-zero rendered size and not hidden via visibility/display/opacity.
pub async fn is_visible(
    port: &dyn PagePort,
    target: &TargetId,
    handle: &ElementHandle,
) -> Result<bool, AutomationError> {
    Ok(port.snapshot(target, handle).await?.is_visible())
}

fn is_interactive(snapshot: &ElementSnapshot) -> bool {
    INTERACTIVE_TAGS.contains(&snapshot.tag.as_str())
        || snapshot.attribute("onclick").is_some()
        || snapshot.attribute("role") == Some("button")
}

fn is_form_element(snapshot: &ElementSnapshot) -> bool {
    FORM_TAGS.contains(&snapshot.tag.as_str())
}

impl DefaultElementResolver {
    /// Matches that are currently rendered visible.
    pub async fn find_visible(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        self.find_filtered(target, descriptor, |s| s.is_visible())
            .await
    }

    /// Visible, enabled matches with an interactive tag or click affordance.
    pub async fn find_interactive(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        self.find_filtered(target, descriptor, |s| {
            s.is_visible() && s.enabled && is_interactive(s)
        })
        .await
    }

    /// Matches that participate in form entry.
    pub async fn find_form_elements(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        self.find_filtered(target, descriptor, is_form_element).await
    }

    async fn find_filtered(
        &self,
        target: &TargetId,
        descriptor: &SelectorDescriptor,
        keep: impl Fn(&ElementSnapshot) -> bool,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        let handles = self.resolve(target, descriptor, None).await?;
        let mut kept = Vec::new();
        for handle in handles {
            let snapshot = self.port().snapshot(target, &handle).await?;
            if keep(&snapshot) {
                kept.push(handle);
            }
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::{MemoryNode, MemoryPage};
    use std::sync::Arc;

    fn mixed_page() -> Arc<MemoryPage> {
        let page = MemoryPage::new("https://example.test");
        page.insert(
            MemoryNode::new("visible-btn", "button")
                .with_class("action")
                .with_rect(0.0, 0.0, 80.0, 30.0),
        );
        page.insert(
            MemoryNode::new("hidden-btn", "button")
                .with_class("action")
                .hidden(),
        );
        page.insert(
            MemoryNode::new("disabled-btn", "button")
                .with_class("action")
                .disabled(),
        );
        page.insert(MemoryNode::new("label", "span").with_class("action"));
        Arc::new(page)
    }

    #[tokio::test]
    async fn test_find_visible_drops_hidden() {
        let page = mixed_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let visible = resolver
            .find_visible(&target, &SelectorDescriptor::css(".action"))
            .await
            .unwrap();
        assert_eq!(visible.len(), 3);
        assert!(!visible.contains(&ElementHandle("hidden-btn".to_string())));
    }

    #[tokio::test]
    async fn test_find_interactive_requires_enabled_interactive() {
        let page = mixed_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let interactive = resolver
            .find_interactive(&target, &SelectorDescriptor::css(".action"))
            .await
            .unwrap();
        assert_eq!(
            interactive,
            vec![ElementHandle("visible-btn".to_string())]
        );
    }

    #[tokio::test]
    async fn test_find_form_elements_keeps_form_tags_only() {
        let page = mixed_page();
        let target = page.target_id();
        let resolver = DefaultElementResolver::new(page.clone());

        let form = resolver
            .find_form_elements(&target, &SelectorDescriptor::css(".action"))
            .await
            .unwrap();
        assert_eq!(form.len(), 3);
        assert!(!form.contains(&ElementHandle("label".to_string())));
    }
}
