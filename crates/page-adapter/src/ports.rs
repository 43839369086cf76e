//! Port traits consumed by the resilience core

use async_trait::async_trait;
use std::time::Duration;
use steadyweb_core_types::{AutomationError, ElementHandle, ElementSnapshot, Point, TargetId};

use crate::model::{ClickMethod, SelectorQuery, TargetInfo};

/// Execution boundary into one live page context.
#[async_trait]
pub trait PagePort: Send + Sync {
    /// Run a primitive query, optionally scoped to the subtree under `root`.
    async fn query(
        &self,
        target: &TargetId,
        query: &SelectorQuery,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError>;

    /// Capture the current observable state of an element.
    async fn snapshot(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<ElementSnapshot, AutomationError>;

    /// Hit-test: the topmost rendered element at a page point.
    async fn element_at(
        &self,
        target: &TargetId,
        point: Point,
    ) -> Result<Option<ElementHandle>, AutomationError>;

    /// Whether `node` sits under `ancestor` in the element tree.
    async fn is_descendant(
        &self,
        target: &TargetId,
        node: &ElementHandle,
        ancestor: &ElementHandle,
    ) -> Result<bool, AutomationError>;

    /// Deliver a click to an element.
    async fn click(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
        method: ClickMethod,
    ) -> Result<(), AutomationError>;

    /// Scroll the page to its top.
    async fn scroll_to_top(&self, target: &TargetId) -> Result<(), AutomationError>;

    /// Bring an element into the viewport.
    async fn scroll_into_view(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<(), AutomationError>;

    /// Replace a form field's value.
    async fn set_value(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<(), AutomationError>;

    /// Emit the input/change notifications a user edit would produce.
    async fn dispatch_edit_events(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<(), AutomationError>;

    /// Structural XPath that re-finds this element.
    async fn xpath_of(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<String, AutomationError>;

    /// Current address of the target.
    async fn current_url(&self, target: &TargetId) -> Result<String, AutomationError>;

    /// Number of automation-observable requests in flight.
    async fn pending_requests(&self, target: &TargetId) -> Result<u32, AutomationError>;
}

/// Minimal tab/page lifecycle operations.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    async fn active_target(&self) -> Result<TargetId, AutomationError>;

    async fn target(&self, id: &TargetId) -> Result<TargetInfo, AutomationError>;

    /// Block until the target reports load-complete, bounded by `timeout`.
    async fn wait_for_load(
        &self,
        id: &TargetId,
        timeout: Duration,
    ) -> Result<(), AutomationError>;

    async fn navigate(&self, id: &TargetId, url: &str) -> Result<(), AutomationError>;

    async fn reload(&self, id: &TargetId) -> Result<(), AutomationError>;
}
