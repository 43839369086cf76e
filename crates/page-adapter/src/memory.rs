//! In-memory page implementing both ports
//!
//! A deterministic stand-in for a live browser target. The element tree is a
//! flat document-ordered node list with parent links; mutations can be
//! scheduled against the tokio clock so tests can script "element appears at
//! t=300ms, overlay clears at t=500ms" scenarios under a paused runtime.
//!
//! The CSS/XPath support intentionally covers only the simple compound forms
//! the resolver and candidate generator emit; anything else is reported as
//! invalid syntax.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use steadyweb_core_types::{
    AutomationError, ElementHandle, ElementSnapshot, Point, TargetId,
};

use crate::model::{ClickMethod, SelectorQuery, TargetInfo};
use crate::ports::{PagePort, TargetDirectory};

/// One element in the in-memory tree.
#[derive(Clone, Debug)]
pub struct MemoryNode {
    pub handle: ElementHandle,
    pub parent: Option<ElementHandle>,
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub rect: steadyweb_core_types::Rect,
    pub visible: bool,
    pub enabled: bool,
    pub z_index: i32,
    pub value: String,
}

impl MemoryNode {
    pub fn new(handle: &str, tag: &str) -> Self {
        Self {
            handle: ElementHandle(handle.to_string()),
            parent: None,
            tag: tag.to_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            rect: steadyweb_core_types::Rect::new(0.0, 0.0, 100.0, 20.0),
            visible: true,
            enabled: true,
            z_index: 0,
            value: String::new(),
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(ElementHandle(parent.to_string()));
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = steadyweb_core_types::Rect::new(x, y, width, height);
        self
    }

    pub fn with_z(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            tag: self.tag.clone(),
            id: self.id.clone(),
            classes: self.classes.clone(),
            attributes: self.attributes.clone(),
            text: self.text.clone(),
            rect: self.rect,
            visible: self.visible,
            enabled: self.enabled,
        }
    }
}

/// Scheduled page change applied once the tokio clock reaches its deadline.
#[derive(Clone, Debug)]
pub enum Mutation {
    Insert(MemoryNode),
    Remove(ElementHandle),
    Show(ElementHandle),
    Hide(ElementHandle),
    SetAttribute {
        handle: ElementHandle,
        name: String,
        value: String,
    },
    SetUrl(String),
    SetPendingRequests(u32),
}

#[derive(Default)]
struct PageState {
    nodes: Vec<MemoryNode>,
    url: String,
    loading_until: Option<Instant>,
    pending_requests: u32,
    scheduled: Vec<(Instant, Mutation)>,
    query_count: u64,
    clicks: Vec<(ElementHandle, ClickMethod)>,
    events: Vec<String>,
    native_click_blocked: Vec<ElementHandle>,
    reloads: u32,
    scroll_to_top_calls: u32,
}

/// In-memory implementation of [`PagePort`] and [`TargetDirectory`].
pub struct MemoryPage {
    target: TargetId,
    load_delay: Duration,
    state: Mutex<PageState>,
}

impl MemoryPage {
    pub fn new(url: &str) -> Self {
        let state = PageState {
            url: url.to_string(),
            ..Default::default()
        };
        Self {
            target: TargetId::new(),
            load_delay: Duration::ZERO,
            state: Mutex::new(state),
        }
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn target_id(&self) -> TargetId {
        self.target.clone()
    }

    /// Add a node to the tree immediately.
    pub fn insert(&self, node: MemoryNode) -> ElementHandle {
        let handle = node.handle.clone();
        self.state.lock().unwrap().nodes.push(node);
        handle
    }

    /// Apply a mutation once `delay` has elapsed on the tokio clock.
    pub fn schedule(&self, delay: Duration, mutation: Mutation) {
        let at = Instant::now() + delay;
        self.state.lock().unwrap().scheduled.push((at, mutation));
    }

    /// Make native clicks on this element fail, forcing pointer fallback.
    pub fn block_native_click(&self, handle: &ElementHandle) {
        self.state
            .lock()
            .unwrap()
            .native_click_blocked
            .push(handle.clone());
    }

    pub fn query_count(&self) -> u64 {
        self.state.lock().unwrap().query_count
    }

    pub fn clicks(&self) -> Vec<(ElementHandle, ClickMethod)> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn reload_count(&self) -> u32 {
        self.state.lock().unwrap().reloads
    }

    pub fn scroll_to_top_count(&self) -> u32 {
        self.state.lock().unwrap().scroll_to_top_calls
    }

    pub fn value_of(&self, handle: &ElementHandle) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .iter()
            .find(|n| &n.handle == handle)
            .map(|n| n.value.clone())
    }

    pub fn set_pending_requests(&self, count: u32) {
        self.state.lock().unwrap().pending_requests = count;
    }

    fn check_target(&self, target: &TargetId) -> Result<(), AutomationError> {
        if target == &self.target {
            Ok(())
        } else {
            Err(AutomationError::Boundary(format!(
                "unknown target: {target}"
            )))
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, PageState> {
        let mut state = self.state.lock().unwrap();
        apply_due(&mut state);
        state
    }
}

fn apply_due(state: &mut PageState) {
    let now = Instant::now();
    let mut due: Vec<(Instant, Mutation)> = Vec::new();
    state.scheduled.retain(|(at, mutation)| {
        if *at <= now {
            due.push((*at, mutation.clone()));
            false
        } else {
            true
        }
    });
    due.sort_by_key(|(at, _)| *at);

    for (_, mutation) in due {
        match mutation {
            Mutation::Insert(node) => state.nodes.push(node),
            Mutation::Remove(handle) => state.nodes.retain(|n| n.handle != handle),
            Mutation::Show(handle) => {
                if let Some(node) = state.nodes.iter_mut().find(|n| n.handle == handle) {
                    node.visible = true;
                }
            }
            Mutation::Hide(handle) => {
                if let Some(node) = state.nodes.iter_mut().find(|n| n.handle == handle) {
                    node.visible = false;
                }
            }
            Mutation::SetAttribute {
                handle,
                name,
                value,
            } => {
                if let Some(node) = state.nodes.iter_mut().find(|n| n.handle == handle) {
                    node.attributes.insert(name, value);
                }
            }
            Mutation::SetUrl(url) => state.url = url,
            Mutation::SetPendingRequests(count) => state.pending_requests = count,
        }
    }
}

/// Parsed simple compound selector: `tag#id.class[attr="value"]`.
#[derive(Default)]
struct CssSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_css(selector: &str) -> Result<CssSelector, AutomationError> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(AutomationError::InvalidSelectorSyntax(
            "empty selector".to_string(),
        ));
    }

    let malformed =
        || AutomationError::InvalidSelectorSyntax(format!("malformed selector: {selector}"));

    let mut parsed = CssSelector::default();
    let chars: Vec<char> = selector.chars().collect();
    let mut i = 0;

    let read_ident = |chars: &[char], start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_char(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    // Optional leading tag name.
    if i < chars.len() && chars[i].is_ascii_alphabetic() {
        let (tag, next) = read_ident(&chars, i);
        parsed.tag = Some(tag.to_lowercase());
        i = next;
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                let (id, next) = read_ident(&chars, i + 1);
                if id.is_empty() {
                    return Err(malformed());
                }
                parsed.id = Some(id);
                i = next;
            }
            '.' => {
                let (class, next) = read_ident(&chars, i + 1);
                if class.is_empty() {
                    return Err(malformed());
                }
                parsed.classes.push(class);
                i = next;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(malformed)?
                    + i;
                let body: String = chars[i + 1..close].iter().collect();
                if body.is_empty() {
                    return Err(malformed());
                }
                match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim_matches(|c| c == '"' || c == '\'');
                        parsed
                            .attrs
                            .push((name.trim().to_string(), Some(value.to_string())));
                    }
                    None => parsed.attrs.push((body.trim().to_string(), None)),
                }
                i = close + 1;
            }
            _ => return Err(malformed()),
        }
    }

    Ok(parsed)
}

fn css_matches(node: &MemoryNode, selector: &CssSelector) -> bool {
    if let Some(tag) = &selector.tag {
        if &node.tag != tag {
            return false;
        }
    }
    if let Some(id) = &selector.id {
        if node.id.as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    for class in &selector.classes {
        if !node.classes.iter().any(|c| c == class) {
            return false;
        }
    }
    for (name, expected) in &selector.attrs {
        let actual = match name.as_str() {
            "id" => node.id.as_deref(),
            _ => node.attributes.get(name).map(|v| v.as_str()),
        };
        match (actual, expected) {
            (None, _) => return false,
            (Some(_), None) => {}
            (Some(actual), Some(expected)) => {
                if actual != expected {
                    return false;
                }
            }
        }
    }
    true
}

impl MemoryPage {
    fn is_under(state: &PageState, node: &MemoryNode, root: &ElementHandle) -> bool {
        let mut current = node.parent.clone();
        while let Some(parent) = current {
            if &parent == root {
                return true;
            }
            current = state
                .nodes
                .iter()
                .find(|n| n.handle == parent)
                .and_then(|n| n.parent.clone());
        }
        false
    }

    fn scoped_indices(state: &PageState, root: Option<&ElementHandle>) -> Vec<usize> {
        (0..state.nodes.len())
            .filter(|&i| match root {
                Some(root) => Self::is_under(state, &state.nodes[i], root),
                None => true,
            })
            .collect()
    }

    fn eval_query(
        state: &PageState,
        query: &SelectorQuery,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        let scope = Self::scoped_indices(state, root);
        let handles = |indices: Vec<usize>| -> Vec<ElementHandle> {
            indices
                .into_iter()
                .map(|i| state.nodes[i].handle.clone())
                .collect()
        };

        match query {
            SelectorQuery::Css(selector) => {
                let parsed = parse_css(selector)?;
                Ok(handles(
                    scope
                        .into_iter()
                        .filter(|&i| css_matches(&state.nodes[i], &parsed))
                        .collect(),
                ))
            }
            SelectorQuery::XPath(expr) => Ok(handles(Self::eval_xpath(state, expr, &scope)?)),
            SelectorQuery::TextContains(substr) => Ok(handles(
                scope
                    .into_iter()
                    .filter(|&i| !substr.is_empty() && state.nodes[i].text.contains(substr))
                    .collect(),
            )),
            SelectorQuery::Attribute { name, value } => Ok(handles(
                scope
                    .into_iter()
                    .filter(|&i| {
                        let node = &state.nodes[i];
                        let actual = match name.as_str() {
                            "id" => node.id.as_deref(),
                            _ => node.attributes.get(name).map(|v| v.as_str()),
                        };
                        actual == Some(value.as_str())
                    })
                    .collect(),
            )),
            SelectorQuery::Tag(tag) => {
                let tag = tag.to_lowercase();
                Ok(handles(
                    scope
                        .into_iter()
                        .filter(|&i| state.nodes[i].tag == tag)
                        .collect(),
                ))
            }
        }
    }

    /// Minimal XPath support: `//tag`, `//*[@attr='v']`, `//tag[@attr='v']`,
    /// `//tag[n]`, `//tag[contains(@class,'v')]` and absolute structural
    /// paths like `/div[2]/button[1]`.
    fn eval_xpath(
        state: &PageState,
        expr: &str,
        scope: &[usize],
    ) -> Result<Vec<usize>, AutomationError> {
        let malformed =
            || AutomationError::InvalidSelectorSyntax(format!("malformed xpath: {expr}"));

        if let Some(rest) = expr.strip_prefix("//") {
            let (name, predicate) = match rest.find('[') {
                Some(open) => {
                    if !rest.ends_with(']') {
                        return Err(malformed());
                    }
                    (&rest[..open], Some(&rest[open + 1..rest.len() - 1]))
                }
                None => (rest, None),
            };
            if name.is_empty() {
                return Err(malformed());
            }

            let mut matched: Vec<usize> = scope
                .iter()
                .copied()
                .filter(|&i| name == "*" || state.nodes[i].tag == name.to_lowercase())
                .collect();

            if let Some(predicate) = predicate {
                if let Ok(nth) = predicate.parse::<usize>() {
                    // XPath positions are 1-based.
                    matched = match nth.checked_sub(1).and_then(|n| matched.get(n)) {
                        Some(&i) => vec![i],
                        None => Vec::new(),
                    };
                } else if let Some(rest) = predicate.strip_prefix("contains(@class,") {
                    let class = rest
                        .strip_suffix(')')
                        .map(|v| v.trim_matches(|c| c == '"' || c == '\''))
                        .ok_or_else(malformed)?;
                    matched.retain(|&i| state.nodes[i].classes.iter().any(|c| c == class));
                } else if let Some(rest) = predicate.strip_prefix('@') {
                    let (attr, value) = rest.split_once('=').ok_or_else(malformed)?;
                    let value = value.trim_matches(|c| c == '"' || c == '\'');
                    matched.retain(|&i| {
                        let node = &state.nodes[i];
                        let actual = match attr {
                            "id" => node.id.as_deref(),
                            _ => node.attributes.get(attr).map(|v| v.as_str()),
                        };
                        actual == Some(value)
                    });
                } else {
                    return Err(malformed());
                }
            }

            return Ok(matched);
        }

        if expr.starts_with('/') {
            let segments: Vec<&str> = expr.split('/').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                return Err(malformed());
            }

            let mut current: Vec<usize> = scope
                .iter()
                .copied()
                .filter(|&i| state.nodes[i].parent.is_none())
                .collect();

            for (depth, segment) in segments.iter().enumerate() {
                let (tag, nth) = match segment.find('[') {
                    Some(open) => {
                        let nth: usize = segment[open + 1..]
                            .strip_suffix(']')
                            .and_then(|n| n.parse().ok())
                            .ok_or_else(malformed)?;
                        (&segment[..open], Some(nth))
                    }
                    None => (*segment, None),
                };

                let mut level: Vec<usize> = current
                    .iter()
                    .copied()
                    .filter(|&i| state.nodes[i].tag == tag.to_lowercase())
                    .collect();
                if let Some(nth) = nth {
                    level = match nth.checked_sub(1).and_then(|n| level.get(n)) {
                        Some(&i) => vec![i],
                        None => Vec::new(),
                    };
                }

                if depth + 1 == segments.len() {
                    current = level;
                } else {
                    let parents: Vec<&ElementHandle> =
                        level.iter().map(|&i| &state.nodes[i].handle).collect();
                    current = (0..state.nodes.len())
                        .filter(|&i| {
                            state.nodes[i]
                                .parent
                                .as_ref()
                                .map(|p| parents.contains(&p))
                                .unwrap_or(false)
                        })
                        .collect();
                }
            }

            return Ok(current);
        }

        Err(malformed())
    }
}

#[async_trait]
impl PagePort for MemoryPage {
    async fn query(
        &self,
        target: &TargetId,
        query: &SelectorQuery,
        root: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        self.check_target(target)?;
        let mut state = self.locked();
        state.query_count += 1;
        Self::eval_query(&state, query, root)
    }

    async fn snapshot(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<ElementSnapshot, AutomationError> {
        self.check_target(target)?;
        let state = self.locked();
        state
            .nodes
            .iter()
            .find(|n| &n.handle == handle)
            .map(|n| n.snapshot())
            .ok_or_else(|| AutomationError::ElementNotFound(handle.to_string()))
    }

    async fn element_at(
        &self,
        target: &TargetId,
        point: Point,
    ) -> Result<Option<ElementHandle>, AutomationError> {
        self.check_target(target)?;
        let state = self.locked();
        let hit = state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.visible && n.rect.contains(point))
            .max_by_key(|(i, n)| (n.z_index, *i))
            .map(|(_, n)| n.handle.clone());
        Ok(hit)
    }

    async fn is_descendant(
        &self,
        target: &TargetId,
        node: &ElementHandle,
        ancestor: &ElementHandle,
    ) -> Result<bool, AutomationError> {
        self.check_target(target)?;
        let state = self.locked();
        let found = state
            .nodes
            .iter()
            .find(|n| &n.handle == node)
            .map(|n| Self::is_under(&state, n, ancestor))
            .unwrap_or(false);
        Ok(found)
    }

    async fn click(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
        method: ClickMethod,
    ) -> Result<(), AutomationError> {
        self.check_target(target)?;
        let mut state = self.locked();
        match method {
            ClickMethod::Native => {
                let node = state
                    .nodes
                    .iter()
                    .find(|n| &n.handle == handle)
                    .ok_or_else(|| AutomationError::ElementNotFound(handle.to_string()))?;
                if !node.enabled {
                    return Err(AutomationError::ElementNotClickable(handle.to_string()));
                }
                if state.native_click_blocked.contains(handle) {
                    return Err(AutomationError::ElementNotClickable(handle.to_string()));
                }
                state.clicks.push((handle.clone(), method));
            }
            ClickMethod::Pointer(point) => {
                // The pointer event lands on whatever is rendered at the
                // point, exactly like a real dispatched event.
                let hit = state
                    .nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.visible && n.rect.contains(point))
                    .max_by_key(|(i, n)| (n.z_index, *i))
                    .map(|(_, n)| n.handle.clone());
                match hit {
                    Some(hit) => state.clicks.push((hit, method)),
                    None => {
                        return Err(AutomationError::ElementNotClickable(format!(
                            "nothing rendered at ({}, {})",
                            point.x, point.y
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    async fn scroll_to_top(&self, target: &TargetId) -> Result<(), AutomationError> {
        self.check_target(target)?;
        self.locked().scroll_to_top_calls += 1;
        Ok(())
    }

    async fn scroll_into_view(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<(), AutomationError> {
        self.check_target(target)?;
        let mut state = self.locked();
        let event = format!("scroll-into-view@{handle}");
        state.events.push(event);
        Ok(())
    }

    async fn set_value(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<(), AutomationError> {
        self.check_target(target)?;
        let mut state = self.locked();
        let node = state
            .nodes
            .iter_mut()
            .find(|n| &n.handle == handle)
            .ok_or_else(|| AutomationError::ElementNotFound(handle.to_string()))?;
        node.value = value.to_string();
        Ok(())
    }

    async fn dispatch_edit_events(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<(), AutomationError> {
        self.check_target(target)?;
        let mut state = self.locked();
        state.events.push(format!("input@{handle}"));
        state.events.push(format!("change@{handle}"));
        Ok(())
    }

    async fn xpath_of(
        &self,
        target: &TargetId,
        handle: &ElementHandle,
    ) -> Result<String, AutomationError> {
        self.check_target(target)?;
        let state = self.locked();
        let node = state
            .nodes
            .iter()
            .find(|n| &n.handle == handle)
            .ok_or_else(|| AutomationError::ElementNotFound(handle.to_string()))?;

        if let Some(id) = &node.id {
            return Ok(format!("//*[@id='{id}']"));
        }

        // Structural path: tag[position-among-same-tag-siblings], root first.
        let mut segments = Vec::new();
        let mut current = Some(node.handle.clone());
        while let Some(handle) = current {
            let node = state
                .nodes
                .iter()
                .find(|n| n.handle == handle)
                .ok_or_else(|| AutomationError::ElementNotFound(handle.to_string()))?;
            let position = state
                .nodes
                .iter()
                .filter(|n| n.parent == node.parent && n.tag == node.tag)
                .position(|n| n.handle == node.handle)
                .unwrap_or(0)
                + 1;
            segments.push(format!("{}[{}]", node.tag, position));
            current = node.parent.clone();
        }
        segments.reverse();
        Ok(format!("/{}", segments.join("/")))
    }

    async fn current_url(&self, target: &TargetId) -> Result<String, AutomationError> {
        self.check_target(target)?;
        Ok(self.locked().url.clone())
    }

    async fn pending_requests(&self, target: &TargetId) -> Result<u32, AutomationError> {
        self.check_target(target)?;
        Ok(self.locked().pending_requests)
    }
}

#[async_trait]
impl TargetDirectory for MemoryPage {
    async fn active_target(&self) -> Result<TargetId, AutomationError> {
        Ok(self.target.clone())
    }

    async fn target(&self, id: &TargetId) -> Result<TargetInfo, AutomationError> {
        self.check_target(id)?;
        let state = self.locked();
        let loading = state
            .loading_until
            .map(|until| Instant::now() < until)
            .unwrap_or(false);
        Ok(TargetInfo {
            id: self.target.clone(),
            url: state.url.clone(),
            loading,
        })
    }

    async fn wait_for_load(
        &self,
        id: &TargetId,
        timeout: Duration,
    ) -> Result<(), AutomationError> {
        self.check_target(id)?;
        let deadline = Instant::now() + timeout;
        loop {
            let loading = {
                let state = self.locked();
                state
                    .loading_until
                    .map(|until| Instant::now() < until)
                    .unwrap_or(false)
            };
            if !loading {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::NavigationTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                    message: "load did not complete".to_string(),
                });
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    async fn navigate(&self, id: &TargetId, url: &str) -> Result<(), AutomationError> {
        self.check_target(id)?;
        let mut state = self.locked();
        state.url = url.to_string();
        state.loading_until = Some(Instant::now() + self.load_delay);
        Ok(())
    }

    async fn reload(&self, id: &TargetId) -> Result<(), AutomationError> {
        self.check_target(id)?;
        let mut state = self.locked();
        state.reloads += 1;
        state.loading_until = Some(Instant::now() + self.load_delay);
        Ok(())
    }
}
