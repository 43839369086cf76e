//! Shared types for the SteadyWeb resilience core.
//!
//! Identifiers, element handles and snapshots, geometry, and the closed
//! error vocabulary every other crate dispatches on.

pub mod errors;

pub use errors::{AutomationError, ErrorKind};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one addressable page/tab context under automation.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a logical automation workflow.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to a live page element.
///
/// Handles are call-scoped: holding one across a navigation or a cache
/// eviction is unsupported; callers re-resolve after any page-level change.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in page coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered bounding box of an element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the box, used for hit-testing and synthetic clicks.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Observed state of one element, captured through the execution boundary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lowercase tag name.
    pub tag: String,

    /// The `id` attribute, when present.
    pub id: Option<String>,

    /// Class list in document order.
    pub classes: Vec<String>,

    /// All attributes except `id` and `class`.
    pub attributes: BTreeMap<String, String>,

    /// Collapsed visible text content.
    pub text: String,

    /// Rendered bounding box.
    pub rect: Rect,

    /// False when hidden via visibility/display/opacity.
    pub visible: bool,

    /// False when disabled.
    pub enabled: bool,
}

impl ElementSnapshot {
    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            _ => self.attributes.get(name).map(|v| v.as_str()),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Non-zero rendered size and not style-hidden.
    pub fn is_visible(&self) -> bool {
        self.visible && !self.rect.is_empty()
    }
}
