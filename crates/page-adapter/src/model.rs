//! Data vocabulary crossing the execution boundary

use serde::{Deserialize, Serialize};
use steadyweb_core_types::{Point, TargetId};

/// Primitive element query evaluated natively inside the boundary.
///
/// The resolver composes its strategy semantics (deduplication, indexing,
/// candidate ranking) on top of these primitives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SelectorQuery {
    /// Structural CSS query; malformed syntax is a hard error.
    Css(String),

    /// XPath query, filtered to element-type results.
    XPath(String),

    /// Text-node substring scan; yields the nearest element ancestor per
    /// matching text node, in document order.
    TextContains(String),

    /// Exact match on one named attribute value.
    Attribute { name: String, value: String },

    /// All elements with the given tag name.
    Tag(String),
}

impl SelectorQuery {
    pub fn describe(&self) -> String {
        match self {
            SelectorQuery::Css(sel) => format!("css:{sel}"),
            SelectorQuery::XPath(expr) => format!("xpath:{expr}"),
            SelectorQuery::TextContains(text) => format!("text:{text}"),
            SelectorQuery::Attribute { name, value } => format!("attr:[{name}={value}]"),
            SelectorQuery::Tag(tag) => format!("tag:{tag}"),
        }
    }
}

/// How a click is delivered to an element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClickMethod {
    /// The element's own native click capability.
    Native,

    /// A synthesized pointer event dispatched at the given page point.
    Pointer(Point),
}

/// Minimal description of one automation target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetInfo {
    pub id: TargetId,
    pub url: String,
    pub loading: bool,
}
