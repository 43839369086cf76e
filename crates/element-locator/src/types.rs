//! Core types for the locator system

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use steadyweb_core_types::AutomationError;

/// Selector strategy enumeration
///
/// The five ways the resolver can locate elements:
/// - Css: direct structural query
/// - XPath: path query, element results only
/// - Text: text-node substring scan
/// - Attribute: exact match on one named attribute
/// - Index: the nth match of a tag/selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorStrategy {
    Css,
    XPath,
    Text,
    Attribute,
    Index,
}

impl SelectorStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            SelectorStrategy::Css => "css",
            SelectorStrategy::XPath => "xpath",
            SelectorStrategy::Text => "text",
            SelectorStrategy::Attribute => "attribute",
            SelectorStrategy::Index => "index",
        }
    }
}

impl FromStr for SelectorStrategy {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "css" => Ok(SelectorStrategy::Css),
            "xpath" => Ok(SelectorStrategy::XPath),
            "text" => Ok(SelectorStrategy::Text),
            "attribute" => Ok(SelectorStrategy::Attribute),
            "index" => Ok(SelectorStrategy::Index),
            other => Err(AutomationError::UnsupportedSelectorStrategy(
                other.to_string(),
            )),
        }
    }
}

/// Immutable description of how to locate elements, constructed per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorDescriptor {
    pub strategy: SelectorStrategy,
    pub value: String,

    /// Attribute name; required by the attribute strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// 0-based match index; used by the index strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl SelectorDescriptor {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            strategy: SelectorStrategy::Css,
            value: value.into(),
            attribute: None,
            index: None,
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            strategy: SelectorStrategy::XPath,
            value: value.into(),
            attribute: None,
            index: None,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            strategy: SelectorStrategy::Text,
            value: value.into(),
            attribute: None,
            index: None,
        }
    }

    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            strategy: SelectorStrategy::Attribute,
            value: value.into(),
            attribute: Some(name.into()),
            index: None,
        }
    }

    pub fn index(selector: impl Into<String>, index: usize) -> Self {
        Self {
            strategy: SelectorStrategy::Index,
            value: selector.into(),
            attribute: None,
            index: Some(index),
        }
    }

    /// Build a descriptor from an untyped strategy string.
    ///
    /// Unrecognized strategy strings fail with `UnsupportedSelectorStrategy`.
    pub fn parse(strategy: &str, value: impl Into<String>) -> Result<Self, AutomationError> {
        Ok(Self {
            strategy: strategy.parse()?,
            value: value.into(),
            attribute: None,
            index: None,
        })
    }

    /// Canonical value for cache keying, folding in the strategy extras.
    pub fn cache_value(&self) -> String {
        let mut value = self.value.clone();
        if let Some(attribute) = &self.attribute {
            value = format!("{attribute}={value}");
        }
        if let Some(index) = self.index {
            value = format!("{value}@{index}");
        }
        value
    }
}

impl fmt::Display for SelectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strategy.name(), self.cache_value())
    }
}

/// Where a generated re-find candidate came from, most robust first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    UniqueId,
    ClassCombination,
    TestAttribute,
    NameAttribute,
    StructuralXPath,
    TextContent,
}

impl CandidateSource {
    pub fn name(&self) -> &'static str {
        match self {
            CandidateSource::UniqueId => "unique-id",
            CandidateSource::ClassCombination => "class-combination",
            CandidateSource::TestAttribute => "test-attribute",
            CandidateSource::NameAttribute => "name-attribute",
            CandidateSource::StructuralXPath => "structural-xpath",
            CandidateSource::TextContent => "text-content",
        }
    }
}

/// A ranked descriptor usable to re-find an element later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub descriptor: SelectorDescriptor,

    /// Resolution robustness score (0.0-1.0), higher is more robust.
    pub confidence: f64,

    pub source: CandidateSource,
}

impl Candidate {
    pub fn new(descriptor: SelectorDescriptor, confidence: f64, source: CandidateSource) -> Self {
        Self {
            descriptor,
            confidence,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steadyweb_core_types::ErrorKind;

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "css".parse::<SelectorStrategy>().unwrap(),
            SelectorStrategy::Css
        );
        assert_eq!(
            "attribute".parse::<SelectorStrategy>().unwrap(),
            SelectorStrategy::Attribute
        );
    }

    #[test]
    fn test_unsupported_strategy_strings() {
        for bad in ["cssx", "CSS", "querySelector", "", "aria"] {
            let err = SelectorDescriptor::parse(bad, "#x").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedSelectorStrategy);
        }
    }

    #[test]
    fn test_cache_value_folds_extras() {
        assert_eq!(SelectorDescriptor::css("#submit").cache_value(), "#submit");
        assert_eq!(
            SelectorDescriptor::attribute("name", "email").cache_value(),
            "name=email"
        );
        assert_eq!(
            SelectorDescriptor::index("button", 2).cache_value(),
            "button@2"
        );
    }
}
