//! Wait specifications and condition vocabulary

use std::time::Duration;

use element_locator::SelectorDescriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use steadyweb_core_types::{AutomationError, ElementHandle};

/// Default polling timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Navigation waits get a longer default timeout.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameters governing exactly one polling loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaitSpec {
    pub timeout: Duration,
    pub interval: Duration,

    /// When false, timeout resolves to [`WaitOutcome::TimedOut`] instead of
    /// raising an error.
    pub fail_on_timeout: bool,

    /// Overrides the generated timeout message.
    pub message: Option<String>,
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            fail_on_timeout: true,
            message: None,
        }
    }
}

impl WaitSpec {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Defaults suited to a navigation wait.
    pub fn navigation() -> Self {
        Self {
            timeout: NAVIGATION_TIMEOUT,
            ..Default::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Resolve to a sentinel on timeout instead of raising.
    pub fn soft(mut self) -> Self {
        self.fail_on_timeout = false;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// How a navigation's destination address is matched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum UrlMatch {
    Exact(String),
    Contains(String),
    /// Regular expression over the full address.
    Pattern(String),
}

impl UrlMatch {
    pub fn matches(&self, url: &str) -> Result<bool, AutomationError> {
        match self {
            UrlMatch::Exact(expected) => Ok(url == expected),
            UrlMatch::Contains(fragment) => Ok(url.contains(fragment)),
            UrlMatch::Pattern(pattern) => {
                let regex = Regex::new(pattern).map_err(|e| {
                    AutomationError::Boundary(format!("invalid url pattern '{pattern}': {e}"))
                })?;
                Ok(regex.is_match(url))
            }
        }
    }
}

/// The fixed vocabulary of polled conditions.
///
/// Conditions cross the execution boundary as data; custom logic is looked
/// up by registered name, never shipped as code.
#[derive(Clone, Debug)]
pub enum WaitCondition {
    /// At least one element matches.
    Presence(SelectorDescriptor),

    /// At least one match is rendered visible.
    Visible(SelectorDescriptor),

    /// No match, or every match is hidden.
    Hidden(SelectorDescriptor),

    /// A match is visible, enabled, and wins the hit-test at its center.
    Clickable(SelectorDescriptor),

    /// Address changed from its value at wait start and, when a matcher is
    /// given, matches it; then the target reports load-complete.
    Navigation { matcher: Option<UrlMatch> },

    /// Caller predicate registered on the engine under this name.
    Custom(String),

    /// Unconditional pause; never times out.
    Delay(Duration),

    /// No automation-observable request in flight.
    NetworkQuiescent,
}

impl WaitCondition {
    pub fn describe(&self) -> String {
        match self {
            WaitCondition::Presence(d) => format!("presence of {d}"),
            WaitCondition::Visible(d) => format!("visibility of {d}"),
            WaitCondition::Hidden(d) => format!("absence of {d}"),
            WaitCondition::Clickable(d) => format!("clickability of {d}"),
            WaitCondition::Navigation { .. } => "navigation".to_string(),
            WaitCondition::Custom(name) => format!("custom condition '{name}'"),
            WaitCondition::Delay(d) => format!("fixed delay of {}ms", d.as_millis()),
            WaitCondition::NetworkQuiescent => "network quiescence".to_string(),
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, WaitCondition::Navigation { .. })
    }
}

/// Terminal state of one polling loop.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitOutcome {
    /// Condition held; carries the observed element when one exists.
    Satisfied(Option<ElementHandle>),

    /// Sentinel for a soft timeout (`fail_on_timeout = false`).
    TimedOut,
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied(_))
    }

    pub fn element(&self) -> Option<&ElementHandle> {
        match self {
            WaitOutcome::Satisfied(handle) => handle.as_ref(),
            WaitOutcome::TimedOut => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_match() {
        assert!(UrlMatch::Exact("https://a.test/done".to_string())
            .matches("https://a.test/done")
            .unwrap());
        assert!(UrlMatch::Contains("/done".to_string())
            .matches("https://a.test/done?x=1")
            .unwrap());
        assert!(UrlMatch::Pattern(r"/orders/\d+$".to_string())
            .matches("https://a.test/orders/42")
            .unwrap());
        assert!(UrlMatch::Pattern("[invalid".to_string())
            .matches("anything")
            .is_err());
    }

    #[test]
    fn test_spec_defaults() {
        let spec = WaitSpec::default();
        assert_eq!(spec.timeout, Duration::from_secs(10));
        assert_eq!(spec.interval, Duration::from_millis(100));
        assert!(spec.fail_on_timeout);

        assert_eq!(WaitSpec::navigation().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_outcome_helpers() {
        let satisfied = WaitOutcome::Satisfied(Some(ElementHandle("a".to_string())));
        assert!(satisfied.is_satisfied());
        assert_eq!(satisfied.element(), Some(&ElementHandle("a".to_string())));
        assert!(!WaitOutcome::TimedOut.is_satisfied());
    }
}
