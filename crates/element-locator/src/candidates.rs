//! Re-find candidate generation
//!
//! Produces a ranked list of descriptors that can re-locate an element after
//! the page shifts underneath the original selector. Ranking reflects
//! resolution robustness: a page-unique id beats a class combination beats a
//! test attribute, down to the text-content fallback.

use page_adapter::{PagePort, SelectorQuery};
use steadyweb_core_types::{AutomationError, ElementHandle, ElementSnapshot, TargetId};
use tracing::debug;

use crate::types::{Candidate, CandidateSource, SelectorDescriptor};

/// Attributes commonly planted for automated testing.
const TEST_ATTRIBUTES: [&str; 4] = ["data-testid", "data-test", "data-cy", "data-qa"];

const MAX_TEXT_FALLBACK_LEN: usize = 60;

/// Generate ranked re-find descriptors for `handle`.
pub async fn generate(
    port: &dyn PagePort,
    target: &TargetId,
    handle: &ElementHandle,
) -> Result<Vec<Candidate>, AutomationError> {
    let snapshot = port.snapshot(target, handle).await?;
    let mut candidates = Vec::new();

    if let Some(id) = &snapshot.id {
        let selector = format!("#{id}");
        if is_unique_match(port, target, handle, &selector).await? {
            candidates.push(Candidate::new(
                SelectorDescriptor::css(selector),
                0.95,
                CandidateSource::UniqueId,
            ));
        }
    }

    if let Some(selector) = minimal_class_selector(port, target, handle, &snapshot).await? {
        candidates.push(Candidate::new(
            SelectorDescriptor::css(selector),
            0.85,
            CandidateSource::ClassCombination,
        ));
    }

    for name in TEST_ATTRIBUTES {
        if let Some(value) = snapshot.attribute(name) {
            candidates.push(Candidate::new(
                SelectorDescriptor::css(format!("[{name}=\"{value}\"]")),
                0.8,
                CandidateSource::TestAttribute,
            ));
        }
    }

    if let Some(name) = snapshot.attribute("name") {
        candidates.push(Candidate::new(
            SelectorDescriptor::css(format!("[name=\"{name}\"]")),
            0.7,
            CandidateSource::NameAttribute,
        ));
    }

    match port.xpath_of(target, handle).await {
        Ok(xpath) => candidates.push(Candidate::new(
            SelectorDescriptor::xpath(xpath),
            0.5,
            CandidateSource::StructuralXPath,
        )),
        Err(err) => debug!("structural xpath unavailable: {err}"),
    }

    let text = snapshot.text.trim();
    if !text.is_empty() {
        let truncated: String = text.chars().take(MAX_TEXT_FALLBACK_LEN).collect();
        candidates.push(Candidate::new(
            SelectorDescriptor::text(truncated),
            0.4,
            CandidateSource::TextContent,
        ));
    }

    // Construction order already ranks by robustness; the sort keeps the
    // invariant if tiers are ever reweighted.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(candidates)
}

/// Smallest class combination (single class, then a pair) that uniquely
/// matches the element.
async fn minimal_class_selector(
    port: &dyn PagePort,
    target: &TargetId,
    handle: &ElementHandle,
    snapshot: &ElementSnapshot,
) -> Result<Option<String>, AutomationError> {
    for class in &snapshot.classes {
        let selector = format!("{}.{}", snapshot.tag, class);
        if is_unique_match(port, target, handle, &selector).await? {
            return Ok(Some(selector));
        }
    }

    for (i, first) in snapshot.classes.iter().enumerate() {
        for second in snapshot.classes.iter().skip(i + 1) {
            let selector = format!("{}.{}.{}", snapshot.tag, first, second);
            if is_unique_match(port, target, handle, &selector).await? {
                return Ok(Some(selector));
            }
        }
    }

    Ok(None)
}

async fn is_unique_match(
    port: &dyn PagePort,
    target: &TargetId,
    handle: &ElementHandle,
    selector: &str,
) -> Result<bool, AutomationError> {
    let matches = port
        .query(target, &SelectorQuery::Css(selector.to_string()), None)
        .await?;
    Ok(matches.len() == 1 && matches[0] == *handle)
}
