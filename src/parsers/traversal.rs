use scraper::ElementRef;
use serde::{Deserialize, Serialize};

/// Tag every traversal step descends through
pub const CONTAINER_TAG: &str = "div";

/// One step of a match chain: an attribute name and a token its value must contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMatcher {
    /// Attribute to inspect (already lower-cased by the parser)
    pub attribute: String,

    /// Token that must appear in the whitespace-separated attribute value
    pub token: String,
}

impl AttributeMatcher {
    /// Create a matcher for `attribute` containing `token`
    pub fn new(attribute: &str, token: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            token: token.to_string(),
        }
    }

    /// Shorthand for an `id` matcher
    pub fn id(token: &str) -> Self {
        Self::new("id", token)
    }

    /// Shorthand for a `class` matcher
    pub fn class(token: &str) -> Self {
        Self::new("class", token)
    }

    /// Checks whether the element's attribute contains the token
    ///
    /// Elements without the attribute never match.
    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        element
            .value()
            .attr(&self.attribute)
            .is_some_and(|value| contains_token(value, &self.token))
    }
}

/// Ordered descent path; each matcher applies one container level deeper
pub type MatchChain = Vec<AttributeMatcher>;

/// Case-insensitive whole-token containment over a whitespace-separated list
pub fn contains_token(value: &str, token: &str) -> bool {
    value
        .split_whitespace()
        .any(|word| word.eq_ignore_ascii_case(token))
}

/// Direct child elements of `element` with the given tag name, in document order
pub fn child_elements<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

/// Narrows `root` down through `chain`, one `div` level per matcher
///
/// Never fails: a missing attribute or container simply narrows the candidate
/// set, and an empty set propagates to an empty result. Output keeps document
/// order and is not deduplicated.
pub fn traverse<'a>(root: ElementRef<'a>, chain: &[AttributeMatcher]) -> Vec<ElementRef<'a>> {
    chain.iter().fold(vec![root], |current, matcher| {
        let next: Vec<ElementRef<'a>> = current
            .into_iter()
            .flat_map(|element| child_elements(element, CONTAINER_TAG))
            .filter(|child| matcher.matches(child))
            .collect();

        ::log::trace!(
            "Matcher {}={} left {} candidates",
            matcher.attribute,
            matcher.token,
            next.len()
        );
        next
    })
}
