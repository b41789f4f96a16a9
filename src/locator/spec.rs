//! Ordered fallback lists of candidates and their resolution results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::ElementId;

use super::by::By;

// ============================================================================
// LocatorSpec
// ============================================================================

/// Ordered, non-empty list of query candidates.
///
/// Order encodes priority: the first candidate with at least one match
/// wins, later candidates are never consulted once one has matched.
///
/// # Example
///
/// ```ignore
/// let email = LocatorSpec::new(By::id("email"))
///     .or(By::name("email"))
///     .or(By::attr("type", "email"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<By>", into = "Vec<By>")]
pub struct LocatorSpec {
    candidates: Vec<By>,
}

impl LocatorSpec {
    /// Creates a spec with a single candidate.
    #[must_use]
    pub fn new(first: By) -> Self {
        Self {
            candidates: vec![first],
        }
    }

    /// Appends a lower-priority fallback candidate.
    #[must_use]
    pub fn or(mut self, candidate: By) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Creates a spec from an ordered list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the list is empty.
    pub fn from_candidates(candidates: impl IntoIterator<Item = By>) -> Result<Self> {
        let candidates: Vec<By> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(Error::invalid_argument(
                "a locator needs at least one candidate",
            ));
        }
        Ok(Self { candidates })
    }

    /// Returns the candidates in priority order.
    #[inline]
    #[must_use]
    pub fn candidates(&self) -> &[By] {
        &self.candidates
    }

    /// Returns the number of candidates (always at least one).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl From<By> for LocatorSpec {
    fn from(by: By) -> Self {
        Self::new(by)
    }
}

impl TryFrom<Vec<By>> for LocatorSpec {
    type Error = Error;

    fn try_from(candidates: Vec<By>) -> Result<Self> {
        Self::from_candidates(candidates)
    }
}

impl From<LocatorSpec> for Vec<By> {
    fn from(spec: LocatorSpec) -> Self {
        spec.candidates
    }
}

impl fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, by) in self.candidates.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{by}")?;
        }
        Ok(())
    }
}

// ============================================================================
// ResolvedElement
// ============================================================================

/// A live element together with the candidate that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    /// Driver reference to the element.
    pub element: ElementId,
    /// Index of the winning candidate in its spec.
    pub candidate_index: usize,
    /// The winning candidate.
    pub by: By,
}

impl ResolvedElement {
    /// Wraps an element reference that was obtained without a spec.
    #[must_use]
    pub fn direct(element: ElementId, by: By) -> Self {
        Self {
            element,
            candidate_index: 0,
            by,
        }
    }

    /// Returns the element reference.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ElementId {
        &self.element
    }
}

impl AsRef<ElementId> for ResolvedElement {
    fn as_ref(&self) -> &ElementId {
        &self.element
    }
}

impl fmt::Display for ResolvedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{} {})", self.element, self.candidate_index, self.by)
    }
}

// ============================================================================
// ResolvedAll
// ============================================================================

/// Every match of the first satisfiable candidate, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAll {
    /// Matches in document order (never empty).
    pub elements: Vec<ElementId>,
    /// Index of the winning candidate in its spec.
    pub candidate_index: usize,
    /// The winning candidate.
    pub by: By,
}

impl ResolvedAll {
    /// Returns the number of matches.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if there are no matches.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Splits the set into individually resolved elements.
    pub fn iter(&self) -> impl Iterator<Item = ResolvedElement> + '_ {
        self.elements.iter().map(|element| ResolvedElement {
            element: element.clone(),
            candidate_index: self.candidate_index,
            by: self.by.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let spec = LocatorSpec::new(By::id("email"))
            .or(By::name("email"))
            .or(By::attr("type", "email"));
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.candidates()[2], By::attr("type", "email"));
    }

    #[test]
    fn test_empty_spec_rejected() {
        let err = LocatorSpec::from_candidates(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_display_joins_candidates() {
        let spec = LocatorSpec::new(By::id("a")).or(By::css(".b"));
        assert_eq!(spec.to_string(), "id:a | css:.b");
    }

    #[test]
    fn test_deserialize_rejects_empty_list() {
        let parsed: std::result::Result<LocatorSpec, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_resolved_all_iter_carries_candidate() {
        let all = ResolvedAll {
            elements: vec![ElementId::new("a"), ElementId::new("b")],
            candidate_index: 1,
            by: By::tag("option"),
        };
        let items: Vec<_> = all.iter().collect();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|r| r.candidate_index == 1));
    }
}
