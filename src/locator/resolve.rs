//! Candidate resolution against the live document.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::ElementId;
use crate::session::Session;

use super::spec::{LocatorSpec, ResolvedAll, ResolvedElement};

// ============================================================================
// Session - Resolution
// ============================================================================

impl Session {
    /// Resolves `spec` against the whole document.
    ///
    /// Candidates are tried in declared order; the first one with any
    /// match wins and its first document-order match is returned.
    /// Absence is `Ok(None)`, never an error.
    ///
    /// A candidate the driver rejects as malformed counts as no match.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let spec = LocatorSpec::new(By::id("email"))
    ///     .or(By::name("email"))
    ///     .or(By::attr("type", "email"));
    ///
    /// match session.resolve(&spec).await? {
    ///     Some(field) => session.type_text(&field, "a@b.test").await?,
    ///     None => println!("no email field on this deployment"),
    /// }
    /// ```
    pub async fn resolve(&self, spec: &LocatorSpec) -> Result<Option<ResolvedElement>> {
        self.resolve_from(spec, None).await
    }

    /// Resolves `spec` among the descendants of `scope`.
    pub async fn resolve_within(
        &self,
        spec: &LocatorSpec,
        scope: &ResolvedElement,
    ) -> Result<Option<ResolvedElement>> {
        self.resolve_from(spec, Some(&scope.element)).await
    }

    /// Returns every match of the first satisfiable candidate.
    pub async fn resolve_all(&self, spec: &LocatorSpec) -> Result<Option<ResolvedAll>> {
        self.resolve_all_from(spec, None).await
    }

    /// Returns every match of the first satisfiable candidate below `scope`.
    pub async fn resolve_all_within(
        &self,
        spec: &LocatorSpec,
        scope: &ResolvedElement,
    ) -> Result<Option<ResolvedAll>> {
        self.resolve_all_from(spec, Some(&scope.element)).await
    }

    /// Resolves `spec`, treating absence as a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] naming the exhausted spec.
    pub async fn require(&self, spec: &LocatorSpec) -> Result<ResolvedElement> {
        match self.resolve(spec).await? {
            Some(resolved) => Ok(resolved),
            None => Err(self.not_found(spec).await),
        }
    }

    /// Resolves `spec` below `scope`, treating absence as a failure.
    pub async fn require_within(
        &self,
        spec: &LocatorSpec,
        scope: &ResolvedElement,
    ) -> Result<ResolvedElement> {
        match self.resolve_within(spec, scope).await? {
            Some(resolved) => Ok(resolved),
            None => Err(self.not_found(spec).await),
        }
    }
}

// ============================================================================
// Session - Waiting Resolution
// ============================================================================

impl Session {
    /// Waits until `spec` resolves, using the default budget.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] naming the locator.
    pub async fn await_present(&self, spec: &LocatorSpec) -> Result<ResolvedElement> {
        self.wait(format!("present({spec})"))
            .until_some(|| self.resolve(spec))
            .await
    }

    /// Waits until `spec` resolves to a displayed element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] naming the locator.
    pub async fn await_visible(&self, spec: &LocatorSpec) -> Result<ResolvedElement> {
        self.wait(format!("visible({spec})"))
            .until_some(|| async move {
                match self.resolve(spec).await? {
                    Some(resolved) if self.is_displayed(&resolved).await? => Ok(Some(resolved)),
                    _ => Ok(None),
                }
            })
            .await
    }
}

// ============================================================================
// Session - Internal
// ============================================================================

impl Session {
    async fn resolve_from(
        &self,
        spec: &LocatorSpec,
        root: Option<&ElementId>,
    ) -> Result<Option<ResolvedElement>> {
        let Some(all) = self.resolve_all_from(spec, root).await? else {
            return Ok(None);
        };
        let ResolvedAll {
            elements,
            candidate_index,
            by,
        } = all;
        Ok(elements.into_iter().next().map(|element| ResolvedElement {
            element,
            candidate_index,
            by,
        }))
    }

    async fn resolve_all_from(
        &self,
        spec: &LocatorSpec,
        root: Option<&ElementId>,
    ) -> Result<Option<ResolvedAll>> {
        for (index, by) in spec.candidates().iter().enumerate() {
            let elements = match self.driver().query(root, by).await {
                Ok(elements) => elements,
                Err(Error::InvalidArgument { message }) => {
                    warn!(candidate = index, by = %by, %message, "Candidate rejected by driver");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if !elements.is_empty() {
                debug!(
                    candidate = index,
                    by = %by,
                    matches = elements.len(),
                    "Resolved locator"
                );
                return Ok(Some(ResolvedAll {
                    elements,
                    candidate_index: index,
                    by: by.clone(),
                }));
            }
        }

        debug!(spec = %spec, "No candidate matched");
        Ok(None)
    }

    async fn not_found(&self, spec: &LocatorSpec) -> Error {
        Error::element_not_found(spec.to_string(), self.observe().await)
    }
}

// ============================================================================
// Tests
// ============================================================================
