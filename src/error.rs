//! Error types for the interaction engine.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use resilient_driver::{By, LocatorSpec, Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     let spec = LocatorSpec::new(By::id("submit"));
//!     let button = session.require(&spec).await?;
//!     session.click(&button).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Policy |
//! |----------|----------|--------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] | caller bug |
//! | Element | [`Error::ElementNotFound`], [`Error::StaleElement`] | recoverable |
//! | Context | [`Error::NoSuchWindow`] | driver state |
//! | Action | [`Error::ClickIntercepted`], [`Error::InterceptedAction`] | fallback, then hard |
//! | Waiting | [`Error::Timeout`] | hard |
//! | Navigation | [`Error::NavigationAmbiguous`], [`Error::RestoreFailure`] | value / fatal |
//! | External | [`Error::Driver`], [`Error::ScriptError`], [`Error::Io`], [`Error::Json`] | propagated |
//!
//! Hard failures carry an [`Observed`] snapshot of the session (last URL and
//! number of open browsing contexts) so a failing run can be triaged as
//! flaky or broken from the message alone.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{ElementId, WindowHandle};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Observed
// ============================================================================

/// Session state captured when a failure is reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observed {
    /// Focused context URL, if it could be read.
    pub url: Option<String>,
    /// Number of open browsing contexts, if it could be read.
    pub context_count: Option<usize>,
}

impl Observed {
    /// Creates an observation with both values known.
    #[inline]
    pub fn new(url: impl Into<String>, context_count: usize) -> Self {
        Self {
            url: Some(url.into()),
            context_count: Some(context_count),
        }
    }

    /// Returns `true` if nothing was captured.
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.url.is_none() && self.context_count.is_none()
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "url={url}")?,
            None => f.write_str("url=?")?,
        }
        match self.context_count {
            Some(count) => write!(f, ", contexts={count}"),
            None => f.write_str(", contexts=?"),
        }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to an engine operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Element Errors
    // ========================================================================
    /// No candidate of a locator matched.
    ///
    /// Resolution itself reports absence as a value; this variant is only
    /// produced by the require-present wrappers.
    #[error("Element not found: {locator} ({observed})")]
    ElementNotFound {
        /// Description of the locator that was exhausted.
        locator: String,
        /// Session state at failure time.
        observed: Observed,
    },

    /// Element reference is no longer attached to the live document.
    #[error("Stale element: {element_id}")]
    StaleElement {
        /// The stale element's ID.
        element_id: ElementId,
    },

    // ========================================================================
    // Context Errors
    // ========================================================================
    /// Browsing context does not exist (or none is focused).
    #[error("No such window: {handle}")]
    NoSuchWindow {
        /// The missing handle, or a description when none is focused.
        handle: String,
    },

    // ========================================================================
    // Action Errors
    // ========================================================================
    /// Direct click dispatch was received by an overlaying element.
    ///
    /// Reported by drivers; the action dispatcher recovers from it.
    #[error("Click on {element_id} intercepted by {obstruction}")]
    ClickIntercepted {
        /// Target element.
        element_id: ElementId,
        /// Description of the element that received the click.
        obstruction: String,
    },

    /// Both direct and scripted dispatch failed.
    #[error("Action '{action}' failed on {locator}: {reason} ({observed})")]
    InterceptedAction {
        /// Action name (`click`, `type`, ...).
        action: String,
        /// Locator or element the action targeted.
        locator: String,
        /// Why the fallback failed.
        reason: String,
        /// Session state at failure time.
        observed: Observed,
    },

    /// JavaScript execution error.
    #[error("Script error: {message}")]
    ScriptError {
        /// Error message from script execution.
        message: String,
    },

    // ========================================================================
    // Waiting Errors
    // ========================================================================
    /// A wait condition did not become true within its budget.
    #[error("Timeout after {timeout_ms}ms: {operation} ({observed})")]
    Timeout {
        /// Description of the condition that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
        /// Session state at failure time.
        observed: Observed,
    },

    // ========================================================================
    // Navigation Errors
    // ========================================================================
    /// An action's navigational effect could not be classified in time.
    ///
    /// Tracking reports this as a value; this variant exists for callers
    /// that choose to treat it as a failure.
    #[error("Navigation ambiguous after {timeout_ms}ms: {action} ({observed})")]
    NavigationAmbiguous {
        /// Description of the action.
        action: String,
        /// Milliseconds waited for a signal.
        timeout_ms: u64,
        /// Session state at failure time.
        observed: Observed,
    },

    /// The session could not be returned to its pre-action baseline.
    #[error("Restore failed: {message} ({observed})")]
    RestoreFailure {
        /// Description of what did not return to baseline.
        message: String,
        /// Session state at failure time.
        observed: Observed,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Opaque failure reported by the driver.
    #[error("Driver error: {message}")]
    Driver {
        /// Error message from the driver.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(locator: impl Into<String>, observed: Observed) -> Self {
        Self::ElementNotFound {
            locator: locator.into(),
            observed,
        }
    }

    /// Creates a stale element error.
    #[inline]
    pub fn stale_element(element_id: ElementId) -> Self {
        Self::StaleElement { element_id }
    }

    /// Creates a no such window error.
    #[inline]
    pub fn no_such_window(handle: &WindowHandle) -> Self {
        Self::NoSuchWindow {
            handle: handle.to_string(),
        }
    }

    /// Creates a no such window error for a session without focus.
    #[inline]
    pub fn no_focused_window() -> Self {
        Self::NoSuchWindow {
            handle: "<no focused context>".to_string(),
        }
    }

    /// Creates a click intercepted error.
    #[inline]
    pub fn click_intercepted(element_id: ElementId, obstruction: impl Into<String>) -> Self {
        Self::ClickIntercepted {
            element_id,
            obstruction: obstruction.into(),
        }
    }

    /// Creates an intercepted action error.
    #[inline]
    pub fn intercepted_action(
        action: impl Into<String>,
        locator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InterceptedAction {
            action: action.into(),
            locator: locator.into(),
            reason: reason.into(),
            observed: Observed::default(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script_error(message: impl Into<String>) -> Self {
        Self::ScriptError {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
            observed: Observed::default(),
        }
    }

    /// Creates a navigation ambiguous error.
    #[inline]
    pub fn navigation_ambiguous(action: impl Into<String>, timeout_ms: u64) -> Self {
        Self::NavigationAmbiguous {
            action: action.into(),
            timeout_ms,
            observed: Observed::default(),
        }
    }

    /// Creates a restore failure.
    #[inline]
    pub fn restore_failure(message: impl Into<String>) -> Self {
        Self::RestoreFailure {
            message: message.into(),
            observed: Observed::default(),
        }
    }

    /// Creates an opaque driver error.
    #[inline]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Context
// ============================================================================

impl Error {
    /// Attaches session state to errors that report it.
    ///
    /// Errors that already carry a known observation keep it.
    #[must_use]
    pub fn with_observed(mut self, state: Observed) -> Self {
        if let Some(slot) = self.observed_mut()
            && slot.is_unknown()
        {
            *slot = state;
        }
        self
    }

    /// Returns the attached session state, if this variant carries one.
    #[must_use]
    pub fn observed(&self) -> Option<&Observed> {
        match self {
            Self::ElementNotFound { observed, .. }
            | Self::InterceptedAction { observed, .. }
            | Self::Timeout { observed, .. }
            | Self::NavigationAmbiguous { observed, .. }
            | Self::RestoreFailure { observed, .. } => Some(observed),
            _ => None,
        }
    }

    fn observed_mut(&mut self) -> Option<&mut Observed> {
        match self {
            Self::ElementNotFound { observed, .. }
            | Self::InterceptedAction { observed, .. }
            | Self::Timeout { observed, .. }
            | Self::NavigationAmbiguous { observed, .. }
            | Self::RestoreFailure { observed, .. } => Some(observed),
            _ => None,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is an element error.
    #[inline]
    #[must_use]
    pub fn is_element_error(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::StaleElement { .. }
        )
    }

    /// Returns `true` if a polled predicate hitting this error should
    /// simply be evaluated again.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::StaleElement { .. } | Self::Timeout { .. }
        )
    }

    /// Returns `true` if this error must fail the current test.
    #[inline]
    #[must_use]
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::InterceptedAction { .. } | Self::RestoreFailure { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::driver("session closed");
        assert_eq!(err.to_string(), "Driver error: session closed");
    }

    #[test]
    fn test_timeout_display_includes_observed_state() {
        let err = Error::timeout("visible(id=email)", 500)
            .with_observed(Observed::new("https://example.test/", 2));
        assert_eq!(
            err.to_string(),
            "Timeout after 500ms: visible(id=email) (url=https://example.test/, contexts=2)"
        );
    }

    #[test]
    fn test_unknown_observed_display() {
        let err = Error::restore_failure("back navigation stalled");
        assert_eq!(
            err.to_string(),
            "Restore failed: back navigation stalled (url=?, contexts=?)"
        );
    }

    #[test]
    fn test_with_observed_keeps_existing_state() {
        let first = Observed::new("https://a.test/", 1);
        let err = Error::timeout("x", 1)
            .with_observed(first.clone())
            .with_observed(Observed::new("https://b.test/", 3));
        assert_eq!(err.observed(), Some(&first));
    }

    #[test]
    fn test_with_observed_ignores_plain_variants() {
        let err = Error::config("bad").with_observed(Observed::new("u", 1));
        assert!(err.observed().is_none());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::timeout("x", 1).is_timeout());
        assert!(!Error::driver("x").is_timeout());
    }

    #[test]
    fn test_is_recoverable() {
        let stale = Error::stale_element(ElementId::new("e1"));
        assert!(stale.is_recoverable());
        assert!(!Error::script_error("boom").is_recoverable());
    }

    #[test]
    fn test_hard_failures() {
        assert!(Error::restore_failure("x").is_hard_failure());
        assert!(Error::intercepted_action("click", "id=x", "overlay").is_hard_failure());
        assert!(!Error::navigation_ambiguous("click", 10).is_hard_failure());
        assert!(!Error::element_not_found("id=x", Observed::default()).is_hard_failure());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
