//! Browsing-context bookkeeping and navigation outcomes.

use std::fmt;
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::WindowHandle;
use crate::locator::ResolvedElement;

// ============================================================================
// DomainMatch
// ============================================================================

/// How an expected domain fragment is compared against a context URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMatch {
    /// The URL contains the fragment anywhere.
    #[default]
    Substring,
    /// The URL's host equals the fragment or is a subdomain of it.
    Host,
}

impl DomainMatch {
    /// Returns `true` if `url` satisfies `fragment` under this policy.
    #[must_use]
    pub fn matches(self, url: &str, fragment: &str) -> bool {
        match self {
            Self::Substring => url.contains(fragment),
            Self::Host => {
                let Some(host) = Url::parse(url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
                else {
                    return false;
                };
                let fragment = fragment.trim_matches('.').to_ascii_lowercase();
                !fragment.is_empty()
                    && (host == fragment || host.ends_with(&format!(".{fragment}")))
            }
        }
    }
}

// ============================================================================
// WindowContext
// ============================================================================

/// One browsing context as observed at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowContext {
    /// Context handle.
    pub handle: WindowHandle,
    /// URL when observed.
    pub url: String,
    /// Context that spawned this one, when known.
    pub opener: Option<WindowHandle>,
}

impl fmt::Display for WindowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.handle, self.url)
    }
}

// ============================================================================
// ContextSet
// ============================================================================

/// Every open browsing context, in driver order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSet {
    handles: Vec<WindowHandle>,
}

impl ContextSet {
    /// Creates a set from driver-ordered handles.
    #[must_use]
    pub fn new(handles: Vec<WindowHandle>) -> Self {
        Self { handles }
    }

    /// Returns the number of open contexts.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no context is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns `true` if `handle` is open.
    #[must_use]
    pub fn contains(&self, handle: &WindowHandle) -> bool {
        self.handles.contains(handle)
    }

    /// Returns the handles in driver order.
    #[inline]
    #[must_use]
    pub fn handles(&self) -> &[WindowHandle] {
        &self.handles
    }

    /// Returns handles in `self` that are not in `baseline`, in order.
    #[must_use]
    pub fn added_since(&self, baseline: &ContextSet) -> Vec<WindowHandle> {
        let known: FxHashSet<&WindowHandle> = baseline.handles.iter().collect();
        self.handles
            .iter()
            .filter(|h| !known.contains(h))
            .cloned()
            .collect()
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Navigational effect of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The focused context navigated; no context was added.
    SameContext,
    /// The set of contexts grew.
    NewContext,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameContext => f.write_str("same-context"),
            Self::NewContext => f.write_str("new-context"),
        }
    }
}

// ============================================================================
// NavigationEvent
// ============================================================================

/// Classified outcome of an action, plus what is needed to undo it.
#[derive(Debug, Clone)]
pub struct NavigationEvent {
    /// Element the action targeted, if any.
    pub trigger: Option<ResolvedElement>,
    /// Focused context before the action.
    pub origin: WindowContext,
    /// Contexts open before the action.
    pub before: ContextSet,
    /// Contexts open when the signal was observed.
    pub after: ContextSet,
    /// Derived from `after.len()` versus `before.len()` only.
    pub classification: Classification,
    /// Focused context after classification: the new context for
    /// [`Classification::NewContext`], the navigated origin otherwise.
    pub current: WindowContext,
}

impl NavigationEvent {
    /// Returns the URL of the context the caller should assert against.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.current.url
    }

    /// Returns `true` if a new context was opened.
    #[inline]
    #[must_use]
    pub fn opened_new_context(&self) -> bool {
        self.classification == Classification::NewContext
    }

    /// Returns `true` if the current URL satisfies `fragment`.
    #[must_use]
    pub fn matches_domain(&self, fragment: &str, policy: DomainMatch) -> bool {
        policy.matches(&self.current.url, fragment)
    }

    /// Describes the action for logs and errors.
    pub(crate) fn action(&self) -> String {
        describe_action(self.trigger.as_ref())
    }
}

// ============================================================================
// NavigationOutcome
// ============================================================================

/// Result of classifying an action.
///
/// `Ambiguous` is a value: an action with no navigational effect (a
/// disabled link, say) is a valid, assertable outcome.
#[derive(Debug, Clone)]
pub enum NavigationOutcome {
    /// A signal was observed and classified.
    Navigated(NavigationEvent),
    /// Neither a new context nor a URL change appeared within budget.
    Ambiguous {
        /// Element the action targeted, if any.
        trigger: Option<ResolvedElement>,
        /// Focused context before the action.
        origin: WindowContext,
        /// Contexts open before the action.
        before: ContextSet,
        /// Signal budget that elapsed.
        waited: Duration,
    },
}

impl NavigationOutcome {
    /// Returns `true` if the action had no observable navigational effect.
    #[inline]
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }

    /// Returns the event, if one was classified.
    #[must_use]
    pub fn event(&self) -> Option<&NavigationEvent> {
        match self {
            Self::Navigated(event) => Some(event),
            Self::Ambiguous { .. } => None,
        }
    }

    /// Returns the classification, if any.
    #[must_use]
    pub fn classification(&self) -> Option<Classification> {
        self.event().map(|e| e.classification)
    }

    /// Converts an ambiguous outcome into [`Error::NavigationAmbiguous`].
    ///
    /// # Errors
    ///
    /// Returns the error for [`NavigationOutcome::Ambiguous`].
    pub fn into_event(self) -> Result<NavigationEvent> {
        match self {
            Self::Navigated(event) => Ok(event),
            Self::Ambiguous {
                trigger,
                origin,
                before,
                waited,
            } => Err(Error::navigation_ambiguous(
                describe_action(trigger.as_ref()),
                waited.as_millis() as u64,
            )
            .with_observed(crate::error::Observed::new(origin.url, before.len()))),
        }
    }
}

fn describe_action(trigger: Option<&ResolvedElement>) -> String {
    match trigger {
        Some(el) => format!("click {el}"),
        None => "action".to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
