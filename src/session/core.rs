//! Core Session struct and read accessors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::driver::{ScriptArg, UiDriver};
use crate::error::{Error, Observed, Result};
use crate::identifiers::{ElementId, WindowHandle};

use super::options::SessionOptions;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on reading failure context from the driver.
pub(crate) const OBSERVE_BUDGET: Duration = Duration::from_secs(1);

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a session.
pub(crate) struct SessionInner {
    /// Capability provider.
    pub driver: Box<dyn UiDriver>,
    /// Budgets and switches.
    pub options: SessionOptions,
}

// ============================================================================
// Session
// ============================================================================

/// One continuous user session against the target application.
///
/// Every engine operation takes the session by reference. Clones share
/// the same driver; independent suites create independent sessions.
///
/// The set of open browsing contexts and the focused context are read
/// through the session but only changed by the navigation tracker.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session with default options.
    pub fn new(driver: impl UiDriver + 'static) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                driver: Box::new(driver),
                options: SessionOptions::new(),
            }),
        }
    }

    /// Creates a session with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options fail validation.
    pub fn with_options(driver: impl UiDriver + 'static, options: SessionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                driver: Box::new(driver),
                options,
            }),
        })
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the session options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    /// Returns the driver.
    #[inline]
    pub(crate) fn driver(&self) -> &dyn UiDriver {
        self.inner.driver.as_ref()
    }
}

// ============================================================================
// Session - Page State
// ============================================================================

impl Session {
    /// Loads `url` in the focused context.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url = %url, "Navigating");
        self.driver().navigate(url).await
    }

    /// Returns the focused context's URL.
    pub async fn current_url(&self) -> Result<String> {
        self.driver().current_url().await
    }

    /// Returns the focused context's title.
    pub async fn title(&self) -> Result<String> {
        self.driver().title().await
    }

    /// Returns every open browsing context.
    pub async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        self.driver().window_handles().await
    }

    /// Returns the focused browsing context.
    pub async fn focused_handle(&self) -> Result<WindowHandle> {
        self.driver().focused_handle().await
    }

    /// Executes a script in the page's scripting context.
    pub async fn execute_script(&self, script: &str, args: &[ScriptArg]) -> Result<Value> {
        debug!(script_len = script.len(), args = args.len(), "Executing script");
        self.driver().execute_in_page(script, args).await
    }
}

// ============================================================================
// Session - Element Reads
// ============================================================================

impl Session {
    /// Returns the element's rendered text.
    pub async fn text(&self, element: impl AsRef<ElementId>) -> Result<String> {
        self.driver().text(element.as_ref()).await
    }

    /// Returns the element's current form value.
    pub async fn value(&self, element: impl AsRef<ElementId>) -> Result<String> {
        self.driver().value(element.as_ref()).await
    }

    /// Returns an attribute, or `None` when absent.
    pub async fn attribute(
        &self,
        element: impl AsRef<ElementId>,
        name: &str,
    ) -> Result<Option<String>> {
        self.driver().attribute(element.as_ref(), name).await
    }

    /// Returns `true` if the element is rendered.
    pub async fn is_displayed(&self, element: impl AsRef<ElementId>) -> Result<bool> {
        self.driver().is_displayed(element.as_ref()).await
    }

    /// Returns `true` if the element accepts input.
    pub async fn is_enabled(&self, element: impl AsRef<ElementId>) -> Result<bool> {
        self.driver().is_enabled(element.as_ref()).await
    }
}

// ============================================================================
// Session - Failure Context
// ============================================================================

impl Session {
    /// Captures URL and context count for error reports.
    ///
    /// Never fails and never takes longer than [`OBSERVE_BUDGET`]; values
    /// that cannot be read in time are left unknown.
    pub async fn observe(&self) -> Observed {
        self.observe_until(Instant::now() + OBSERVE_BUDGET).await
    }

    /// Captures URL and context count, giving up at `deadline`.
    pub(crate) async fn observe_until(&self, deadline: Instant) -> Observed {
        let url = timeout_at(deadline, self.driver().current_url())
            .await
            .ok()
            .and_then(|r| r.ok());
        let context_count = timeout_at(deadline, self.driver().window_handles())
            .await
            .ok()
            .and_then(|r| r.ok())
            .map(|h| h.len());
        if url.is_none() && context_count.is_none() {
            debug!("Session state unavailable for failure report");
        }
        Observed { url, context_count }
    }

    /// Attaches the current session state to `err`.
    pub(crate) async fn annotate(&self, err: Error) -> Error {
        self.annotate_until(err, Instant::now() + OBSERVE_BUDGET).await
    }

    /// Attaches the session state readable before `deadline` to `err`.
    pub(crate) async fn annotate_until(&self, err: Error, deadline: Instant) -> Error {
        if err.observed().is_some_and(|o| o.is_unknown()) {
            let observed = self.observe_until(deadline).await;
            err.with_observed(observed)
        } else {
            err
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
