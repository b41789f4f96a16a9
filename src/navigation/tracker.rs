//! Classification of navigational effects and restoration of the baseline.
//!
//! This is the only code that closes contexts, switches focus or goes back
//! in history. Everything else reads the context set and focus without
//! changing them.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::WindowHandle;
use crate::locator::ResolvedElement;
use crate::session::Session;
use crate::wait::conditions;

use super::context::{
    Classification, ContextSet, DomainMatch, NavigationEvent, NavigationOutcome, WindowContext,
};

/// URL of a context that has not started loading.
const BLANK_URL: &str = "about:blank";

// ============================================================================
// Session - Context Reads
// ============================================================================

impl Session {
    /// Returns every open browsing context.
    pub async fn contexts(&self) -> Result<ContextSet> {
        Ok(ContextSet::new(self.window_handles().await?))
    }

    /// Returns the focused browsing context with its current URL.
    pub async fn focused_context(&self) -> Result<WindowContext> {
        Ok(WindowContext {
            handle: self.focused_handle().await?,
            url: self.current_url().await?,
            opener: None,
        })
    }
}

// ============================================================================
// Session - Domain Checks
// ============================================================================

impl Session {
    /// Returns `true` if `event` ended on `fragment` under the session's
    /// [`DomainMatch`] policy.
    #[must_use]
    pub fn landed_on(&self, event: &NavigationEvent, fragment: &str) -> bool {
        event.matches_domain(fragment, self.options().domain_match)
    }
}

// ============================================================================
// Session - Classification
// ============================================================================

impl Session {
    /// Runs `action` and classifies its navigational effect.
    ///
    /// The origin is the context focused when the call starts; use
    /// [`perform_and_classify_from`](Self::perform_and_classify_from) to
    /// name it explicitly.
    ///
    /// Waits up to `timeout` for either more contexts than before or a
    /// changed URL in the origin context. Growth in the number of contexts
    /// means [`Classification::NewContext`]; focus then moves to the new
    /// context once it has left `about:blank`. Otherwise the result is
    /// [`Classification::SameContext`].
    ///
    /// No signal within `timeout` yields [`NavigationOutcome::Ambiguous`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let outcome = session
    ///     .perform_and_classify(|| session.click(&twitter), Duration::from_secs(5))
    ///     .await?;
    /// let event = outcome.into_event()?;
    /// assert!(event.url().contains("twitter.com"));
    /// session.restore(&event).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the action's error, or a driver error while observing.
    pub async fn perform_and_classify<F, Fut>(
        &self,
        action: F,
        timeout: Duration,
    ) -> Result<NavigationOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.classify(None, action, timeout).await
    }

    /// Focuses `origin`, then runs `action` and classifies its effect
    /// relative to that context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchWindow`] if `origin` is not open, otherwise
    /// as [`perform_and_classify`](Self::perform_and_classify).
    pub async fn perform_and_classify_from<F, Fut>(
        &self,
        origin: &WindowHandle,
        action: F,
        timeout: Duration,
    ) -> Result<NavigationOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.focused_handle().await.ok().as_ref() != Some(origin) {
            debug!(origin = %origin, "Focusing origin context");
            self.driver().switch_to(origin).await?;
        }
        self.classify(None, action, timeout).await
    }

    /// Clicks `target` and classifies the effect within the navigation
    /// budget.
    pub async fn click_and_classify(&self, target: &ResolvedElement) -> Result<NavigationOutcome> {
        let timeout = self.options().navigation_timeout;
        self.classify(Some(target.clone()), || self.click(target), timeout)
            .await
    }

    async fn classify<F, Fut>(
        &self,
        trigger: Option<ResolvedElement>,
        action: F,
        timeout: Duration,
    ) -> Result<NavigationOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let before = self.contexts().await?;
        let origin = self.focused_context().await?;
        let deadline = Instant::now() + timeout;

        action().await?;

        let before_len = before.len();
        let origin_url = origin.url.as_str();
        let signal = self
            .wait("navigation signal")
            .timeout(timeout)
            .until(|| async move {
                if self.window_handles().await?.len() > before_len {
                    return Ok(true);
                }
                Ok(self.current_url().await? != origin_url)
            })
            .await;

        match signal {
            Ok(()) => {}
            Err(err) if err.is_timeout() => {
                info!(
                    origin = %origin,
                    waited_ms = timeout.as_millis() as u64,
                    "No navigational effect observed"
                );
                return Ok(NavigationOutcome::Ambiguous {
                    trigger,
                    origin,
                    before,
                    waited: timeout,
                });
            }
            Err(err) => return Err(err),
        }

        let after = self.contexts().await?;
        let added = after.added_since(&before);

        let (classification, current) = match added.last() {
            Some(new_handle) if after.len() > before.len() => {
                self.driver().switch_to(new_handle).await?;
                let url = self.settle_new_context(deadline).await?;
                let current = WindowContext {
                    handle: new_handle.clone(),
                    url,
                    opener: Some(origin.handle.clone()),
                };
                (Classification::NewContext, current)
            }
            _ => {
                let current = WindowContext {
                    handle: origin.handle.clone(),
                    url: self.current_url().await?,
                    opener: None,
                };
                (Classification::SameContext, current)
            }
        };

        let event = NavigationEvent {
            trigger,
            origin,
            before,
            after,
            classification,
            current,
        };
        info!(
            action = %event.action(),
            classification = %event.classification,
            url = %event.current.url,
            contexts = event.after.len(),
            "Classified navigation"
        );
        Ok(NavigationOutcome::Navigated(event))
    }

    /// Waits for the focused new context to leave `about:blank`.
    ///
    /// Uses what is left of the signal budget. A context that never starts
    /// loading is reported with whatever URL it has.
    async fn settle_new_context(&self, deadline: Instant) -> Result<String> {
        let poll = self.options().poll_interval;
        let remaining = deadline.saturating_duration_since(Instant::now()).max(poll);

        let settled = self
            .wait("new context leaves about:blank")
            .timeout(remaining)
            .until_some(|| async move {
                let url = self.current_url().await?;
                Ok((!url.is_empty() && url != BLANK_URL).then_some(url))
            })
            .await;

        match settled {
            Ok(url) => Ok(url),
            Err(err) if err.is_timeout() => {
                warn!("New context did not start loading, reporting current URL");
                self.current_url().await
            }
            Err(err) => Err(err),
        }
    }
}

// ============================================================================
// Session - Restore
// ============================================================================

impl Session {
    /// Returns the session to the state before `event`'s action.
    ///
    /// Closes every context the action opened (including late ones),
    /// refocuses the origin and, for same-context navigation, goes back
    /// until the origin URL is shown again.
    ///
    /// Afterwards the number of contexts equals `event.before.len()` and
    /// the origin is focused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RestoreFailure`] if the baseline is not reached
    /// within the restore budget.
    pub async fn restore(&self, event: &NavigationEvent) -> Result<()> {
        self.return_to_baseline(&event.origin, &event.before).await?;

        if event.classification == Classification::SameContext {
            self.back_to(&event.origin.url).await?;
        }

        self.verify_baseline(&event.origin, &event.before).await?;
        info!(
            action = %event.action(),
            classification = %event.classification,
            contexts = event.before.len(),
            "Restored session"
        );
        Ok(())
    }

    /// Restores after any outcome.
    ///
    /// An ambiguous outcome still closes contexts that appeared after the
    /// signal budget ran out.
    pub async fn restore_outcome(&self, outcome: &NavigationOutcome) -> Result<()> {
        match outcome {
            NavigationOutcome::Navigated(event) => self.restore(event).await,
            NavigationOutcome::Ambiguous { origin, before, .. } => {
                self.return_to_baseline(origin, before).await?;
                self.verify_baseline(origin, before).await
            }
        }
    }

    /// Performs `action`, lets `inspect` look at the classified event, then
    /// restores the baseline whatever `inspect` returned.
    ///
    /// Returns `None` when the action had no navigational effect.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let on_twitter = session
    ///     .visit(|| session.click(&twitter), timeout, |event| {
    ///         event.matches_domain("twitter.com", DomainMatch::Substring)
    ///     })
    ///     .await?;
    /// assert_eq!(on_twitter, Some(true));
    /// ```
    pub async fn visit<F, Fut, I, T>(
        &self,
        action: F,
        timeout: Duration,
        inspect: I,
    ) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
        I: FnOnce(&NavigationEvent) -> T,
    {
        let outcome = self.perform_and_classify(action, timeout).await?;
        let inspected = outcome.event().map(inspect);
        self.restore_outcome(&outcome).await?;
        Ok(inspected)
    }
}

// ============================================================================
// Session - Restore Internals
// ============================================================================

impl Session {
    async fn return_to_baseline(&self, origin: &WindowContext, before: &ContextSet) -> Result<()> {
        let current = self.contexts().await?;

        for handle in current.added_since(before) {
            match self.driver().close(&handle).await {
                Ok(()) => debug!(handle = %handle, "Closed context"),
                Err(Error::NoSuchWindow { .. }) => {}
                Err(err) => {
                    return Err(self.restore_failed(format!("closing {handle}: {err}")).await);
                }
            }
        }

        if let Err(err) = self.driver().switch_to(&origin.handle).await {
            return Err(self
                .restore_failed(format!("refocusing {}: {err}", origin.handle))
                .await);
        }
        Ok(())
    }

    async fn back_to(&self, url: &str) -> Result<()> {
        if self.current_url().await? == url {
            return Ok(());
        }

        if let Err(err) = self.driver().back().await {
            return Err(self.restore_failed(format!("back navigation: {err}")).await);
        }

        let returned = self
            .wait(format!("url returns to {url}"))
            .timeout(self.options().restore_timeout)
            .until(|| conditions::url_equals(self, url))
            .await;

        match returned {
            Ok(()) => Ok(()),
            Err(err) if err.is_timeout() => Err(self
                .restore_failed(format!("back navigation did not return to {url}"))
                .await),
            Err(err) => Err(err),
        }
    }

    async fn verify_baseline(&self, origin: &WindowContext, before: &ContextSet) -> Result<()> {
        let contexts = self.contexts().await?;
        let focused = self.focused_handle().await.ok();

        if contexts.len() == before.len() && focused.as_ref() == Some(&origin.handle) {
            return Ok(());
        }

        let focused = focused.map_or_else(|| "none".to_string(), |h| h.to_string());
        Err(self
            .restore_failed(format!(
                "expected {} contexts focused on {}, found {} focused on {focused}",
                before.len(),
                origin.handle,
                contexts.len(),
            ))
            .await)
    }

    async fn restore_failed(&self, message: String) -> Error {
        warn!(reason = %message, "Restore failed");
        self.annotate(Error::restore_failure(message)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
