//! UI actions on resolved elements.
//!
//! Every action first waits for its target to become interactable
//! (displayed and enabled). Clicks that an overlay intercepts are retried
//! through the page's scripting context; if that also fails the action
//! is a hard failure.

use std::fmt;

use tracing::{debug, warn};

use crate::driver::ScriptArg;
use crate::error::{Error, Result};
use crate::locator::{By, LocatorSpec, ResolvedElement};
use crate::session::Session;

// ============================================================================
// Constants
// ============================================================================

/// Scrolls the first argument to the viewport centre.
const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView({block: 'center'});";

/// Dispatches a click from inside the page, skipping hit testing.
const SCRIPTED_CLICK: &str = "arguments[0].click();";

// ============================================================================
// InputEcho
// ============================================================================

/// Expected and observed value of an input after typing.
///
/// Inputs with client-side masks may drop or transform characters, so
/// acceptance is a comparison, never an assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEcho {
    /// Text that was sent.
    pub expected: String,
    /// Value read back from the element.
    pub observed: String,
}

impl InputEcho {
    /// Returns `true` if the element holds exactly what was typed.
    #[inline]
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.expected == self.observed
    }
}

impl fmt::Display for InputEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {:?}, observed {:?}", self.expected, self.observed)
    }
}

// ============================================================================
// Session - Actions
// ============================================================================

impl Session {
    /// Clicks `target`.
    ///
    /// Waits for the element to be interactable, scrolls it into view when
    /// enabled in the options, then dispatches a direct click. An
    /// intercepted click is retried as a scripted click.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the element never becomes interactable
    /// - [`Error::InterceptedAction`] if the direct and scripted dispatch
    ///   both fail
    pub async fn click(&self, target: &ResolvedElement) -> Result<()> {
        self.await_interactable(target).await?;

        if self.options().scroll_into_view {
            let args = [ScriptArg::from(&target.element)];
            if let Err(err) = self.execute_script(SCROLL_INTO_VIEW, &args).await {
                debug!(target = %target, error = %err, "Scroll into view failed, ignoring");
            }
        }

        let obstruction = match self.driver().click(&target.element).await {
            Ok(()) => {
                debug!(target = %target, "Clicked");
                return Ok(());
            }
            Err(Error::ClickIntercepted { obstruction, .. }) => obstruction,
            Err(err) => return Err(err),
        };

        if !self.options().script_click_fallback {
            let err = Error::intercepted_action(
                "click",
                target.to_string(),
                format!("intercepted by {obstruction}, scripted fallback disabled"),
            );
            return Err(self.annotate(err).await);
        }

        warn!(target = %target, obstruction = %obstruction, "Click intercepted, using scripted click");

        let args = [ScriptArg::from(&target.element)];
        match self.execute_script(SCRIPTED_CLICK, &args).await {
            Ok(_) => Ok(()),
            Err(err) => {
                let err = Error::intercepted_action(
                    "click",
                    target.to_string(),
                    format!("intercepted by {obstruction}, scripted click failed: {err}"),
                );
                Err(self.annotate(err).await)
            }
        }
    }

    /// Replaces the content of `target` with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the element never becomes
    /// interactable, or the driver's error if clearing or typing fails.
    pub async fn type_text(&self, target: &ResolvedElement, text: &str) -> Result<()> {
        self.await_interactable(target).await?;

        self.driver().clear(&target.element).await?;
        self.driver().send_keys(&target.element, text).await?;

        debug!(target = %target, chars = text.chars().count(), "Typed text");
        Ok(())
    }

    /// Types `text` and reads the element's value back.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let echo = session.type_and_confirm(&zip, "12ab3").await?;
    /// if !echo.accepted() {
    ///     println!("input mask rewrote the value: {echo}");
    /// }
    /// ```
    pub async fn type_and_confirm(&self, target: &ResolvedElement, text: &str) -> Result<InputEcho> {
        self.type_text(target, text).await?;
        let observed = self.value(target).await?;

        let echo = InputEcho {
            expected: text.to_string(),
            observed,
        };
        if !echo.accepted() {
            debug!(target = %target, echo = %echo, "Input value differs from typed text");
        }
        Ok(echo)
    }

    /// Selects the option of a selection control by its visible text.
    ///
    /// Returns the clicked option.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if no option carries `visible_text`.
    pub async fn select_option(
        &self,
        select: &ResolvedElement,
        visible_text: &str,
    ) -> Result<ResolvedElement> {
        let options = LocatorSpec::new(By::tag("option"));

        if let Some(all) = self.resolve_all_within(&options, select).await? {
            for option in all.iter() {
                if self.text(&option).await?.trim() == visible_text {
                    self.click(&option).await?;
                    debug!(select = %select, option = %visible_text, "Selected option");
                    return Ok(option);
                }
            }
        }

        Err(Error::element_not_found(
            format!("option {visible_text:?} within {select}"),
            self.observe().await,
        ))
    }

    /// Waits until `target` is displayed and enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] after the interactable budget.
    pub async fn await_interactable(&self, target: &ResolvedElement) -> Result<()> {
        self.wait(format!("interactable({target})"))
            .timeout(self.options().interactable_timeout)
            .until(|| async move {
                Ok(self.is_displayed(target).await? && self.is_enabled(target).await?)
            })
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
