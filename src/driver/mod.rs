//! UI driver capability.
//!
//! The engine never talks to a browser directly. Everything it needs is
//! expressed by [`UiDriver`]; a WebDriver client, a CDP client or the
//! in-memory [`SimBrowser`](crate::sim::SimBrowser) can provide it.
//!
//! # Contract
//!
//! | Method | Notes |
//! |--------|-------|
//! | `query` | zero or more matches, document order, never an error for "no match" |
//! | `window_handles` | every open browsing context, stable order |
//! | `focused_handle` | [`Error::NoSuchWindow`](crate::Error::NoSuchWindow) when the focused context was closed |
//! | `click` | [`Error::ClickIntercepted`](crate::Error::ClickIntercepted) when an overlay receives the click |
//! | `execute_in_page` | arguments are exposed to the script as `arguments[n]` |
//!
//! Element methods report [`Error::StaleElement`](crate::Error::StaleElement)
//! once the element's document has been replaced.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{ElementId, WindowHandle};
use crate::locator::By;

#[cfg(test)]
mod stalled;

#[cfg(test)]
pub(crate) use stalled::StalledDriver;

// ============================================================================
// ScriptArg
// ============================================================================

/// Argument passed to a page script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    /// Reference to a live element.
    Element(ElementId),
    /// Plain JSON value.
    Value(Value),
}

impl From<&ElementId> for ScriptArg {
    fn from(id: &ElementId) -> Self {
        Self::Element(id.clone())
    }
}

impl From<Value> for ScriptArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

// ============================================================================
// UiDriver
// ============================================================================

/// Capability surface consumed by the engine.
///
/// Implementations operate on the focused browsing context unless a
/// method takes an explicit handle.
#[async_trait]
pub trait UiDriver: Send + Sync {
    // ========================================================================
    // Navigation
    // ========================================================================

    /// Loads `url` in the focused context.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Returns the focused context's URL.
    async fn current_url(&self) -> Result<String>;

    /// Returns the focused context's document title.
    async fn title(&self) -> Result<String>;

    /// Navigates the focused context one step back in history.
    async fn back(&self) -> Result<()>;

    // ========================================================================
    // Contexts
    // ========================================================================

    /// Returns all open contexts.
    async fn window_handles(&self) -> Result<Vec<WindowHandle>>;

    /// Returns the focused context.
    async fn focused_handle(&self) -> Result<WindowHandle>;

    /// Moves focus to `handle`.
    async fn switch_to(&self, handle: &WindowHandle) -> Result<()>;

    /// Closes `handle`. Focus is not moved.
    async fn close(&self, handle: &WindowHandle) -> Result<()>;

    // ========================================================================
    // Queries
    // ========================================================================

    /// Runs one candidate against `root` (or the whole document).
    async fn query(&self, root: Option<&ElementId>, by: &By) -> Result<Vec<ElementId>>;

    /// Returns an attribute, or `None` when absent.
    async fn attribute(&self, element: &ElementId, name: &str) -> Result<Option<String>>;

    /// Returns the element's rendered text.
    async fn text(&self, element: &ElementId) -> Result<String>;

    /// Returns the element's current form value.
    async fn value(&self, element: &ElementId) -> Result<String>;

    /// Returns `true` if the element is rendered.
    async fn is_displayed(&self, element: &ElementId) -> Result<bool>;

    /// Returns `true` if the element accepts input.
    async fn is_enabled(&self, element: &ElementId) -> Result<bool>;

    // ========================================================================
    // Input
    // ========================================================================

    /// Dispatches a native click.
    async fn click(&self, element: &ElementId) -> Result<()>;

    /// Clears an editable element.
    async fn clear(&self, element: &ElementId) -> Result<()>;

    /// Sends keystrokes to an editable element.
    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()>;

    // ========================================================================
    // Scripting
    // ========================================================================

    /// Executes `script` in the page's own scripting context.
    async fn execute_in_page(&self, script: &str, args: &[ScriptArg]) -> Result<Value>;
}
