//! Deterministic in-memory browser.
//!
//! [`SimBrowser`] implements [`UiDriver`](crate::driver::UiDriver) over
//! registered page trees. It models what the engine has to tolerate from a
//! real target application: late rendering, overlays, input masks,
//! same-context and new-context navigation with delays, and stale element
//! references after a document is replaced.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `browser` | Windows, history, pending effects, driver implementation |
//! | `dom` | `SimNode` builders and flattened live documents |
//! | `query` | Evaluation of every `By` dialect |

// ============================================================================
// Submodules
// ============================================================================

mod browser;
mod dom;
mod query;

// ============================================================================
// Re-exports
// ============================================================================

pub use browser::SimBrowser;
pub use dom::{ClickEffect, InputMask, SimNode};
