//! Resilient Driver - Browser interaction engine for uncontrolled web applications.
//!
//! This library drives a web application whose markup, timing and
//! navigation behaviour the test author does not control. It sits on top
//! of any UI driver that implements [`UiDriver`].
//!
//! # Architecture
//!
//! A test step flows through six components, all exposed as methods on
//! one explicit [`Session`]:
//!
//! - **Locator resolution**: ordered fallback candidates, first match wins
//! - **Waiting**: bounded polling of page state, never fixed sleeps
//! - **Actions**: click and type with a scripted fallback for overlays
//! - **Navigation tracking**: same-context vs new-context classification,
//!   and restoration of the pre-action baseline
//! - **State heuristics**: OR-combined weak signals ("is logged in")
//! - **Ordering**: before/after snapshot comparison
//!
//! Key design principles:
//!
//! - The session is passed by reference into every call; nothing is global
//! - Absence is a value, hard failures are errors carrying the URL and
//!   number of open contexts at failure time
//! - Only the navigation tracker closes contexts or moves focus
//!
//! # Quick Start
//!
//! ```no_run
//! use resilient_driver::sim::{ClickEffect, SimBrowser, SimNode};
//! use resilient_driver::{By, LocatorSpec, Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let browser = SimBrowser::new();
//!     browser.page(
//!         "https://shop.test/",
//!         vec![
//!             SimNode::new("input").attr("type", "email"),
//!             SimNode::new("a")
//!                 .class("social_twitter")
//!                 .on_click(ClickEffect::open_window("https://twitter.com/shop")),
//!         ],
//!     );
//!     browser.open("https://shop.test/");
//!     let session = Session::new(browser);
//!
//!     // Resolves through the third candidate
//!     let email = LocatorSpec::new(By::id("email"))
//!         .or(By::name("email"))
//!         .or(By::attr("type", "email"));
//!     let field = session.require(&email).await?;
//!     session.type_text(&field, "user@shop.test").await?;
//!
//!     // Opens a new context, asserts on it, then closes it again
//!     let twitter = session
//!         .require(&LocatorSpec::new(By::class("social_twitter")))
//!         .await?;
//!     let event = session.click_and_classify(&twitter).await?.into_event()?;
//!     assert!(event.url().contains("twitter.com"));
//!     session.restore(&event).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`action`] | Click, type, select with interception fallback |
//! | [`driver`] | [`UiDriver`] capability trait |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`heuristics`] | [`StateHeuristic`] and [`Signal`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`locator`] | [`By`], [`LocatorSpec`] and resolution |
//! | [`navigation`] | Context tracking, classification and restore |
//! | [`ordering`] | [`Snapshot`] and [`diff`](ordering::diff) |
//! | [`session`] | [`Session`] and [`SessionOptions`] |
//! | [`sim`] | In-memory [`UiDriver`] for tests and demos |
//! | [`wait`] | [`Wait`] and primitive conditions |

// ============================================================================
// Modules
// ============================================================================

/// Actions on resolved elements.
pub mod action;

/// UI driver capability consumed by the engine.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// State judgments from weak signals.
pub mod heuristics;

/// Type-safe identifiers for driver entities.
///
/// Newtype wrappers prevent mixing element references and window handles.
pub mod identifiers;

/// Element location with ordered fallback candidates.
pub mod locator;

/// Navigation context tracking.
pub mod navigation;

/// Before/after comparison of ordered values.
pub mod ordering;

/// Explicit session object and its options.
pub mod session;

/// Deterministic in-memory browser.
pub mod sim;

/// Bounded polling of page state.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use action::InputEcho;
pub use heuristics::{Combine, Judgment, Signal, StateHeuristic};
pub use locator::{By, Dialect, LocatorSpec, ResolvedAll, ResolvedElement};
pub use navigation::{
    Classification, ContextSet, DomainMatch, NavigationEvent, NavigationOutcome, WindowContext,
};
pub use ordering::{Snapshot, SortKey, SortOrder, Verdict};
pub use session::{Session, SessionOptions};
pub use wait::Wait;

// Driver types
pub use driver::{ScriptArg, UiDriver};

// Error types
pub use error::{Error, Observed, Result};

// Identifier types
pub use identifiers::{ElementId, WindowHandle};
