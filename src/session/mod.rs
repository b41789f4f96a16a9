//! Explicit session object shared by every engine call.
//!
//! A [`Session`] owns the driver for the lifetime of one test suite and
//! carries the [`SessionOptions`] budgets. Engine components are added to
//! it as `impl Session` blocks in their own modules.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Session struct, page state and element reads |
//! | `options` | Timing budgets and behaviour switches |
//!
//! # Example
//!
//! ```ignore
//! let session = Session::with_options(driver, SessionOptions::new())?;
//!
//! session.navigate("https://example.test/").await?;
//! let email = session.require(&email_spec).await?;
//! session.type_text(&email, "user@example.test").await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Session;
pub use options::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, SessionOptions};
