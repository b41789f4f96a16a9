//! Element location from ordered fallback candidates.
//!
//! Markup of the target application is not under the test author's
//! control, so an element is described by several candidate queries in
//! priority order instead of one selector.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`By`] | One query candidate in some [`Dialect`] |
//! | [`LocatorSpec`] | Ordered, non-empty candidate list |
//! | [`ResolvedElement`] | Winning element plus the candidate index |
//! | [`ResolvedAll`] | All matches of the winning candidate |
//!
//! Resolution never merges matches from different candidates.

// ============================================================================
// Submodules
// ============================================================================

mod by;
mod resolve;
mod spec;

// ============================================================================
// Re-exports
// ============================================================================

pub use by::{By, Dialect};
pub use spec::{LocatorSpec, ResolvedAll, ResolvedElement};
